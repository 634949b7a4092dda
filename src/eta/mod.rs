use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::Stream;
use rand::Rng;
use tokio::time::Interval;

pub const DEFAULT_ETA_MIN_MINUTES: f64 = 10.0;
pub const DEFAULT_ETA_MAX_MINUTES: f64 = 25.0;
pub const DEFAULT_PROGRESS_TICK: Duration = Duration::from_millis(50);

/// Uniform draw in [0, 1). Injectable so tests can pin the scheduled ETA.
pub trait RandomSource: Send + Sync {
    fn next_unit(&self) -> f64;
}

pub struct ThreadRngSource;

impl RandomSource for ThreadRngSource {
    fn next_unit(&self) -> f64 {
        rand::thread_rng().gen_range(0.0..1.0)
    }
}

/// Draws a delivery duration once per claim and turns it into a timestamp.
/// The ETA is a bounded simulation, not a routing estimate.
#[derive(Clone)]
pub struct EtaSimulator {
    source: Arc<dyn RandomSource>,
    min_minutes: f64,
    max_minutes: f64,
}

impl EtaSimulator {
    pub fn new() -> Self {
        Self::with_source(
            Arc::new(ThreadRngSource),
            DEFAULT_ETA_MIN_MINUTES,
            DEFAULT_ETA_MAX_MINUTES,
        )
    }

    pub fn with_source(source: Arc<dyn RandomSource>, min_minutes: f64, max_minutes: f64) -> Self {
        Self {
            source,
            min_minutes,
            max_minutes,
        }
    }

    /// `order_date` plus a uniformly drawn duration within the configured
    /// bounds. Called exactly once, at claim time.
    pub fn schedule_eta(&self, order_date: DateTime<Utc>) -> DateTime<Utc> {
        let span = self.max_minutes - self.min_minutes;
        let minutes = self.min_minutes + self.source.next_unit() * span;

        order_date + chrono::Duration::milliseconds((minutes * 60_000.0).round() as i64)
    }
}

impl Default for EtaSimulator {
    fn default() -> Self {
        Self::new()
    }
}

/// Completion percentage at `now`, clamped to [0, 100]. Elapsed time is
/// measured from `order_date`, not from the moment of the claim.
pub fn progress(
    order_date: DateTime<Utc>,
    delivery_date: DateTime<Utc>,
    now: DateTime<Utc>,
) -> f64 {
    let total = (delivery_date - order_date).num_milliseconds();
    if total <= 0 {
        return 100.0;
    }

    let elapsed = (now - order_date).num_milliseconds();
    (100.0 * elapsed as f64 / total as f64).clamp(0.0, 100.0)
}

/// Periodic progress readings against the current clock, ending after the
/// first 100 is emitted. Each watch owns its timer; dropping the stream stops
/// it immediately.
pub fn watch_progress(
    order_date: DateTime<Utc>,
    delivery_date: DateTime<Utc>,
    tick: Duration,
) -> ProgressWatch {
    ProgressWatch {
        order_date,
        delivery_date,
        interval: tokio::time::interval(tick),
        finished: false,
    }
}

pub struct ProgressWatch {
    order_date: DateTime<Utc>,
    delivery_date: DateTime<Utc>,
    interval: Interval,
    finished: bool,
}

impl Stream for ProgressWatch {
    type Item = f64;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<f64>> {
        let watch = self.get_mut();
        if watch.finished {
            return Poll::Ready(None);
        }

        match watch.interval.poll_tick(cx) {
            Poll::Pending => Poll::Pending,
            Poll::Ready(_) => {
                let value = progress(watch.order_date, watch.delivery_date, Utc::now());
                if value >= 100.0 {
                    watch.finished = true;
                }
                Poll::Ready(Some(value))
            }
        }
    }
}
