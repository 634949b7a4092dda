use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::Deserialize;
use tokio::sync::broadcast;
use tokio::task::AbortHandle;
use tracing::warn;
use uuid::Uuid;

use crate::models::order::{OrderRecord, OrderStatus};
use crate::store::DocumentStore;

/// Live view of claimable orders. Subscribers get the current `Pending`
/// snapshot immediately, then a fresh snapshot whenever the pending set
/// changes. Filtering and sorting are pure helpers the caller composes on
/// top; the feed itself holds no view state.
pub struct DispatchFeed {
    store: Arc<dyn DocumentStore>,
}

impl DispatchFeed {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Registers `on_change` and returns its deregistration handle.
    ///
    /// Invocations for one subscriber are strictly ordered; subscribers are
    /// independent of each other. Snapshots with an unchanged pending id set
    /// are suppressed.
    pub fn subscribe<F>(&self, on_change: F) -> FeedSubscription
    where
        F: Fn(&[OrderRecord]) + Send + Sync + 'static,
    {
        let store = self.store.clone();
        // Subscribed before the initial query so no change can slip between
        // the snapshot and the first notification.
        let mut events = store.subscribe();

        let task = tokio::spawn(async move {
            let mut last_ids: Option<Vec<Uuid>> = None;

            match store.query_by_status(OrderStatus::Pending).await {
                Ok(snapshot) => {
                    last_ids = Some(pending_ids(&snapshot));
                    on_change(&snapshot);
                }
                Err(err) => warn!(error = %err, "initial feed snapshot failed"),
            }

            loop {
                match events.recv().await {
                    Ok(_) => {}
                    Err(broadcast::error::RecvError::Lagged(_)) => {}
                    Err(broadcast::error::RecvError::Closed) => break,
                }

                match store.query_by_status(OrderStatus::Pending).await {
                    Ok(snapshot) => {
                        let ids = pending_ids(&snapshot);
                        if last_ids.as_ref() != Some(&ids) {
                            last_ids = Some(ids);
                            on_change(&snapshot);
                        }
                    }
                    Err(err) => warn!(error = %err, "feed snapshot query failed"),
                }
            }
        });

        FeedSubscription {
            task: task.abort_handle(),
            active: AtomicBool::new(true),
        }
    }
}

fn pending_ids(snapshot: &[OrderRecord]) -> Vec<Uuid> {
    let mut ids: Vec<Uuid> = snapshot.iter().map(|order| order.id).collect();
    ids.sort();
    ids
}

/// Deregistration handle for one feed subscriber. `unsubscribe` is an
/// idempotent no-op after the first call and never affects other live
/// subscribers. Dropping the handle also deregisters.
pub struct FeedSubscription {
    task: AbortHandle,
    active: AtomicBool,
}

impl FeedSubscription {
    pub fn unsubscribe(&self) {
        if self.active.swap(false, Ordering::SeqCst) {
            self.task.abort();
        }
    }
}

impl Drop for FeedSubscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortKey {
    DateAsc,
    DateDesc,
    PriceAsc,
    PriceDesc,
}

/// Keeps orders whose item name, requester location name, or formatted order
/// date contains `search_text`, case-insensitively. Empty search keeps
/// everything.
pub fn filter(orders: &[OrderRecord], search_text: &str) -> Vec<OrderRecord> {
    if search_text.is_empty() {
        return orders.to_vec();
    }

    let needle = search_text.to_lowercase();
    orders
        .iter()
        .filter(|order| {
            order.item.name.to_lowercase().contains(&needle)
                || order.requester_location_name.to_lowercase().contains(&needle)
                || order.formatted_order_date().contains(&needle)
        })
        .cloned()
        .collect()
}

/// Stable presentation order: by date or price per `key`, ties broken by id
/// ascending. Pure; the input slice is left untouched.
pub fn sort(orders: &[OrderRecord], key: SortKey) -> Vec<OrderRecord> {
    let mut sorted = orders.to_vec();
    sorted.sort_by(|a, b| {
        let primary = match key {
            SortKey::DateAsc => a.order_date.cmp(&b.order_date),
            SortKey::DateDesc => b.order_date.cmp(&a.order_date),
            SortKey::PriceAsc => a.item.price.total_cmp(&b.item.price),
            SortKey::PriceDesc => b.item.price.total_cmp(&a.item.price),
        };
        primary.then_with(|| a.id.cmp(&b.id))
    });
    sorted
}
