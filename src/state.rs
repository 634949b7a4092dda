use std::sync::Arc;
use std::time::Duration;

use crate::dispatch::feed::DispatchFeed;
use crate::dispatch::lifecycle::Dispatcher;
use crate::eta::EtaSimulator;
use crate::observability::metrics::Metrics;
use crate::store::DocumentStore;

pub struct AppState {
    pub store: Arc<dyn DocumentStore>,
    pub dispatcher: Dispatcher,
    pub feed: DispatchFeed,
    pub progress_tick: Duration,
    pub metrics: Metrics,
}

impl AppState {
    pub fn new(store: Arc<dyn DocumentStore>, eta: EtaSimulator, progress_tick: Duration) -> Self {
        Self {
            dispatcher: Dispatcher::new(store.clone(), eta),
            feed: DispatchFeed::new(store.clone()),
            store,
            progress_tick,
            metrics: Metrics::new(),
        }
    }
}
