use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::models::order::{OrderRecord, OrderStatus};
use crate::store::{ClaimPatch, DocumentStore, StoreError, StoreEvent};

/// In-memory store backing the service binary and the test suite.
///
/// DashMap's per-shard write lock makes `conditional_update` atomic: the
/// status check and the acceptance write happen under the same guard.
pub struct MemoryStore {
    orders: DashMap<Uuid, OrderRecord>,
    events_tx: broadcast::Sender<StoreEvent>,
}

impl MemoryStore {
    pub fn new(event_buffer_size: usize) -> Self {
        let (events_tx, _unused_rx) = broadcast::channel(event_buffer_size);

        Self {
            orders: DashMap::new(),
            events_tx,
        }
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn create(&self, order: OrderRecord) -> Result<(), StoreError> {
        let id = order.id;
        self.orders.insert(id, order);
        let _ = self.events_tx.send(StoreEvent::Created(id));
        Ok(())
    }

    async fn read(&self, id: Uuid) -> Result<OrderRecord, StoreError> {
        self.orders
            .get(&id)
            .map(|entry| entry.value().clone())
            .ok_or(StoreError::NotFound(id))
    }

    async fn conditional_update(
        &self,
        id: Uuid,
        expected: OrderStatus,
        patch: ClaimPatch,
    ) -> Result<OrderRecord, StoreError> {
        let updated = {
            let mut entry = self.orders.get_mut(&id).ok_or(StoreError::NotFound(id))?;

            if entry.status != expected {
                return Err(StoreError::Conflict(id));
            }

            entry.operator = Some(patch.operator);
            entry.delivery_date = Some(patch.delivery_date);
            entry.status = OrderStatus::Accepted;
            entry.value().clone()
        };

        let _ = self.events_tx.send(StoreEvent::Updated(id));
        Ok(updated)
    }

    async fn query_by_status(&self, status: OrderStatus) -> Result<Vec<OrderRecord>, StoreError> {
        let matching = self
            .orders
            .iter()
            .filter(|entry| entry.value().status == status)
            .map(|entry| entry.value().clone())
            .collect();

        Ok(matching)
    }

    fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.events_tx.subscribe()
    }
}
