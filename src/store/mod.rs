pub mod memory;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::models::order::{OperatorProfile, OrderRecord, OrderStatus};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("order {0} not found")]
    NotFound(Uuid),

    #[error("conditional update lost the race for order {0}")]
    Conflict(Uuid),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Change notification emitted by a store. Carries only the order id; readers
/// re-query for the data they care about.
#[derive(Debug, Clone, Copy)]
pub enum StoreEvent {
    Created(Uuid),
    Updated(Uuid),
}

/// The full acceptance write: operator profile and delivery date land together
/// with the `Accepted` status, so a record is never partially claimed.
#[derive(Debug, Clone)]
pub struct ClaimPatch {
    pub operator: OperatorProfile,
    pub delivery_date: DateTime<Utc>,
}

/// Document store collaborator the dispatch core runs against.
///
/// `conditional_update` is the atomicity primitive: the status check and the
/// acceptance write happen as one indivisible operation against the backend.
/// The core never takes its own locks across processes.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn create(&self, order: OrderRecord) -> Result<(), StoreError>;

    async fn read(&self, id: Uuid) -> Result<OrderRecord, StoreError>;

    /// Verifies the order still has `expected` status and, if so, applies the
    /// acceptance patch in the same indivisible write. Returns the updated
    /// record, or `Conflict` when another actor got there first.
    async fn conditional_update(
        &self,
        id: Uuid,
        expected: OrderStatus,
        patch: ClaimPatch,
    ) -> Result<OrderRecord, StoreError>;

    async fn query_by_status(&self, status: OrderStatus) -> Result<Vec<OrderRecord>, StoreError>;

    /// Change notifications. Transport is backend-specific (push stream,
    /// long-poll, periodic re-query); receivers may lag and must re-query.
    fn subscribe(&self) -> broadcast::Receiver<StoreEvent>;
}
