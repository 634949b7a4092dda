use std::sync::Arc;

use tracing::{debug, info};
use uuid::Uuid;

use crate::error::AppError;
use crate::eta::EtaSimulator;
use crate::models::item::Item;
use crate::models::order::{GeoPoint, OperatorProfile, OrderRecord, OrderStatus};
use crate::store::{ClaimPatch, DocumentStore, StoreError};

/// Result of a claim attempt. Every outcome is a value the caller must
/// handle; a lost race is not an exceptional path.
#[derive(Debug)]
pub enum ClaimOutcome {
    Accepted(OrderRecord),
    Conflict,
    Invalid(String),
}

/// Owns the order lifecycle: `Pending` on creation, a single guarded edge to
/// `Accepted` on claim. All contention is resolved by the store's
/// conditional-update primitive.
pub struct Dispatcher {
    store: Arc<dyn DocumentStore>,
    eta: EtaSimulator,
}

impl Dispatcher {
    pub fn new(store: Arc<dyn DocumentStore>, eta: EtaSimulator) -> Self {
        Self { store, eta }
    }

    pub async fn create_order(
        &self,
        item: Item,
        requester_location: GeoPoint,
        requester_location_name: String,
    ) -> Result<OrderRecord, AppError> {
        let order = OrderRecord::new(item, requester_location, requester_location_name);
        self.store.create(order.clone()).await?;

        info!(order_id = %order.id, item = %order.item.name, "order created");
        Ok(order)
    }

    /// Attempts to take ownership of a pending order for the given operator.
    ///
    /// Validation failures and lost races come back as `ClaimOutcome`
    /// variants; a missing order or an unreachable store surfaces as an
    /// error. The operator profile, delivery date, and status flip are
    /// written in one conditional update, so the record is never partially
    /// claimed.
    pub async fn claim(
        &self,
        order_id: Uuid,
        operator_id: &str,
        operator_name: &str,
        operator_location: Option<GeoPoint>,
    ) -> Result<ClaimOutcome, AppError> {
        if operator_id.trim().is_empty() {
            return Ok(ClaimOutcome::Invalid(
                "operator id must not be empty".to_string(),
            ));
        }
        if operator_name.trim().is_empty() {
            return Ok(ClaimOutcome::Invalid(
                "operator name must not be empty".to_string(),
            ));
        }
        let Some(location) = operator_location else {
            return Ok(ClaimOutcome::Invalid(
                "operator location is required".to_string(),
            ));
        };

        let order = self.store.read(order_id).await?;
        if order.status != OrderStatus::Pending {
            debug!(order_id = %order_id, "claim rejected: order already accepted");
            return Ok(ClaimOutcome::Conflict);
        }

        let patch = ClaimPatch {
            operator: OperatorProfile {
                id: operator_id.to_string(),
                name: operator_name.to_string(),
                location,
            },
            delivery_date: self.eta.schedule_eta(order.order_date),
        };

        match self.store.conditional_update(order_id, OrderStatus::Pending, patch).await {
            Ok(updated) => {
                info!(
                    order_id = %updated.id,
                    operator_id = %operator_id,
                    delivery_date = ?updated.delivery_date,
                    "order claimed"
                );
                Ok(ClaimOutcome::Accepted(updated))
            }
            Err(StoreError::Conflict(_)) => {
                debug!(order_id = %order_id, operator_id = %operator_id, "claim lost the race");
                Ok(ClaimOutcome::Conflict)
            }
            Err(err) => Err(err.into()),
        }
    }
}
