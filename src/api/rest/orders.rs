use std::sync::Arc;
use std::time::Instant;

use axum::extract::{Path, Query, State};
use axum::routing::{get, post};
use axum::Json;
use axum::Router;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::dispatch::feed::{self, SortKey};
use crate::dispatch::lifecycle::ClaimOutcome;
use crate::error::AppError;
use crate::geo::distance_km;
use crate::models::item::Item;
use crate::models::order::{GeoPoint, OrderRecord, OrderStatus};
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/orders", post(create_order))
        .route("/orders/pending", get(list_pending))
        .route("/orders/:id", get(get_order))
        .route("/orders/:id/preview", get(preview_order))
        .route("/orders/:id/claim", post(claim_order))
}

#[derive(Deserialize)]
pub struct CreateOrderRequest {
    pub item: Item,
    pub requester_location: GeoPoint,
    pub requester_location_name: String,
}

async fn create_order(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateOrderRequest>,
) -> Result<Json<OrderRecord>, AppError> {
    if payload.item.name.trim().is_empty() {
        return Err(AppError::Validation("item name cannot be empty".to_string()));
    }
    if payload.item.price < 0.0 {
        return Err(AppError::Validation("item price cannot be negative".to_string()));
    }
    if payload.requester_location_name.trim().is_empty() {
        return Err(AppError::Validation(
            "requester location name cannot be empty".to_string(),
        ));
    }

    let order = state
        .dispatcher
        .create_order(
            payload.item,
            payload.requester_location,
            payload.requester_location_name,
        )
        .await?;

    state.metrics.orders_created_total.inc();
    Ok(Json(order))
}

#[derive(Deserialize)]
pub struct PendingQuery {
    pub search: Option<String>,
    pub sort: Option<SortKey>,
}

/// Snapshot of the claimable orders, filtered then sorted per the query.
async fn list_pending(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PendingQuery>,
) -> Result<Json<Vec<OrderRecord>>, AppError> {
    let pending = state.store.query_by_status(OrderStatus::Pending).await?;

    let filtered = feed::filter(&pending, query.search.as_deref().unwrap_or(""));
    let sorted = feed::sort(&filtered, query.sort.unwrap_or(SortKey::DateAsc));

    Ok(Json(sorted))
}

async fn get_order(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<OrderRecord>, AppError> {
    let order = state.store.read(id).await?;
    Ok(Json(order))
}

#[derive(Deserialize)]
pub struct PreviewQuery {
    pub lat: f64,
    pub lng: f64,
}

#[derive(Serialize)]
pub struct PreviewResponse {
    pub order_id: Uuid,
    pub distance_km: f64,
}

/// Trip distance from the operator's position to the requester, shown in the
/// accept dialog before a claim is attempted.
async fn preview_order(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Query(query): Query<PreviewQuery>,
) -> Result<Json<PreviewResponse>, AppError> {
    let order = state.store.read(id).await?;
    let operator_position = GeoPoint {
        lat: query.lat,
        lng: query.lng,
    };

    Ok(Json(PreviewResponse {
        order_id: order.id,
        distance_km: distance_km(&operator_position, &order.requester_location),
    }))
}

#[derive(Deserialize)]
pub struct ClaimRequest {
    pub operator_id: String,
    pub operator_name: String,
    pub operator_location: Option<GeoPoint>,
}

async fn claim_order(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<ClaimRequest>,
) -> Result<Json<OrderRecord>, AppError> {
    let start = Instant::now();
    let result = state
        .dispatcher
        .claim(
            id,
            &payload.operator_id,
            &payload.operator_name,
            payload.operator_location,
        )
        .await;

    let outcome_label = match &result {
        Ok(ClaimOutcome::Accepted(_)) => "accepted",
        Ok(ClaimOutcome::Conflict) => "conflict",
        Ok(ClaimOutcome::Invalid(_)) => "invalid",
        Err(_) => "error",
    };
    let elapsed = start.elapsed().as_secs_f64();
    state
        .metrics
        .claim_latency_seconds
        .with_label_values(&[outcome_label])
        .observe(elapsed);
    state
        .metrics
        .claims_total
        .with_label_values(&[outcome_label])
        .inc();

    match result? {
        ClaimOutcome::Accepted(order) => Ok(Json(order)),
        ClaimOutcome::Conflict => Err(AppError::Conflict(format!(
            "order {id} is no longer available"
        ))),
        ClaimOutcome::Invalid(reason) => Err(AppError::Validation(reason)),
    }
}
