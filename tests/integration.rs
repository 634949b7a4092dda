use std::sync::Arc;
use std::time::Duration;

use airlift_dispatch::api::rest::router;
use airlift_dispatch::eta::{EtaSimulator, RandomSource};
use airlift_dispatch::state::AppState;
use airlift_dispatch::store::memory::MemoryStore;
use airlift_dispatch::store::DocumentStore;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use tower::ServiceExt;

struct FixedSource(f64);

impl RandomSource for FixedSource {
    fn next_unit(&self) -> f64 {
        self.0
    }
}

fn setup() -> axum::Router {
    setup_with_eta(EtaSimulator::new())
}

fn setup_with_eta(eta: EtaSimulator) -> axum::Router {
    let store: Arc<dyn DocumentStore> = Arc::new(MemoryStore::new(1024));
    let state = Arc::new(AppState::new(store, eta, Duration::from_millis(50)));
    router(state)
}

/// Simulator whose every draw lands on exactly 12 minutes.
fn twelve_minute_eta() -> EtaSimulator {
    EtaSimulator::with_source(Arc::new(FixedSource(2.0 / 15.0)), 10.0, 25.0)
}

fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_string(&body).unwrap()))
        .unwrap()
}

fn get_request(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn body_string(response: axum::response::Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

fn order_payload(name: &str, price: f64, location_name: &str) -> Value {
    json!({
        "item": { "id": name.to_lowercase(), "name": name, "price": price },
        "requester_location": { "lat": 46.5191, "lng": 6.5668 },
        "requester_location_name": location_name
    })
}

fn claim_payload(operator_id: &str, operator_name: &str) -> Value {
    json!({
        "operator_id": operator_id,
        "operator_name": operator_name,
        "operator_location": { "lat": 46.53, "lng": 6.58 }
    })
}

async fn create_order(app: &axum::Router, name: &str, price: f64, location_name: &str) -> Value {
    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/orders",
            order_payload(name, price, location_name),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    body_json(response).await
}

fn parse_date(value: &Value) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(value.as_str().unwrap())
        .unwrap()
        .with_timezone(&Utc)
}

#[tokio::test]
async fn health_returns_ok() {
    let app = setup();
    let response = app.oneshot(get_request("/health")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["pending_orders"], 0);
    assert_eq!(body["accepted_orders"], 0);
}

#[tokio::test]
async fn metrics_returns_prometheus_format() {
    let app = setup();
    let response = app.oneshot(get_request("/metrics")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let content_type = response
        .headers()
        .get("content-type")
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(content_type.contains("text/plain"));

    let body = body_string(response).await;
    assert!(body.contains("orders_created_total"));
    assert!(body.contains("pending_orders"));
}

#[tokio::test]
async fn create_order_returns_pending_order() {
    let app = setup();
    let body = create_order(&app, "Pizza", 20.0, "Campus").await;

    assert_eq!(body["status"], "Pending");
    assert_eq!(body["item"]["name"], "Pizza");
    assert_eq!(body["requester_location_name"], "Campus");
    assert!(body["operator"].is_null());
    assert!(body["delivery_date"].is_null());
    assert!(!body["id"].as_str().unwrap().is_empty());
}

#[tokio::test]
async fn create_order_empty_location_name_returns_400() {
    let app = setup();
    let response = app
        .oneshot(json_request(
            "POST",
            "/orders",
            order_payload("Pizza", 20.0, "   "),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn create_order_negative_price_returns_400() {
    let app = setup();
    let response = app
        .oneshot(json_request(
            "POST",
            "/orders",
            order_payload("Pizza", -1.0, "Campus"),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn get_unknown_order_returns_404() {
    let app = setup();
    let response = app
        .oneshot(get_request(
            "/orders/00000000-0000-0000-0000-000000000000",
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn created_order_is_readable_by_id() {
    let app = setup();
    let created = create_order(&app, "Pizza", 20.0, "Campus").await;
    let id = created["id"].as_str().unwrap();

    let response = app
        .oneshot(get_request(&format!("/orders/{id}")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["id"], created["id"]);
    assert_eq!(body["status"], "Pending");
}

#[tokio::test]
async fn pending_list_applies_search_filter() {
    let app = setup();
    create_order(&app, "Pizza", 20.0, "Campus").await;
    create_order(&app, "Sushi", 32.0, "Lakeside").await;
    create_order(&app, "Ramen", 18.0, "Station").await;

    let response = app
        .oneshot(get_request("/orders/pending?search=pizza"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    let orders = body.as_array().unwrap();
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0]["item"]["name"], "Pizza");
}

#[tokio::test]
async fn pending_list_sorts_by_price_descending() {
    let app = setup();
    create_order(&app, "Pizza", 20.0, "Campus").await;
    create_order(&app, "Sushi", 32.0, "Lakeside").await;
    create_order(&app, "Ramen", 18.0, "Station").await;

    let response = app
        .oneshot(get_request("/orders/pending?sort=priceDesc"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    let prices: Vec<f64> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|order| order["item"]["price"].as_f64().unwrap())
        .collect();
    assert_eq!(prices, vec![32.0, 20.0, 18.0]);
}

#[tokio::test]
async fn claimed_order_leaves_the_pending_list() {
    let app = setup();
    let claimed = create_order(&app, "Pizza", 20.0, "Campus").await;
    create_order(&app, "Sushi", 32.0, "Lakeside").await;

    let id = claimed["id"].as_str().unwrap();
    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/orders/{id}/claim"),
            claim_payload("op-1", "Ada"),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app.oneshot(get_request("/orders/pending")).await.unwrap();
    let body = body_json(response).await;
    let orders = body.as_array().unwrap();
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0]["item"]["name"], "Sushi");
}

#[tokio::test]
async fn claim_fixes_delivery_date_from_the_eta_draw() {
    let app = setup_with_eta(twelve_minute_eta());
    let created = create_order(&app, "Pizza", 20.0, "Campus").await;
    let id = created["id"].as_str().unwrap();

    let response = app
        .oneshot(json_request(
            "POST",
            &format!("/orders/{id}/claim"),
            claim_payload("op-1", "Ada"),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "Accepted");
    assert_eq!(body["operator"]["id"], "op-1");
    assert_eq!(body["operator"]["name"], "Ada");

    let order_date = parse_date(&body["order_date"]);
    let delivery_date = parse_date(&body["delivery_date"]);
    assert_eq!((delivery_date - order_date).num_seconds(), 12 * 60);
}

#[tokio::test]
async fn claim_with_empty_operator_name_returns_400_and_order_stays_pending() {
    let app = setup();
    let created = create_order(&app, "Pizza", 20.0, "Campus").await;
    let id = created["id"].as_str().unwrap();

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/orders/{id}/claim"),
            claim_payload("op-1", ""),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .oneshot(get_request(&format!("/orders/{id}")))
        .await
        .unwrap();
    let body = body_json(response).await;
    assert_eq!(body["status"], "Pending");
    assert!(body["operator"].is_null());
}

#[tokio::test]
async fn claim_without_location_returns_400() {
    let app = setup();
    let created = create_order(&app, "Pizza", 20.0, "Campus").await;
    let id = created["id"].as_str().unwrap();

    let response = app
        .oneshot(json_request(
            "POST",
            &format!("/orders/{id}/claim"),
            json!({ "operator_id": "op-1", "operator_name": "Ada" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn second_claim_returns_409() {
    let app = setup();
    let created = create_order(&app, "Pizza", 20.0, "Campus").await;
    let id = created["id"].as_str().unwrap();

    let first = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/orders/{id}/claim"),
            claim_payload("op-1", "Ada"),
        ))
        .await
        .unwrap();
    assert_eq!(first.status(), StatusCode::OK);

    let second = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/orders/{id}/claim"),
            claim_payload("op-2", "Grace"),
        ))
        .await
        .unwrap();
    assert_eq!(second.status(), StatusCode::CONFLICT);

    let response = app
        .oneshot(get_request(&format!("/orders/{id}")))
        .await
        .unwrap();
    let body = body_json(response).await;
    assert_eq!(body["operator"]["id"], "op-1");
}

#[tokio::test]
async fn claim_unknown_order_returns_404() {
    let app = setup();
    let response = app
        .oneshot(json_request(
            "POST",
            "/orders/00000000-0000-0000-0000-000000000000/claim",
            claim_payload("op-1", "Ada"),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn preview_reports_trip_distance() {
    let app = setup();
    // Requester sits in Lausanne; the operator previews from Geneva.
    let created = create_order(&app, "Pizza", 20.0, "Campus").await;
    let id = created["id"].as_str().unwrap();

    let response = app
        .oneshot(get_request(&format!(
            "/orders/{id}/preview?lat=46.2044&lng=6.1432"
        )))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    let distance = body["distance_km"].as_f64().unwrap();
    assert!((distance - 48.0).abs() < 3.0);
}

#[tokio::test]
async fn claim_outcomes_show_up_in_metrics() {
    let app = setup();
    let created = create_order(&app, "Pizza", 20.0, "Campus").await;
    let id = created["id"].as_str().unwrap();

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/orders/{id}/claim"),
            claim_payload("op-1", "Ada"),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app.oneshot(get_request("/metrics")).await.unwrap();
    let body = body_string(response).await;
    assert!(body.contains("claims_total"));
    assert!(body.contains("outcome=\"accepted\""));
}
