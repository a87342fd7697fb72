//! Shared test helpers for API integration tests.
#![allow(dead_code)]

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use stickers_core::clock::Clock;
use stickers_store::pg_loyalty_repository::PgLoyaltyRepository;
use stickers_test_support::FixedClock;
use sqlx::PgPool;
use tower::ServiceExt;

use stickers_api::routes;
use stickers_api::state::AppState;

/// Build the full app router with a real `PgLoyaltyRepository` and a fixed
/// clock at 2026-01-15T10:00:00Z. Uses the same route structure as `main.rs`.
pub fn build_test_app(pool: PgPool) -> Router {
    let clock: Arc<dyn Clock + Send + Sync> = Arc::new(FixedClock::default());
    let app_state = AppState::new(clock, Arc::new(PgLoyaltyRepository::new(pool)));

    routes::app_router().with_state(app_state)
}

/// A valid transaction submission with a single item.
pub fn transaction_body(
    transaction_id: &str,
    shopper_id: &str,
    store_id: &str,
    items: serde_json::Value,
) -> serde_json::Value {
    serde_json::json!({
        "transaction_id": transaction_id,
        "shopper_id": shopper_id,
        "store_id": store_id,
        "timestamp": "2026-01-15T09:30:00Z",
        "items": items,
    })
}

/// One item of `quantity` units at `unit_price` in `category`.
pub fn item(quantity: u32, unit_price: &str, category: &str) -> serde_json::Value {
    serde_json::json!({
        "sku": format!("SKU-{category}"),
        "name": format!("{category} item"),
        "quantity": quantity,
        "unit_price": unit_price,
        "category": category,
    })
}

/// Send a POST request with a JSON body and return the response.
pub async fn post_json(
    app: Router,
    uri: &str,
    body: &serde_json::Value,
) -> (StatusCode, serde_json::Value) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_vec(body).unwrap()))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body_bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&body_bytes).unwrap();

    (status, json)
}

/// Send a GET request and return the response.
pub async fn get_json(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let request = Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body_bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&body_bytes).unwrap();

    (status, json)
}
