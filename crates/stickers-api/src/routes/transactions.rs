//! Routes for transaction ingestion.

use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::{Json, Router, routing::post};
use serde::Serialize;
use tracing::{info, instrument};
use uuid::Uuid;

use stickers_rewards::application::command_handlers::{self, IngestionOutcome};
use stickers_rewards::domain::calculator::StickerBreakdown;
use stickers_rewards::domain::validation::{self, TransactionInput};

use crate::error::ApiError;
use crate::state::AppState;

/// Award breakdown as reported to the caller. Duplicates report `{}`.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum BreakdownBody {
    /// The breakdown of a freshly computed award.
    Computed(StickerBreakdown),
    /// No breakdown is available for a replayed transaction.
    Empty {},
}

/// Response body for POST /transactions/.
#[derive(Debug, Serialize)]
pub struct TransactionResponse {
    /// The submitted transaction identifier.
    pub transaction_id: String,
    /// The credited shopper.
    pub shopper_id: String,
    /// Stickers awarded by this transaction.
    pub stickers_earned: u32,
    /// The shopper's balance after the award.
    pub new_balance: u64,
    /// How the award was computed.
    pub breakdown: BreakdownBody,
    /// Whether this submission repeated an already recorded transaction.
    pub is_duplicate: bool,
}

impl From<IngestionOutcome> for TransactionResponse {
    fn from(outcome: IngestionOutcome) -> Self {
        let is_duplicate = outcome.is_duplicate();
        let (receipt, breakdown) = match outcome {
            IngestionOutcome::Awarded { receipt, breakdown } => {
                (receipt, BreakdownBody::Computed(breakdown))
            }
            IngestionOutcome::Duplicate { receipt } => (receipt, BreakdownBody::Empty {}),
        };
        Self {
            transaction_id: receipt.transaction_id,
            shopper_id: receipt.shopper_id,
            stickers_earned: receipt.stickers_earned,
            new_balance: receipt.new_balance,
            breakdown,
            is_duplicate,
        }
    }
}

/// POST /transactions/
#[instrument(skip(state, payload))]
async fn record_transaction(
    State(state): State<AppState>,
    payload: Result<Json<TransactionInput>, JsonRejection>,
) -> Result<(StatusCode, Json<TransactionResponse>), ApiError> {
    let Json(input) = payload?;
    let command = validation::validate_submission(input, Uuid::new_v4())?;

    info!(
        correlation_id = %command.correlation_id,
        transaction_id = %command.transaction_id,
        shopper_id = %command.shopper_id,
        "handling record_transaction command"
    );

    let outcome = command_handlers::handle_record_transaction(
        &command,
        &state.rules,
        state.clock.as_ref(),
        &*state.repository,
    )
    .await?;

    let status = if outcome.is_duplicate() {
        StatusCode::OK
    } else {
        StatusCode::CREATED
    };

    Ok((status, Json(TransactionResponse::from(outcome))))
}

/// Returns the router for transaction ingestion.
pub fn router() -> Router<AppState> {
    Router::new().route("/transactions/", post(record_transaction))
}

#[cfg(test)]
mod tests {
    use super::*;

    use axum::body::Body;
    use axum::http::Request;
    use serde_json::{Value, json};
    use std::sync::Arc;
    use stickers_core::clock::Clock;
    use stickers_core::repository::LoyaltyRepository;
    use stickers_test_support::{FailingLoyaltyRepository, FixedClock, InMemoryLoyaltyRepository};
    use tower::ServiceExt;

    fn app_state_with(repository: Arc<dyn LoyaltyRepository>) -> AppState {
        let clock: Arc<dyn Clock + Send + Sync> = Arc::new(FixedClock::default());
        AppState::new(clock, repository)
    }

    fn transaction_body(transaction_id: &str, items: Value) -> Value {
        json!({
            "transaction_id": transaction_id,
            "shopper_id": "shopper-1",
            "store_id": "store-1",
            "timestamp": "2026-01-15T09:30:00Z",
            "items": items,
        })
    }

    async fn post_transaction(state: AppState, body: &Value) -> (StatusCode, Value) {
        let app = router().with_state(state);
        let request = Request::builder()
            .method("POST")
            .uri("/transactions/")
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_vec(body).unwrap()))
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let body_bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&body_bytes).unwrap())
    }

    #[tokio::test]
    async fn test_new_transaction_returns_201_with_breakdown() {
        // Arrange
        let state = app_state_with(Arc::new(InMemoryLoyaltyRepository::new()));
        let body = transaction_body(
            "txn-1",
            json!([{ "sku": "A", "name": "Apples", "quantity": 1, "unit_price": 25.00, "category": "grocery" }]),
        );

        // Act
        let (status, json) = post_transaction(state, &body).await;

        // Assert
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(json["transaction_id"], "txn-1");
        assert_eq!(json["shopper_id"], "shopper-1");
        assert_eq!(json["stickers_earned"], 2);
        assert_eq!(json["new_balance"], 2);
        assert_eq!(json["is_duplicate"], false);
        assert_eq!(
            json["breakdown"],
            json!({ "base_stickers": 2, "promo_bonus": 0, "raw_total": 2, "capped": false })
        );
    }

    #[tokio::test]
    async fn test_capped_award_reports_capped_breakdown() {
        let state = app_state_with(Arc::new(InMemoryLoyaltyRepository::new()));
        let body = transaction_body(
            "txn-1",
            json!([{ "sku": "P", "name": "Promo", "quantity": 2, "unit_price": "60.00", "category": "PROMO" }]),
        );

        let (status, json) = post_transaction(state, &body).await;

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(json["stickers_earned"], 5);
        assert_eq!(json["breakdown"]["raw_total"], 14);
        assert_eq!(json["breakdown"]["capped"], true);
    }

    #[tokio::test]
    async fn test_repeated_transaction_returns_200_duplicate_with_empty_breakdown() {
        // Arrange
        let repository = Arc::new(InMemoryLoyaltyRepository::new());
        let state = app_state_with(repository.clone());
        let first = transaction_body(
            "txn-1",
            json!([{ "sku": "A", "name": "Apples", "quantity": 3, "unit_price": 2.00, "category": "promo" }]),
        );
        let second = transaction_body(
            "txn-1",
            json!([{ "sku": "B", "name": "TV", "quantity": 1, "unit_price": 999.00, "category": "electronics" }]),
        );
        post_transaction(state.clone(), &first).await;

        // Act
        let (status, json) = post_transaction(state, &second).await;

        // Assert
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["is_duplicate"], true);
        assert_eq!(json["stickers_earned"], 3);
        assert_eq!(json["new_balance"], 3);
        assert_eq!(json["breakdown"], json!({}));
        assert_eq!(repository.transaction_count(), 1);
    }

    #[tokio::test]
    async fn test_empty_items_returns_400_validation_error() {
        let repository = Arc::new(InMemoryLoyaltyRepository::new());
        let state = app_state_with(repository.clone());

        let (status, json) = post_transaction(state, &transaction_body("txn-1", json!([]))).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"], "validation_error");
        assert!(json["details"]["items"].is_array());
        assert_eq!(repository.transaction_count(), 0);
    }

    #[tokio::test]
    async fn test_missing_fields_are_reported_per_field() {
        let state = app_state_with(Arc::new(InMemoryLoyaltyRepository::new()));

        let (status, json) = post_transaction(state, &json!({})).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        for field in ["transaction_id", "shopper_id", "store_id", "timestamp", "items"] {
            assert_eq!(
                json["details"][field][0], "This field is required.",
                "field {field}"
            );
        }
    }

    #[tokio::test]
    async fn test_malformed_json_returns_400_instead_of_422() {
        let app = router().with_state(app_state_with(Arc::new(InMemoryLoyaltyRepository::new())));
        let request = Request::builder()
            .method("POST")
            .uri("/transactions/")
            .header("content-type", "application/json")
            .body(Body::from("{not json"))
            .unwrap();

        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body_bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: Value = serde_json::from_slice(&body_bytes).unwrap();
        assert_eq!(json["error"], "validation_error");
        assert!(json["details"]["body"].is_array());
    }

    #[tokio::test]
    async fn test_wrongly_typed_quantity_is_reported_on_the_item_field() {
        let state = app_state_with(Arc::new(InMemoryLoyaltyRepository::new()));
        let body = transaction_body(
            "txn-1",
            json!([{ "sku": "A", "name": "Apples", "quantity": "lots", "unit_price": 1.00, "category": "grocery" }]),
        );

        let (status, json) = post_transaction(state, &body).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"], "validation_error");
        assert_eq!(
            json["details"]["items[0].quantity"],
            json!(["A valid integer is required."])
        );
        assert!(json["details"].get("body").is_none());
    }

    #[tokio::test]
    async fn test_numeric_strings_and_numeric_ids_are_coerced() {
        // Arrange
        let state = app_state_with(Arc::new(InMemoryLoyaltyRepository::new()));
        let mut body = transaction_body(
            "ignored",
            json!([{ "sku": "A", "name": "Apples", "quantity": "2", "unit_price": "12.50", "category": "grocery" }]),
        );
        body["transaction_id"] = json!(123);

        // Act
        let (status, json) = post_transaction(state, &body).await;

        // Assert
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(json["transaction_id"], "123");
        assert_eq!(json["stickers_earned"], 2);
    }

    #[tokio::test]
    async fn test_returns_500_when_repository_fails() {
        let state = app_state_with(Arc::new(FailingLoyaltyRepository));
        let body = transaction_body(
            "txn-1",
            json!([{ "sku": "A", "name": "Apples", "quantity": 1, "unit_price": 25.00, "category": "grocery" }]),
        );

        let (status, json) = post_transaction(state, &body).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json["error"], "infrastructure_error");
    }
}
