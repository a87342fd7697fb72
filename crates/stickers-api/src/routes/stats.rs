//! Campaign statistics endpoint.

use axum::extract::State;
use axum::{Json, Router, routing::get};
use tracing::instrument;

use stickers_rewards::application::query_handlers::{self, CampaignStatsView};

use crate::error::ApiError;
use crate::state::AppState;

/// GET /stats/
#[instrument(skip(state))]
async fn campaign_stats(State(state): State<AppState>) -> Result<Json<CampaignStatsView>, ApiError> {
    Ok(Json(
        query_handlers::get_campaign_stats(&*state.repository).await?,
    ))
}

/// Returns the router for campaign statistics.
pub fn router() -> Router<AppState> {
    Router::new().route("/stats/", get(campaign_stats))
}

#[cfg(test)]
mod tests {
    use super::*;

    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use chrono::{TimeZone, Utc};
    use rust_decimal_macros::dec;
    use serde_json::{Value, json};
    use std::sync::Arc;
    use stickers_core::clock::Clock;
    use stickers_core::repository::{LoyaltyRepository, NewTransaction};
    use stickers_test_support::{FailingLoyaltyRepository, FixedClock, InMemoryLoyaltyRepository};
    use tower::ServiceExt;

    fn app_state_with(repository: Arc<dyn LoyaltyRepository>) -> AppState {
        let clock: Arc<dyn Clock + Send + Sync> = Arc::new(FixedClock::default());
        AppState::new(clock, repository)
    }

    fn award(transaction_id: &str, shopper_id: &str, store_id: &str, stickers: u32) -> NewTransaction {
        NewTransaction {
            transaction_id: transaction_id.to_string(),
            shopper_id: shopper_id.to_string(),
            store_id: store_id.to_string(),
            timestamp: Utc.with_ymd_and_hms(2026, 1, 15, 9, 30, 0).unwrap(),
            items: Vec::new(),
            total_amount: dec!(10.00),
            stickers_earned: stickers,
            recorded_at: Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0).unwrap(),
        }
    }

    async fn get_stats(state: AppState) -> (StatusCode, Value) {
        let app = router().with_state(state);
        let request = Request::builder()
            .method("GET")
            .uri("/stats/")
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let body_bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&body_bytes).unwrap())
    }

    #[tokio::test]
    async fn test_stats_on_empty_campaign() {
        let state = app_state_with(Arc::new(InMemoryLoyaltyRepository::new()));

        let (status, json) = get_stats(state).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            json,
            json!({
                "total_stickers_awarded": 0,
                "total_transactions": 0,
                "total_shoppers": 0,
                "avg_stickers_per_transaction": 0.0,
                "stickers_by_store": [],
                "top_shoppers": []
            })
        );
    }

    #[tokio::test]
    async fn test_stats_aggregate_recorded_transactions() {
        // Arrange
        let repository = Arc::new(InMemoryLoyaltyRepository::new());
        for (txn, shopper, store, stickers) in [
            ("txn-1", "shopper-a", "store-1", 2),
            ("txn-2", "shopper-b", "store-2", 5),
            ("txn-3", "shopper-a", "store-1", 1),
        ] {
            repository
                .record_award(&award(txn, shopper, store, stickers))
                .await
                .unwrap();
        }
        let state = app_state_with(repository);

        // Act
        let (status, json) = get_stats(state).await;

        // Assert
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["total_stickers_awarded"], 8);
        assert_eq!(json["total_transactions"], 3);
        assert_eq!(json["total_shoppers"], 2);
        assert_eq!(json["avg_stickers_per_transaction"], 2.67);
        assert_eq!(
            json["stickers_by_store"],
            json!([
                { "store_id": "store-2", "total_stickers": 5, "transaction_count": 1 },
                { "store_id": "store-1", "total_stickers": 3, "transaction_count": 2 }
            ])
        );
        assert_eq!(
            json["top_shoppers"],
            json!([
                { "shopper_id": "shopper-b", "sticker_balance": 5 },
                { "shopper_id": "shopper-a", "sticker_balance": 3 }
            ])
        );
    }

    #[tokio::test]
    async fn test_stats_returns_500_when_repository_fails() {
        let state = app_state_with(Arc::new(FailingLoyaltyRepository));

        let (status, json) = get_stats(state).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json["error"], "infrastructure_error");
    }
}
