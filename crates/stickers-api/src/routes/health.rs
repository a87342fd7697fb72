//! Liveness probe.

use axum::{Json, Router, routing::get};
use serde::Serialize;

use crate::state::AppState;

/// Body of a successful health check.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Always `"ok"` while the process is serving requests.
    pub status: &'static str,
    /// Crate version of the running server.
    pub version: &'static str,
}

/// GET /health
async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Returns the health check router, mounted outside `/api`.
pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}

#[cfg(test)]
mod tests {
    use super::*;

    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use serde_json::Value;
    use std::sync::Arc;
    use stickers_test_support::{FixedClock, InMemoryLoyaltyRepository};
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_health_reports_ok_and_version() {
        let state = AppState::new(
            Arc::new(FixedClock::default()),
            Arc::new(InMemoryLoyaltyRepository::new()),
        );
        let app = router().with_state(state);
        let request = Request::builder()
            .uri("/health")
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body_bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: Value = serde_json::from_slice(&body_bytes).unwrap();
        assert_eq!(json["status"], "ok");
        assert_eq!(json["version"], env!("CARGO_PKG_VERSION"));
    }
}
