//! HTTP routes. Everything except the health check is served under `/api`.

use axum::Router;

use crate::state::AppState;

pub mod health;
pub mod shoppers;
pub mod stats;
pub mod transactions;

/// Returns the full application router, before state is attached.
pub fn app_router() -> Router<AppState> {
    let api = Router::new()
        .merge(transactions::router())
        .merge(shoppers::router())
        .merge(stats::router());

    Router::new().merge(health::router()).nest("/api", api)
}
