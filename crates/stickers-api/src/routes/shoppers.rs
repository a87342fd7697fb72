//! Routes for shopper balances and histories.

use axum::extract::{Path, State};
use axum::{Json, Router, routing::get};
use tracing::{info, instrument};

use stickers_rewards::application::query_handlers::{self, ShopperSummaryView, ShopperView};

use crate::error::ApiError;
use crate::state::AppState;

/// GET /shoppers/
#[instrument(skip(state))]
async fn list_shoppers(
    State(state): State<AppState>,
) -> Result<Json<Vec<ShopperSummaryView>>, ApiError> {
    let shoppers = query_handlers::list_shoppers(&*state.repository).await?;
    info!(count = shoppers.len(), "listed shoppers");
    Ok(Json(shoppers))
}

/// GET /shoppers/{shopper_id}/
#[instrument(skip(state))]
async fn get_shopper(
    State(state): State<AppState>,
    Path(shopper_id): Path<String>,
) -> Result<Json<ShopperView>, ApiError> {
    let view = query_handlers::get_shopper(&shopper_id, &*state.repository).await?;
    Ok(Json(view))
}

/// Returns the router for shopper queries.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/shoppers/", get(list_shoppers))
        .route("/shoppers/{shopper_id}/", get(get_shopper))
}
