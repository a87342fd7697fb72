//! Sticker rewards API server entry point.

use std::sync::Arc;

use sqlx::postgres::PgPoolOptions;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use stickers_api::config::ServerConfig;
use stickers_api::error::AppError;
use stickers_api::routes;
use stickers_api::state::AppState;
use stickers_core::clock::SystemClock;
use stickers_store::pg_loyalty_repository::PgLoyaltyRepository;
use stickers_store::schema::MIGRATOR;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    // Initialize tracing subscriber.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    tracing::info!("Starting sticker rewards API server");

    let config = ServerConfig::from_env()?;
    let addr = config.socket_addr()?;

    // Create database connection pool.
    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect(&config.database_url)
        .await?;

    if config.run_migrations {
        MIGRATOR.run(&pool).await?;
        tracing::info!("Database migrations applied");
    }

    let app_state = AppState::new(
        Arc::new(SystemClock),
        Arc::new(PgLoyaltyRepository::new(pool)),
    );

    let app = routes::app_router()
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(app_state);

    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app).await?;

    Ok(())
}
