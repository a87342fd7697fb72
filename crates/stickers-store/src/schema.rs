//! Loyalty database schema.
//!
//! The SQL lives in the workspace `migrations/` directory and is embedded at
//! compile time, so the server binary carries its own schema.

use sqlx::migrate::Migrator;

/// Creates the `shoppers` and `transactions` tables and their indexes.
pub static MIGRATOR: Migrator = sqlx::migrate!("../../migrations");
