//! PostgreSQL persistence for shoppers and their sticker transactions.

pub mod pg_loyalty_repository;
pub mod schema;
