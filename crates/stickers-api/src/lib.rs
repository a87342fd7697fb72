//! Sticker rewards HTTP API: configuration, shared state, error mapping and
//! routes. The binary in `main.rs` wires them to a PostgreSQL pool.

pub mod config;
pub mod error;
pub mod routes;
pub mod state;
