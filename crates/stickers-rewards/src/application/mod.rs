//! Application services for the Rewards context.

pub mod command_handlers;
pub mod query_handlers;
