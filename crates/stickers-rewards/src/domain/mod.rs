//! Domain model for the Rewards context.

pub mod calculator;
pub mod commands;
pub mod items;
pub mod rules;
pub mod validation;
