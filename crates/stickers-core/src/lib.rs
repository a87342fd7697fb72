//! Shared domain abstractions for the sticker rewards backend.
//!
//! This crate defines the traits, records, and error types that the rewards
//! context and its adapters depend on. It contains no infrastructure code.

pub mod clock;
pub mod command;
pub mod error;
pub mod repository;
