//! Rewards bounded context: sticker calculation and transaction ingestion.
//!
//! Responsible for turning purchase transactions into sticker awards:
//! validating submissions, computing the capped award, recording it exactly
//! once per transaction id, and answering balance and campaign queries.

pub mod application;
pub mod domain;
