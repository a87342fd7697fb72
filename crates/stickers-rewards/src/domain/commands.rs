//! Commands for the Rewards context.

use chrono::{DateTime, Utc};
use stickers_core::command::Command;
use uuid::Uuid;

use super::items::LineItem;

/// Command to record a purchase transaction and award its stickers.
///
/// Only produced by `validation::validate_submission`, so every field is
/// already trimmed and range-checked.
#[derive(Debug, Clone)]
pub struct RecordTransaction {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// Caller-supplied transaction identifier (idempotency key).
    pub transaction_id: String,
    /// Shopper to credit.
    pub shopper_id: String,
    /// Point of sale.
    pub store_id: String,
    /// When the purchase happened.
    pub timestamp: DateTime<Utc>,
    /// Purchased items, non-empty.
    pub items: Vec<LineItem>,
}

impl Command for RecordTransaction {
    const NAME: &'static str = "rewards.record_transaction";

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }

    fn idempotency_key(&self) -> &str {
        &self.transaction_id
    }
}
