//! Loyalty repository abstraction and the plain records it exchanges.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// A line item as persisted inside a transaction's `items` blob.
///
/// The blob holds plain JSON numbers only, so `unit_price` is a float here.
/// Exact decimal values exist only up to the persistence boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredItem {
    /// Stock keeping unit.
    pub sku: String,
    /// Display name.
    pub name: String,
    /// Units purchased.
    pub quantity: u32,
    /// Price per unit.
    pub unit_price: f64,
    /// Product category label.
    pub category: String,
}

/// A shopper row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShopperRecord {
    /// External shopper identifier.
    pub shopper_id: String,
    /// Running sticker balance.
    pub sticker_balance: u64,
    /// When the shopper was first seen.
    pub created_at: DateTime<Utc>,
    /// When the balance last changed.
    pub updated_at: DateTime<Utc>,
}

/// A recorded purchase transaction. Immutable once written.
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionRecord {
    /// External transaction identifier (idempotency key).
    pub transaction_id: String,
    /// Owning shopper.
    pub shopper_id: String,
    /// Point of sale.
    pub store_id: String,
    /// Caller-supplied purchase instant.
    pub timestamp: DateTime<Utc>,
    /// Purchased items in submission order.
    pub items: Vec<StoredItem>,
    /// Basket total.
    pub total_amount: Decimal,
    /// Stickers awarded for this transaction.
    pub stickers_earned: u32,
    /// Server-assigned creation instant.
    pub created_at: DateTime<Utc>,
}

/// A shopper together with their transactions, read as one snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct ShopperHistory {
    /// The shopper row.
    pub shopper: ShopperRecord,
    /// The shopper's transactions, most recent purchase first, ties by
    /// `transaction_id`.
    pub transactions: Vec<TransactionRecord>,
}

/// Everything needed to record a newly awarded transaction.
#[derive(Debug, Clone, PartialEq)]
pub struct NewTransaction {
    /// External transaction identifier (idempotency key).
    pub transaction_id: String,
    /// Shopper to credit; enrolled on first use.
    pub shopper_id: String,
    /// Point of sale.
    pub store_id: String,
    /// Caller-supplied purchase instant.
    pub timestamp: DateTime<Utc>,
    /// Purchased items in storage form.
    pub items: Vec<StoredItem>,
    /// Basket total, scaled to two fractional digits.
    pub total_amount: Decimal,
    /// Stickers to award.
    pub stickers_earned: u32,
    /// Server time used for `created_at` / `updated_at`.
    pub recorded_at: DateTime<Utc>,
}

/// Shopper identifier and balance, as shown in listings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShopperBalance {
    /// External shopper identifier.
    pub shopper_id: String,
    /// Running sticker balance.
    pub sticker_balance: u64,
}

/// Sticker totals for a single store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreTotals {
    /// Point of sale.
    pub store_id: String,
    /// Stickers awarded at this store.
    pub total_stickers: u64,
    /// Transactions recorded at this store.
    pub transaction_count: u64,
}

/// Raw campaign aggregates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CampaignTotals {
    /// Stickers awarded across all transactions.
    pub total_stickers_awarded: u64,
    /// Number of recorded transactions.
    pub total_transactions: u64,
    /// Number of enrolled shoppers.
    pub total_shoppers: u64,
    /// Per-store totals, highest `total_stickers` first, ties by `store_id`.
    pub stickers_by_store: Vec<StoreTotals>,
    /// Highest balances first, ties by `shopper_id`, at most the requested limit.
    pub top_shoppers: Vec<ShopperBalance>,
}

/// Persistence port for shoppers and their transactions.
#[async_trait]
pub trait LoyaltyRepository: Send + Sync {
    /// Looks up a transaction by its external identifier.
    async fn find_transaction(
        &self,
        transaction_id: &str,
    ) -> Result<Option<TransactionRecord>, DomainError>;

    /// Looks up a shopper by its external identifier.
    async fn find_shopper(&self, shopper_id: &str) -> Result<Option<ShopperRecord>, DomainError>;

    /// Records a new award as one atomic unit: ensures the shopper exists,
    /// inserts the transaction, and adds `stickers_earned` to the balance.
    /// Returns the shopper as it stands after the increment.
    ///
    /// Implementations must not lose an increment when awards for the same
    /// shopper race, and must leave no partial state behind on failure.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::DuplicateTransaction` if `transaction_id` is
    /// already recorded, `DomainError::Infrastructure` on storage failure.
    async fn record_award(&self, award: &NewTransaction) -> Result<ShopperRecord, DomainError>;

    /// Lists every shopper, newest first.
    async fn list_shoppers(&self) -> Result<Vec<ShopperBalance>, DomainError>;

    /// Reads a shopper and their transactions from one consistent snapshot,
    /// so the balance always equals the sum of the listed awards.
    /// Returns `None` if the shopper has never transacted.
    async fn shopper_history(&self, shopper_id: &str)
    -> Result<Option<ShopperHistory>, DomainError>;

    /// Computes campaign-wide aggregates, keeping at most `top_shoppers_limit`
    /// entries in `top_shoppers`.
    async fn campaign_totals(&self, top_shoppers_limit: usize)
    -> Result<CampaignTotals, DomainError>;
}
