//! Query handlers for the Rewards context.
//!
//! Read-only views over shoppers, their transactions and campaign totals.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use stickers_core::error::DomainError;
use stickers_core::repository::{
    LoyaltyRepository, ShopperBalance, ShopperHistory, StoreTotals, StoredItem, TransactionRecord,
};

/// Number of shoppers listed in `CampaignStatsView::top_shoppers`.
pub const TOP_SHOPPERS_LIMIT: usize = 10;

/// A shopper's identifier and balance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShopperSummaryView {
    /// External shopper identifier.
    pub shopper_id: String,
    /// Running sticker balance.
    pub sticker_balance: u64,
}

impl From<ShopperBalance> for ShopperSummaryView {
    fn from(balance: ShopperBalance) -> Self {
        Self {
            shopper_id: balance.shopper_id,
            sticker_balance: balance.sticker_balance,
        }
    }
}

/// A recorded transaction as shown in a shopper's history.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransactionView {
    /// External transaction identifier.
    pub transaction_id: String,
    /// Point of sale.
    pub store_id: String,
    /// Purchase instant.
    pub timestamp: DateTime<Utc>,
    /// Purchased items as stored.
    pub items: Vec<StoredItem>,
    /// Basket total, serialized as a decimal string.
    pub total_amount: Decimal,
    /// Stickers awarded.
    pub stickers_earned: u32,
    /// When the transaction was recorded.
    pub created_at: DateTime<Utc>,
}

impl From<TransactionRecord> for TransactionView {
    fn from(record: TransactionRecord) -> Self {
        Self {
            transaction_id: record.transaction_id,
            store_id: record.store_id,
            timestamp: record.timestamp,
            items: record.items,
            total_amount: record.total_amount,
            stickers_earned: record.stickers_earned,
            created_at: record.created_at,
        }
    }
}

/// A shopper with their full transaction history.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShopperView {
    /// External shopper identifier.
    pub shopper_id: String,
    /// Running sticker balance.
    pub sticker_balance: u64,
    /// Transactions, most recent purchase first.
    pub transactions: Vec<TransactionView>,
    /// When the shopper was enrolled.
    pub created_at: DateTime<Utc>,
    /// When the balance last changed.
    pub updated_at: DateTime<Utc>,
}

/// Sticker totals for one store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoreStatsView {
    /// Point of sale.
    pub store_id: String,
    /// Stickers awarded at the store.
    pub total_stickers: u64,
    /// Transactions recorded at the store.
    pub transaction_count: u64,
}

impl From<StoreTotals> for StoreStatsView {
    fn from(totals: StoreTotals) -> Self {
        Self {
            store_id: totals.store_id,
            total_stickers: totals.total_stickers,
            transaction_count: totals.transaction_count,
        }
    }
}

/// Campaign-wide statistics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CampaignStatsView {
    /// Stickers awarded across all transactions.
    pub total_stickers_awarded: u64,
    /// Recorded transactions.
    pub total_transactions: u64,
    /// Enrolled shoppers.
    pub total_shoppers: u64,
    /// Mean award per transaction, two decimal places.
    #[serde(with = "rust_decimal::serde::float")]
    pub avg_stickers_per_transaction: Decimal,
    /// Per-store totals, most stickers first.
    pub stickers_by_store: Vec<StoreStatsView>,
    /// Highest balances, at most `TOP_SHOPPERS_LIMIT`.
    pub top_shoppers: Vec<ShopperSummaryView>,
}

/// Lists every shopper with their balance, newest first.
///
/// # Errors
///
/// Returns `DomainError::Infrastructure` if the repository fails.
pub async fn list_shoppers(
    repo: &dyn LoyaltyRepository,
) -> Result<Vec<ShopperSummaryView>, DomainError> {
    let shoppers = repo.list_shoppers().await?;
    Ok(shoppers.into_iter().map(ShopperSummaryView::from).collect())
}

/// Retrieves a shopper and their transaction history.
///
/// # Errors
///
/// Returns `DomainError::ShopperNotFound` if the shopper has never transacted.
/// Returns `DomainError::Infrastructure` if the repository fails.
pub async fn get_shopper(
    shopper_id: &str,
    repo: &dyn LoyaltyRepository,
) -> Result<ShopperView, DomainError> {
    let ShopperHistory {
        shopper,
        transactions,
    } = repo
        .shopper_history(shopper_id)
        .await?
        .ok_or_else(|| DomainError::ShopperNotFound(shopper_id.to_owned()))?;

    Ok(ShopperView {
        shopper_id: shopper.shopper_id,
        sticker_balance: shopper.sticker_balance,
        transactions: transactions.into_iter().map(TransactionView::from).collect(),
        created_at: shopper.created_at,
        updated_at: shopper.updated_at,
    })
}

/// Computes campaign statistics.
///
/// # Errors
///
/// Returns `DomainError::Infrastructure` if the repository fails.
pub async fn get_campaign_stats(
    repo: &dyn LoyaltyRepository,
) -> Result<CampaignStatsView, DomainError> {
    let totals = repo.campaign_totals(TOP_SHOPPERS_LIMIT).await?;

    Ok(CampaignStatsView {
        avg_stickers_per_transaction: average(
            totals.total_stickers_awarded,
            totals.total_transactions,
        ),
        total_stickers_awarded: totals.total_stickers_awarded,
        total_transactions: totals.total_transactions,
        total_shoppers: totals.total_shoppers,
        stickers_by_store: totals
            .stickers_by_store
            .into_iter()
            .map(StoreStatsView::from)
            .collect(),
        top_shoppers: totals
            .top_shoppers
            .into_iter()
            .map(ShopperSummaryView::from)
            .collect(),
    })
}

/// `total / count` rounded half-to-even to two places; zero when `count` is 0.
fn average(total: u64, count: u64) -> Decimal {
    Decimal::from(total)
        .checked_div(Decimal::from(count))
        .map_or(Decimal::ZERO, |mean| mean.round_dp(2))
}
