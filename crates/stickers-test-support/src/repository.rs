//! `LoyaltyRepository` implementations for tests.

use std::cmp::Reverse;
use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

use async_trait::async_trait;
use stickers_core::error::DomainError;
use stickers_core::repository::{
    CampaignTotals, LoyaltyRepository, NewTransaction, ShopperBalance, ShopperHistory,
    ShopperRecord, StoreTotals, TransactionRecord,
};

#[derive(Debug, Default)]
struct Ledger {
    shoppers: HashMap<String, ShopperRecord>,
    transactions: Vec<TransactionRecord>,
}

/// A loyalty repository held in memory. `record_award` runs under a single
/// lock, so it is atomic with respect to every other call and rejects a
/// repeated `transaction_id` the way a unique constraint would.
#[derive(Debug, Default)]
pub struct InMemoryLoyaltyRepository {
    ledger: Mutex<Ledger>,
}

impl InMemoryLoyaltyRepository {
    /// Creates an empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of recorded transactions.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn transaction_count(&self) -> usize {
        self.ledger.lock().unwrap().transactions.len()
    }
}

fn balance_of(shopper: &ShopperRecord) -> ShopperBalance {
    ShopperBalance {
        shopper_id: shopper.shopper_id.clone(),
        sticker_balance: shopper.sticker_balance,
    }
}

#[async_trait]
impl LoyaltyRepository for InMemoryLoyaltyRepository {
    async fn find_transaction(
        &self,
        transaction_id: &str,
    ) -> Result<Option<TransactionRecord>, DomainError> {
        let ledger = self.ledger.lock().unwrap();
        Ok(ledger
            .transactions
            .iter()
            .find(|t| t.transaction_id == transaction_id)
            .cloned())
    }

    async fn find_shopper(&self, shopper_id: &str) -> Result<Option<ShopperRecord>, DomainError> {
        Ok(self.ledger.lock().unwrap().shoppers.get(shopper_id).cloned())
    }

    async fn record_award(&self, award: &NewTransaction) -> Result<ShopperRecord, DomainError> {
        let mut ledger = self.ledger.lock().unwrap();
        if ledger
            .transactions
            .iter()
            .any(|t| t.transaction_id == award.transaction_id)
        {
            return Err(DomainError::DuplicateTransaction(
                award.transaction_id.clone(),
            ));
        }

        ledger.transactions.push(TransactionRecord {
            transaction_id: award.transaction_id.clone(),
            shopper_id: award.shopper_id.clone(),
            store_id: award.store_id.clone(),
            timestamp: award.timestamp,
            items: award.items.clone(),
            total_amount: award.total_amount,
            stickers_earned: award.stickers_earned,
            created_at: award.recorded_at,
        });

        let shopper = ledger
            .shoppers
            .entry(award.shopper_id.clone())
            .or_insert_with(|| ShopperRecord {
                shopper_id: award.shopper_id.clone(),
                sticker_balance: 0,
                created_at: award.recorded_at,
                updated_at: award.recorded_at,
            });
        shopper.sticker_balance += u64::from(award.stickers_earned);
        shopper.updated_at = award.recorded_at;
        Ok(shopper.clone())
    }

    async fn list_shoppers(&self) -> Result<Vec<ShopperBalance>, DomainError> {
        let ledger = self.ledger.lock().unwrap();
        let mut shoppers: Vec<&ShopperRecord> = ledger.shoppers.values().collect();
        shoppers.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| a.shopper_id.cmp(&b.shopper_id))
        });
        Ok(shoppers.into_iter().map(balance_of).collect())
    }

    async fn shopper_history(
        &self,
        shopper_id: &str,
    ) -> Result<Option<ShopperHistory>, DomainError> {
        let ledger = self.ledger.lock().unwrap();
        let Some(shopper) = ledger.shoppers.get(shopper_id).cloned() else {
            return Ok(None);
        };
        let mut transactions: Vec<TransactionRecord> = ledger
            .transactions
            .iter()
            .filter(|t| t.shopper_id == shopper_id)
            .cloned()
            .collect();
        transactions.sort_by(|a, b| {
            b.timestamp
                .cmp(&a.timestamp)
                .then_with(|| a.transaction_id.cmp(&b.transaction_id))
        });
        Ok(Some(ShopperHistory {
            shopper,
            transactions,
        }))
    }

    async fn campaign_totals(
        &self,
        top_shoppers_limit: usize,
    ) -> Result<CampaignTotals, DomainError> {
        let ledger = self.ledger.lock().unwrap();

        let mut by_store: BTreeMap<&str, (u64, u64)> = BTreeMap::new();
        for transaction in &ledger.transactions {
            let entry = by_store.entry(transaction.store_id.as_str()).or_default();
            entry.0 += u64::from(transaction.stickers_earned);
            entry.1 += 1;
        }
        let mut stickers_by_store: Vec<StoreTotals> = by_store
            .into_iter()
            .map(|(store_id, (total_stickers, transaction_count))| StoreTotals {
                store_id: store_id.to_owned(),
                total_stickers,
                transaction_count,
            })
            .collect();
        // Stable sort keeps the BTreeMap's store_id order among ties.
        stickers_by_store.sort_by_key(|s| Reverse(s.total_stickers));

        let mut top_shoppers: Vec<&ShopperRecord> = ledger.shoppers.values().collect();
        top_shoppers.sort_by(|a, b| {
            b.sticker_balance
                .cmp(&a.sticker_balance)
                .then_with(|| a.shopper_id.cmp(&b.shopper_id))
        });
        top_shoppers.truncate(top_shoppers_limit);

        Ok(CampaignTotals {
            total_stickers_awarded: ledger
                .transactions
                .iter()
                .map(|t| u64::from(t.stickers_earned))
                .sum(),
            total_transactions: ledger.transactions.len() as u64,
            total_shoppers: ledger.shoppers.len() as u64,
            stickers_by_store,
            top_shoppers: top_shoppers.into_iter().map(balance_of).collect(),
        })
    }
}

/// A loyalty repository that always returns an infrastructure error. Useful
/// for testing error-handling paths.
#[derive(Debug)]
pub struct FailingLoyaltyRepository;

fn connection_refused() -> DomainError {
    DomainError::Infrastructure("connection refused".into())
}

#[async_trait]
impl LoyaltyRepository for FailingLoyaltyRepository {
    async fn find_transaction(
        &self,
        _transaction_id: &str,
    ) -> Result<Option<TransactionRecord>, DomainError> {
        Err(connection_refused())
    }

    async fn find_shopper(&self, _shopper_id: &str) -> Result<Option<ShopperRecord>, DomainError> {
        Err(connection_refused())
    }

    async fn record_award(&self, _award: &NewTransaction) -> Result<ShopperRecord, DomainError> {
        Err(connection_refused())
    }

    async fn list_shoppers(&self) -> Result<Vec<ShopperBalance>, DomainError> {
        Err(connection_refused())
    }

    async fn shopper_history(
        &self,
        _shopper_id: &str,
    ) -> Result<Option<ShopperHistory>, DomainError> {
        Err(connection_refused())
    }

    async fn campaign_totals(
        &self,
        _top_shoppers_limit: usize,
    ) -> Result<CampaignTotals, DomainError> {
        Err(connection_refused())
    }
}
