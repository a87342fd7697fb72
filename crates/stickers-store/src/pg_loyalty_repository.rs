//! `PostgreSQL` implementation of the `LoyaltyRepository` trait.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::types::Json;
use sqlx::{FromRow, PgConnection, PgPool};
use tracing::debug;

use stickers_core::error::DomainError;
use stickers_core::repository::{
    CampaignTotals, LoyaltyRepository, NewTransaction, ShopperBalance, ShopperHistory,
    ShopperRecord, StoreTotals, StoredItem, TransactionRecord,
};

const TRANSACTION_COLUMNS: &str = "t.transaction_id, s.shopper_id, t.store_id, t.purchased_at, \
     t.items, t.total_amount, t.stickers_earned, t.created_at";

/// PostgreSQL-backed loyalty repository.
#[derive(Debug, Clone)]
pub struct PgLoyaltyRepository {
    pool: PgPool,
}

impl PgLoyaltyRepository {
    /// Creates a new `PgLoyaltyRepository`.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct ShopperRow {
    id: i64,
    shopper_id: String,
    sticker_balance: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ShopperRow> for ShopperRecord {
    type Error = DomainError;

    fn try_from(row: ShopperRow) -> Result<Self, Self::Error> {
        Ok(Self {
            sticker_balance: non_negative(row.sticker_balance, "sticker_balance")?,
            shopper_id: row.shopper_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct TransactionRow {
    transaction_id: String,
    shopper_id: String,
    store_id: String,
    purchased_at: DateTime<Utc>,
    items: Json<Vec<StoredItem>>,
    total_amount: Decimal,
    stickers_earned: i32,
    created_at: DateTime<Utc>,
}

impl TryFrom<TransactionRow> for TransactionRecord {
    type Error = DomainError;

    fn try_from(row: TransactionRow) -> Result<Self, Self::Error> {
        let stickers_earned = u32::try_from(row.stickers_earned).map_err(|_| {
            DomainError::Infrastructure(format!(
                "negative stickers_earned stored for transaction {}",
                row.transaction_id
            ))
        })?;
        Ok(Self {
            transaction_id: row.transaction_id,
            shopper_id: row.shopper_id,
            store_id: row.store_id,
            timestamp: row.purchased_at,
            items: row.items.0,
            total_amount: row.total_amount,
            stickers_earned,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct BalanceRow {
    shopper_id: String,
    sticker_balance: i64,
}

impl TryFrom<BalanceRow> for ShopperBalance {
    type Error = DomainError;

    fn try_from(row: BalanceRow) -> Result<Self, Self::Error> {
        Ok(Self {
            sticker_balance: non_negative(row.sticker_balance, "sticker_balance")?,
            shopper_id: row.shopper_id,
        })
    }
}

#[derive(Debug, FromRow)]
struct StoreRow {
    store_id: String,
    total_stickers: i64,
    transaction_count: i64,
}

impl TryFrom<StoreRow> for StoreTotals {
    type Error = DomainError;

    fn try_from(row: StoreRow) -> Result<Self, Self::Error> {
        Ok(Self {
            total_stickers: non_negative(row.total_stickers, "total_stickers")?,
            transaction_count: non_negative(row.transaction_count, "transaction_count")?,
            store_id: row.store_id,
        })
    }
}

fn non_negative(value: i64, column: &str) -> Result<u64, DomainError> {
    u64::try_from(value)
        .map_err(|_| DomainError::Infrastructure(format!("negative {column} read from database")))
}

fn database_error(error: sqlx::Error) -> DomainError {
    DomainError::Infrastructure(format!("database error: {error}"))
}

fn is_unique_violation(error: &sqlx::Error) -> bool {
    error
        .as_database_error()
        .is_some_and(|db| db.is_unique_violation())
}

/// Creates the shopper row if it does not exist yet, then locks it for the
/// rest of the surrounding transaction.
async fn ensure_shopper(
    conn: &mut PgConnection,
    shopper_id: &str,
    now: DateTime<Utc>,
) -> Result<ShopperRow, DomainError> {
    sqlx::query(
        "INSERT INTO shoppers (shopper_id, sticker_balance, created_at, updated_at) \
         VALUES ($1, 0, $2, $2) \
         ON CONFLICT (shopper_id) DO NOTHING",
    )
    .bind(shopper_id)
    .bind(now)
    .execute(&mut *conn)
    .await
    .map_err(database_error)?;

    sqlx::query_as::<_, ShopperRow>(
        "SELECT id, shopper_id, sticker_balance, created_at, updated_at \
         FROM shoppers WHERE shopper_id = $1 FOR UPDATE",
    )
    .bind(shopper_id)
    .fetch_one(&mut *conn)
    .await
    .map_err(database_error)
}

#[async_trait]
impl LoyaltyRepository for PgLoyaltyRepository {
    async fn find_transaction(
        &self,
        transaction_id: &str,
    ) -> Result<Option<TransactionRecord>, DomainError> {
        let row = sqlx::query_as::<_, TransactionRow>(&format!(
            "SELECT {TRANSACTION_COLUMNS} FROM transactions t \
             JOIN shoppers s ON s.id = t.shopper_pk \
             WHERE t.transaction_id = $1"
        ))
        .bind(transaction_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(database_error)?;

        row.map(TransactionRecord::try_from).transpose()
    }

    async fn find_shopper(&self, shopper_id: &str) -> Result<Option<ShopperRecord>, DomainError> {
        let row = sqlx::query_as::<_, ShopperRow>(
            "SELECT id, shopper_id, sticker_balance, created_at, updated_at \
             FROM shoppers WHERE shopper_id = $1",
        )
        .bind(shopper_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(database_error)?;

        row.map(ShopperRecord::try_from).transpose()
    }

    async fn record_award(&self, award: &NewTransaction) -> Result<ShopperRecord, DomainError> {
        let stickers = i32::try_from(award.stickers_earned).map_err(|_| {
            DomainError::Infrastructure(format!(
                "stickers_earned {} does not fit the transactions table",
                award.stickers_earned
            ))
        })?;

        let mut tx = self.pool.begin().await.map_err(database_error)?;

        let shopper = ensure_shopper(&mut *tx, &award.shopper_id, award.recorded_at).await?;

        let inserted = sqlx::query(
            "INSERT INTO transactions \
             (transaction_id, shopper_pk, store_id, purchased_at, items, total_amount, \
              stickers_earned, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(&award.transaction_id)
        .bind(shopper.id)
        .bind(&award.store_id)
        .bind(award.timestamp)
        .bind(Json(&award.items))
        .bind(award.total_amount)
        .bind(stickers)
        .bind(award.recorded_at)
        .execute(&mut *tx)
        .await;

        // Dropping `tx` on an error path rolls back the shopper insert too.
        if let Err(error) = inserted {
            if is_unique_violation(&error) {
                debug!(
                    transaction_id = %award.transaction_id,
                    "transaction already recorded by a concurrent request"
                );
                return Err(DomainError::DuplicateTransaction(
                    award.transaction_id.clone(),
                ));
            }
            return Err(database_error(error));
        }

        let updated = sqlx::query_as::<_, ShopperRow>(
            "UPDATE shoppers \
             SET sticker_balance = sticker_balance + $1, updated_at = $2 \
             WHERE id = $3 \
             RETURNING id, shopper_id, sticker_balance, created_at, updated_at",
        )
        .bind(i64::from(stickers))
        .bind(award.recorded_at)
        .bind(shopper.id)
        .fetch_one(&mut *tx)
        .await
        .map_err(database_error)?;

        tx.commit().await.map_err(database_error)?;

        ShopperRecord::try_from(updated)
    }

    async fn list_shoppers(&self) -> Result<Vec<ShopperBalance>, DomainError> {
        sqlx::query_as::<_, BalanceRow>(
            "SELECT shopper_id, sticker_balance FROM shoppers \
             ORDER BY created_at DESC, shopper_id ASC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(database_error)?
        .into_iter()
        .map(ShopperBalance::try_from)
        .collect()
    }

    async fn shopper_history(
        &self,
        shopper_id: &str,
    ) -> Result<Option<ShopperHistory>, DomainError> {
        // The balance and the history come from the same snapshot.
        let mut tx = self.pool.begin().await.map_err(database_error)?;
        sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ READ ONLY")
            .execute(&mut *tx)
            .await
            .map_err(database_error)?;

        let shopper = sqlx::query_as::<_, ShopperRow>(
            "SELECT id, shopper_id, sticker_balance, created_at, updated_at \
             FROM shoppers WHERE shopper_id = $1",
        )
        .bind(shopper_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(database_error)?;

        let Some(shopper) = shopper else {
            tx.commit().await.map_err(database_error)?;
            return Ok(None);
        };

        let rows = sqlx::query_as::<_, TransactionRow>(&format!(
            "SELECT {TRANSACTION_COLUMNS} FROM transactions t \
             JOIN shoppers s ON s.id = t.shopper_pk \
             WHERE t.shopper_pk = $1 \
             ORDER BY t.purchased_at DESC, t.transaction_id ASC"
        ))
        .bind(shopper.id)
        .fetch_all(&mut *tx)
        .await
        .map_err(database_error)?;

        tx.commit().await.map_err(database_error)?;

        Ok(Some(ShopperHistory {
            shopper: ShopperRecord::try_from(shopper)?,
            transactions: rows
                .into_iter()
                .map(TransactionRecord::try_from)
                .collect::<Result<_, _>>()?,
        }))
    }

    async fn campaign_totals(
        &self,
        top_shoppers_limit: usize,
    ) -> Result<CampaignTotals, DomainError> {
        let limit = i64::try_from(top_shoppers_limit).unwrap_or(i64::MAX);

        // One snapshot for every aggregate so the totals agree with each other.
        let mut tx = self.pool.begin().await.map_err(database_error)?;
        sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ READ ONLY")
            .execute(&mut *tx)
            .await
            .map_err(database_error)?;

        let (total_stickers, total_transactions): (i64, i64) = sqlx::query_as(
            "SELECT COALESCE(SUM(stickers_earned), 0)::BIGINT, COUNT(*) FROM transactions",
        )
        .fetch_one(&mut *tx)
        .await
        .map_err(database_error)?;

        let (total_shoppers,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM shoppers")
            .fetch_one(&mut *tx)
            .await
            .map_err(database_error)?;

        let stores = sqlx::query_as::<_, StoreRow>(
            "SELECT store_id, \
                    COALESCE(SUM(stickers_earned), 0)::BIGINT AS total_stickers, \
                    COUNT(*) AS transaction_count \
             FROM transactions \
             GROUP BY store_id \
             ORDER BY total_stickers DESC, store_id ASC",
        )
        .fetch_all(&mut *tx)
        .await
        .map_err(database_error)?;

        let top = sqlx::query_as::<_, BalanceRow>(
            "SELECT shopper_id, sticker_balance FROM shoppers \
             ORDER BY sticker_balance DESC, shopper_id ASC \
             LIMIT $1",
        )
        .bind(limit)
        .fetch_all(&mut *tx)
        .await
        .map_err(database_error)?;

        tx.commit().await.map_err(database_error)?;

        Ok(CampaignTotals {
            total_stickers_awarded: non_negative(total_stickers, "total_stickers")?,
            total_transactions: non_negative(total_transactions, "total_transactions")?,
            total_shoppers: non_negative(total_shoppers, "total_shoppers")?,
            stickers_by_store: stores
                .into_iter()
                .map(StoreTotals::try_from)
                .collect::<Result<_, _>>()?,
            top_shoppers: top
                .into_iter()
                .map(ShopperBalance::try_from)
                .collect::<Result<_, _>>()?,
        })
    }
}
