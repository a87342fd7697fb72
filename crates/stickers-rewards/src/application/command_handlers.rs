//! Command handlers for the Rewards context.
//!
//! The ingestion workflow: short-circuit on a known transaction id,
//! otherwise compute the award and hand it to the repository's atomic
//! `record_award`. A unique-constraint loss against a concurrent submission
//! of the same id is resolved here by replaying the winner's result.

use stickers_core::clock::Clock;
use stickers_core::command::Command;
use stickers_core::error::DomainError;
use stickers_core::repository::{LoyaltyRepository, NewTransaction, StoredItem};
use tracing::{info, warn};

use crate::domain::calculator::{StickerBreakdown, calculate_stickers};
use crate::domain::commands::RecordTransaction;
use crate::domain::items::LineItem;
use crate::domain::rules::RewardRules;

/// Award figures reported back to the submitter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AwardReceipt {
    /// The transaction the award belongs to.
    pub transaction_id: String,
    /// The credited shopper.
    pub shopper_id: String,
    /// Stickers awarded by the transaction.
    pub stickers_earned: u32,
    /// The shopper's balance as of this response.
    pub new_balance: u64,
}

/// Outcome of handling a `RecordTransaction` command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestionOutcome {
    /// The transaction was new and its award has been committed.
    Awarded {
        /// Award figures; `new_balance` is the post-increment balance.
        receipt: AwardReceipt,
        /// How the award was computed.
        breakdown: StickerBreakdown,
    },
    /// The transaction id was already recorded; nothing was written.
    ///
    /// The original breakdown is not persisted, so none is reported.
    Duplicate {
        /// The stored award and the shopper's current balance.
        receipt: AwardReceipt,
    },
}

impl IngestionOutcome {
    /// Returns the award figures regardless of outcome.
    #[must_use]
    pub fn receipt(&self) -> &AwardReceipt {
        match self {
            Self::Awarded { receipt, .. } | Self::Duplicate { receipt } => receipt,
        }
    }

    /// Returns `true` if the submission was a repeat of a recorded transaction.
    #[must_use]
    pub fn is_duplicate(&self) -> bool {
        matches!(self, Self::Duplicate { .. })
    }
}

/// Handles the `RecordTransaction` command: returns the recorded award for a
/// known transaction id, otherwise computes and atomically records a new one.
///
/// # Errors
///
/// Returns `DomainError::Infrastructure` if the repository fails. A
/// `DuplicateTransaction` raised by the repository is never returned; it is
/// answered as a duplicate instead.
pub async fn handle_record_transaction(
    command: &RecordTransaction,
    rules: &RewardRules,
    clock: &dyn Clock,
    repo: &dyn LoyaltyRepository,
) -> Result<IngestionOutcome, DomainError> {
    let transaction_id = command.idempotency_key();

    if let Some(outcome) = replay_recorded(transaction_id, repo).await? {
        info!(
            command = RecordTransaction::NAME,
            correlation_id = %command.correlation_id(),
            transaction_id,
            "transaction already recorded, returning stored award"
        );
        return Ok(outcome);
    }

    let calculation = calculate_stickers(&command.items, None, rules);
    let mut total_amount = calculation.total_amount;
    total_amount.rescale(2);

    let award = NewTransaction {
        transaction_id: command.transaction_id.clone(),
        shopper_id: command.shopper_id.clone(),
        store_id: command.store_id.clone(),
        timestamp: command.timestamp,
        items: command
            .items
            .iter()
            .map(LineItem::to_stored)
            .collect::<Result<Vec<StoredItem>, DomainError>>()?,
        total_amount,
        stickers_earned: calculation.stickers_earned,
        recorded_at: clock.now(),
    };

    match repo.record_award(&award).await {
        Ok(shopper) => {
            info!(
                command = RecordTransaction::NAME,
                correlation_id = %command.correlation_id(),
                transaction_id,
                shopper_id = %shopper.shopper_id,
                stickers_earned = calculation.stickers_earned,
                new_balance = shopper.sticker_balance,
                capped = calculation.breakdown.capped,
                "stickers awarded"
            );
            Ok(IngestionOutcome::Awarded {
                receipt: AwardReceipt {
                    transaction_id: award.transaction_id,
                    shopper_id: shopper.shopper_id,
                    stickers_earned: calculation.stickers_earned,
                    new_balance: shopper.sticker_balance,
                },
                breakdown: calculation.breakdown,
            })
        }
        Err(DomainError::DuplicateTransaction(_)) => {
            warn!(
                command = RecordTransaction::NAME,
                correlation_id = %command.correlation_id(),
                transaction_id,
                "lost insert race to a concurrent submission, returning its award"
            );
            replay_recorded(transaction_id, repo).await?.ok_or_else(|| {
                DomainError::Infrastructure(format!(
                    "transaction {transaction_id} reported as duplicate but not found"
                ))
            })
        }
        Err(e) => Err(e),
    }
}

/// Builds a duplicate outcome from the stored transaction, if there is one.
async fn replay_recorded(
    transaction_id: &str,
    repo: &dyn LoyaltyRepository,
) -> Result<Option<IngestionOutcome>, DomainError> {
    let Some(recorded) = repo.find_transaction(transaction_id).await? else {
        return Ok(None);
    };
    let shopper = repo
        .find_shopper(&recorded.shopper_id)
        .await?
        .ok_or_else(|| {
            DomainError::Infrastructure(format!(
                "transaction {transaction_id} references missing shopper {}",
                recorded.shopper_id
            ))
        })?;

    Ok(Some(IngestionOutcome::Duplicate {
        receipt: AwardReceipt {
            transaction_id: recorded.transaction_id,
            shopper_id: shopper.shopper_id,
            stickers_earned: recorded.stickers_earned,
            new_balance: shopper.sticker_balance,
        },
    }))
}
