//! Shared application state.

use std::sync::Arc;

use stickers_core::clock::Clock;
use stickers_core::repository::LoyaltyRepository;
use stickers_rewards::domain::rules::RewardRules;

/// Application state shared across all request handlers.
#[derive(Clone)]
pub struct AppState {
    /// Clock for server-assigned timestamps.
    pub clock: Arc<dyn Clock + Send + Sync>,
    /// Loyalty repository for shoppers and transactions.
    pub repository: Arc<dyn LoyaltyRepository>,
    /// Sticker calculation rules.
    pub rules: RewardRules,
}

impl AppState {
    /// Create new application state with the standard reward rules.
    #[must_use]
    pub fn new(
        clock: Arc<dyn Clock + Send + Sync>,
        repository: Arc<dyn LoyaltyRepository>,
    ) -> Self {
        Self {
            clock,
            repository,
            rules: RewardRules::STANDARD,
        }
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("rules", &self.rules)
            .finish_non_exhaustive()
    }
}
