//! Campaign rule parameters.

use rust_decimal::Decimal;

/// Fixed parameters of the sticker campaign, injected into the calculator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RewardRules {
    /// Basket spend that earns one base sticker. Must be positive.
    pub dollars_per_sticker: Decimal,
    /// Category label (compared case-insensitively) whose units earn a
    /// bonus sticker each.
    pub promo_category: &'static str,
    /// Upper bound on stickers awarded by a single transaction.
    pub max_stickers_per_transaction: u32,
}

impl RewardRules {
    /// The campaign as it runs: one sticker per $10, +1 per promo unit, cap 5.
    pub const STANDARD: Self = Self {
        dollars_per_sticker: Decimal::TEN,
        promo_category: "promo",
        max_stickers_per_transaction: 5,
    };
}

impl Default for RewardRules {
    fn default() -> Self {
        Self::STANDARD
    }
}
