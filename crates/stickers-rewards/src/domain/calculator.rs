//! Sticker calculation.
//!
//! A pure function of the basket: one base sticker per `dollars_per_sticker`
//! spent (floored), plus one bonus sticker per promo unit, capped per
//! transaction. Money stays in exact decimal arithmetic throughout.

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::Serialize;

use super::items::LineItem;
use super::rules::RewardRules;

/// How an award was arrived at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StickerBreakdown {
    /// `floor(total_amount / dollars_per_sticker)`.
    pub base_stickers: u64,
    /// Sum of promo item quantities.
    pub promo_bonus: u64,
    /// `base_stickers + promo_bonus`, before the cap.
    pub raw_total: u64,
    /// Whether the per-transaction cap cut the award down.
    pub capped: bool,
}

/// Result of a sticker calculation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StickerCalculation {
    /// Final award after the cap.
    pub stickers_earned: u32,
    /// Basket total the award was computed from.
    pub total_amount: Decimal,
    /// Intermediate values.
    pub breakdown: StickerBreakdown,
}

/// Sums `quantity × unit_price` over the basket.
#[must_use]
pub fn basket_total(items: &[LineItem]) -> Decimal {
    items.iter().map(LineItem::line_total).sum()
}

/// Counts promo units: every unit of an item whose category matches the
/// promo label, ignoring case, is worth one sticker.
#[must_use]
pub fn promo_bonus(items: &[LineItem], rules: &RewardRules) -> u64 {
    items
        .iter()
        .filter(|item| item.category.to_lowercase() == rules.promo_category)
        .map(|item| u64::from(item.quantity))
        .sum()
}

/// Whole stickers earned by spend alone. Negative totals earn nothing and
/// totals beyond `u64` saturate.
fn base_stickers(total_amount: Decimal, rules: &RewardRules) -> u64 {
    let Some(quotient) = total_amount.checked_div(rules.dollars_per_sticker) else {
        return 0;
    };
    let whole = quotient.floor();
    if whole.is_sign_negative() {
        return 0;
    }
    whole.to_u64().unwrap_or(u64::MAX)
}

/// Computes the sticker award for a basket.
///
/// `total_amount` overrides the basket total when the caller has already
/// computed it; otherwise it is summed from `items`. Item ranges are not
/// re-checked here.
#[must_use]
pub fn calculate_stickers(
    items: &[LineItem],
    total_amount: Option<Decimal>,
    rules: &RewardRules,
) -> StickerCalculation {
    let total_amount = total_amount.unwrap_or_else(|| basket_total(items));

    let base_stickers = base_stickers(total_amount, rules);
    let promo_bonus = promo_bonus(items, rules);
    let raw_total = base_stickers.saturating_add(promo_bonus);

    let cap = u64::from(rules.max_stickers_per_transaction);
    let stickers_earned = u32::try_from(raw_total.min(cap))
        .unwrap_or(rules.max_stickers_per_transaction);

    StickerCalculation {
        stickers_earned,
        total_amount,
        breakdown: StickerBreakdown {
            base_stickers,
            promo_bonus,
            raw_total,
            capped: raw_total > cap,
        },
    }
}
