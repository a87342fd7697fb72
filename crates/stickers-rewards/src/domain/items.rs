//! Purchased line items.

use rust_decimal::Decimal;
use stickers_core::error::DomainError;
use stickers_core::repository::StoredItem;

/// A validated line item with an exact decimal unit price.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineItem {
    /// Stock keeping unit.
    pub sku: String,
    /// Display name.
    pub name: String,
    /// Units purchased, at least 1.
    pub quantity: u32,
    /// Price per unit, non-negative.
    pub unit_price: Decimal,
    /// Product category label.
    pub category: String,
}

impl LineItem {
    /// Returns `quantity × unit_price`.
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        Decimal::from(self.quantity) * self.unit_price
    }

    /// Converts the item into its storage form, where the price becomes a
    /// plain float.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` if the price has no float
    /// representation.
    pub fn to_stored(&self) -> Result<StoredItem, DomainError> {
        let unit_price = f64::try_from(self.unit_price).map_err(|e| {
            DomainError::Infrastructure(format!(
                "unit price {} of sku {} cannot be stored: {e}",
                self.unit_price, self.sku
            ))
        })?;
        Ok(StoredItem {
            sku: self.sku.clone(),
            name: self.name.clone(),
            quantity: self.quantity,
            unit_price,
            category: self.category.clone(),
        })
    }
}
