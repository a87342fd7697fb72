//! Domain error types.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;
use thiserror::Error;

/// Field-level validation messages keyed by field path (`items[0].quantity`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    /// Creates an empty set of field errors.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a set holding a single message for `field`.
    #[must_use]
    pub fn single(field: impl Into<String>, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    /// Records a message against `field`.
    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.entry(field.into()).or_default().push(message.into());
    }

    /// Returns `true` when no field has been flagged.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the messages recorded for `field`, if any.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    /// Returns `Ok(value)` when empty, otherwise a `DomainError::Validation`.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` carrying `self` if any field was flagged.
    pub fn into_result<T>(self, value: T) -> Result<T, DomainError> {
        if self.is_empty() {
            Ok(value)
        } else {
            Err(DomainError::Validation(self))
        }
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (field, messages) in &self.0 {
            for message in messages {
                if !first {
                    f.write_str("; ")?;
                }
                write!(f, "{field}: {message}")?;
                first = false;
            }
        }
        Ok(())
    }
}

/// Top-level domain error type.
#[derive(Debug, Error)]
pub enum DomainError {
    /// Input failed validation; nothing was written.
    #[error("validation error: {0}")]
    Validation(FieldErrors),

    /// No shopper exists with the given external identifier.
    #[error("shopper not found: {0}")]
    ShopperNotFound(String),

    /// A transaction with this identifier has already been recorded.
    ///
    /// Raised by repositories when the uniqueness constraint on
    /// `transaction_id` rejects an insert.
    #[error("transaction already recorded: {0}")]
    DuplicateTransaction(String),

    /// An infrastructure/persistence error.
    #[error("infrastructure error: {0}")]
    Infrastructure(String),
}
