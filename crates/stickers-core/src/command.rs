//! Command abstractions for the write side.

use uuid::Uuid;

/// Trait that all write-side commands implement.
pub trait Command: Send + Sync + std::fmt::Debug {
    /// Stable command name used as a log field.
    const NAME: &'static str;

    /// Correlation ID to trace this command through the system.
    fn correlation_id(&self) -> Uuid;

    /// Caller-supplied key under which repeated submissions collapse into one.
    fn idempotency_key(&self) -> &str;
}
