//! Clock abstraction for server-assigned timestamps.

use chrono::{DateTime, SubsecRound, Utc};

/// Source of server-assigned instants (`created_at`, `updated_at`).
pub trait Clock: Send + Sync {
    /// Returns the current time.
    fn now(&self) -> DateTime<Utc>;
}

/// Production clock backed by the system clock.
///
/// Instants are truncated to microseconds, the resolution of a PostgreSQL
/// `TIMESTAMPTZ`, so a value reads back exactly as it was written.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now().trunc_subsecs(6)
    }
}
