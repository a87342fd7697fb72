//! Deterministic `Clock` implementation for tests.

use chrono::{DateTime, TimeZone, Utc};
use stickers_core::clock::Clock;

/// A clock that always returns a fixed point in time.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Default for FixedClock {
    /// 2026-01-15T10:00:00Z, the instant shared by the API tests.
    fn default() -> Self {
        Self(Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0).single().unwrap_or_default())
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}
