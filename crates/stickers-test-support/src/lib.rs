//! Shared test doubles for the sticker rewards backend.

mod clock;
mod repository;

pub use clock::FixedClock;
pub use repository::{FailingLoyaltyRepository, InMemoryLoyaltyRepository};
