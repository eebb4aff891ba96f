//! Cache Module
//!
//! Provides a persistent response cache with per-entry TTL and lazy eviction.

mod clock;
mod entry;
mod stats;
mod store;

#[cfg(test)]
mod property_tests;

use std::time::Duration;

// Re-export public types
pub use clock::{Clock, ManualClock, SystemClock};
pub use entry::{CacheEntry, RecordHeader};
pub use stats::CacheStats;
pub use store::ResponseCache;

// == Public Constants ==
/// TTL applied when a caller does not supply one
pub const DEFAULT_TTL: Duration = Duration::from_secs(60 * 60);
