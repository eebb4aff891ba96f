//! Cache Entry Module
//!
//! Defines the persisted record shape `{ data, timestamp, ttl }` and its
//! validity rule.

use std::time::Duration;

use serde::{Deserialize, Serialize};

// == Cache Entry ==
/// A single cached payload with the metadata needed to expire it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry<T> {
    /// The stored payload
    pub data: T,
    /// Write timestamp (Unix milliseconds)
    pub timestamp: i64,
    /// Validity window in milliseconds
    pub ttl: u64,
}

impl<T> CacheEntry<T> {
    // == Constructor ==
    /// Creates a new entry written at `timestamp`.
    ///
    /// # Arguments
    /// * `data` - The payload to store
    /// * `timestamp` - Write time in Unix milliseconds
    /// * `ttl` - How long the entry stays valid
    pub fn new(data: T, timestamp: i64, ttl: Duration) -> Self {
        Self {
            data,
            timestamp,
            ttl: duration_to_ms(ttl),
        }
    }

    // == Is Valid ==
    /// Checks whether the entry may still be served at `now`.
    ///
    /// Boundary condition: the entry is still valid when exactly `ttl`
    /// milliseconds have elapsed, and expires one millisecond later.
    pub fn is_valid_at(&self, now: i64) -> bool {
        is_valid(self.timestamp, self.ttl, now)
    }

    // == Expires At ==
    /// Last instant (Unix milliseconds) at which the entry is still valid.
    pub fn expires_at(&self) -> i64 {
        self.timestamp.saturating_add(ttl_as_i64(self.ttl))
    }

    // == Time To Live ==
    /// Returns the remaining validity in milliseconds, 0 once expired.
    pub fn ttl_remaining_ms(&self, now: i64) -> u64 {
        u64::try_from(self.expires_at().saturating_sub(now)).unwrap_or(0)
    }
}

// == Record Header ==
/// The expiry metadata of a record, read without decoding its payload.
///
/// Used by the sweep, which must judge records of any payload type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct RecordHeader {
    pub timestamp: i64,
    pub ttl: u64,
}

impl RecordHeader {
    /// Same rule as [`CacheEntry::is_valid_at`].
    pub fn is_valid_at(&self, now: i64) -> bool {
        is_valid(self.timestamp, self.ttl, now)
    }
}

// == Utility Functions ==
fn is_valid(timestamp: i64, ttl: u64, now: i64) -> bool {
    now.saturating_sub(timestamp) <= ttl_as_i64(ttl)
}

fn ttl_as_i64(ttl: u64) -> i64 {
    i64::try_from(ttl).unwrap_or(i64::MAX)
}

/// Converts a duration to whole milliseconds, saturating at `u64::MAX`.
pub(crate) fn duration_to_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
