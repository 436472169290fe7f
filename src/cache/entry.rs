//! Cache Entry Module
//!
//! Defines the structure for individual cache entries with TTL support.

use std::time::Duration;

use serde_json::Value;

// == Cache Entry ==
/// A single cached snapshot with its write time and lifetime.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// The stored snapshot
    pub data: Value,
    /// Write timestamp (Unix milliseconds)
    pub created_at: u64,
    /// Lifetime, None = never expires
    pub ttl: Option<Duration>,
}

impl CacheEntry {
    // == Constructor ==
    /// Creates a new cache entry stamped with the current time.
    pub fn new(data: Value, ttl: Option<Duration>) -> Self {
        Self {
            data,
            created_at: current_timestamp_ms(),
            ttl,
        }
    }

    // == Is Expired ==
    /// Checks if the entry has expired.
    ///
    /// An entry is stale once strictly more than its TTL has elapsed since it
    /// was written. Entries without a TTL never expire.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(current_timestamp_ms())
    }

    /// Same as [`is_expired`](Self::is_expired) against an explicit clock reading.
    pub fn is_expired_at(&self, now_ms: u64) -> bool {
        match self.ttl {
            Some(ttl) => now_ms.saturating_sub(self.created_at) as u128 > ttl.as_millis(),
            None => false,
        }
    }

    // == Time To Live ==
    /// Returns remaining TTL in milliseconds, or None if no expiration is set.
    ///
    /// # Returns
    /// - `Some(0)` if the entry has expired
    /// - `Some(remaining_ms)` if the entry has TTL and hasn't expired
    /// - `None` if the entry has no TTL (never expires)
    pub fn ttl_remaining_ms(&self) -> Option<u64> {
        self.ttl.map(|ttl| {
            let age = current_timestamp_ms().saturating_sub(self.created_at);
            (ttl.as_millis() as u64).saturating_sub(age)
        })
    }
}

// == Utility Functions ==
/// Returns current Unix timestamp in milliseconds.
pub fn current_timestamp_ms() -> u64 {
    chrono::Utc::now().timestamp_millis().max(0) as u64
}
