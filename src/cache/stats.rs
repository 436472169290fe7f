//! Cache Statistics Module
//!
//! Hit/miss accounting for `get_or_fetch` and the snapshot reported to callers.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

// == Hit Counters ==
/// Process-lifetime hit/miss counters. Never persisted, never reset.
#[derive(Debug, Default)]
pub struct HitCounters {
    hits: AtomicU64,
    misses: AtomicU64,
}

impl HitCounters {
    pub fn new() -> Self {
        Self::default()
    }

    // == Record Hit ==
    pub fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    // == Record Miss ==
    pub fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }
}

// == Cache Stats ==
/// Point-in-time view of the cache.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CacheStats {
    /// Number of stored entries (expired-but-unswept included)
    pub size: usize,
    /// Stored keys, sorted
    pub keys: Vec<String>,
    /// `get_or_fetch` calls served from cache
    pub hits: u64,
    /// `get_or_fetch` calls that ran the fetcher
    pub misses: u64,
    /// Percentage of `get_or_fetch` calls served from cache
    pub hit_rate: f64,
}

impl CacheStats {
    pub fn new(keys: Vec<String>, hits: u64, misses: u64) -> Self {
        Self {
            size: keys.len(),
            keys,
            hits,
            misses,
            hit_rate: hit_rate(hits, misses),
        }
    }
}

// == Hit Rate ==
/// Returns hits / (hits + misses) * 100, or 0.0 if no calls have been made.
pub fn hit_rate(hits: u64, misses: u64) -> f64 {
    let total = hits + misses;
    if total == 0 {
        0.0
    } else {
        hits as f64 / total as f64 * 100.0
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_start_at_zero() {
        let counters = HitCounters::new();
        assert_eq!(counters.hits(), 0);
        assert_eq!(counters.misses(), 0);
    }

    #[test]
    fn test_hit_rate_no_requests() {
        assert_eq!(hit_rate(0, 0), 0.0);
    }

    #[test]
    fn test_hit_rate_all_hits() {
        assert_eq!(hit_rate(3, 0), 100.0);
    }

    #[test]
    fn test_hit_rate_mixed() {
        let counters = HitCounters::new();
        counters.record_hit();
        counters.record_hit();
        counters.record_hit();
        counters.record_miss();

        assert_eq!(hit_rate(counters.hits(), counters.misses()), 75.0);
    }

    #[test]
    fn test_stats_size_follows_keys() {
        let stats = CacheStats::new(vec!["a".into(), "b".into()], 1, 1);
        assert_eq!(stats.size, 2);
        assert_eq!(stats.hit_rate, 50.0);
    }
}
