//! Cache Manager Module
//!
//! Policy-driven façade over [`CacheStore`]: typed get/set, the get-or-fetch
//! memoizer, batch get/set, invalidation and statistics.

use std::future::Future;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use regex::Regex;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use crate::cache::stats::HitCounters;
use crate::cache::{CacheStats, CacheStore, TtlPolicy, TtlTable};

// == Cache Manager ==
/// Process-wide cache of immutable snapshots.
///
/// Construct one at startup and share it as `Arc<CacheManager>`. No method
/// returns an error: serialization problems are logged and treated as a
/// skipped write or a miss.
///
/// Concurrent writers to the same key are last-write-wins. `get_or_fetch`
/// does not coalesce concurrent misses, and a fetch that completes after an
/// invalidation of its key stores its (possibly stale) result.
#[derive(Debug, Default)]
pub struct CacheManager {
    /// Reads evict expired entries, so every access needs exclusive access
    store: Mutex<CacheStore>,
    counters: HitCounters,
    policies: TtlTable,
}

impl CacheManager {
    // == Constructor ==
    /// Creates an empty cache with the built-in TTL policies.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty cache resolving policies through `policies`.
    pub fn with_policies(policies: TtlTable) -> Self {
        Self {
            policies,
            ..Self::default()
        }
    }

    fn store(&self) -> MutexGuard<'_, CacheStore> {
        self.store.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Lifetime a write under `policy` receives.
    pub fn ttl_for(&self, policy: TtlPolicy) -> Option<Duration> {
        self.policies.resolve(policy)
    }

    // == Get ==
    /// Returns the cached value for `key` if present, fresh and of type `T`.
    pub fn get<T: DeserializeOwned>(&self, key: impl AsRef<str>) -> Option<T> {
        let key = key.as_ref();
        let value = self.store().get(key)?;
        match serde_json::from_value(value) {
            Ok(data) => Some(data),
            Err(err) => {
                warn!(key, error = %err, "cached value has unexpected shape, treating as miss");
                None
            }
        }
    }

    // == Set ==
    /// Stores `data` under `key` with the lifetime of `policy`.
    pub fn set<T: Serialize + ?Sized>(&self, key: impl AsRef<str>, data: &T, policy: TtlPolicy) {
        self.write(key.as_ref(), data, self.policies.resolve(policy));
    }

    /// Stores `data` under `key` with an explicit lifetime, bypassing the
    /// named policies.
    pub fn set_with_ttl<T: Serialize + ?Sized>(
        &self,
        key: impl AsRef<str>,
        data: &T,
        ttl: Duration,
    ) {
        self.write(key.as_ref(), data, Some(ttl));
    }

    fn write<T: Serialize + ?Sized>(&self, key: &str, data: &T, ttl: Option<Duration>) {
        match serde_json::to_value(data) {
            Ok(value) => self.store().set(key.to_string(), value, ttl),
            Err(err) => warn!(key, error = %err, "value not serializable, skipping cache write"),
        }
    }

    // == Get Or Fetch ==
    /// Returns the cached value for `key`, or runs `fetcher`, caches its
    /// successful result under `policy` and returns it.
    ///
    /// Errors from `fetcher` are returned unchanged and nothing is cached.
    /// The store lock is never held while `fetcher` runs, so two concurrent
    /// misses on one key both run their fetcher and the later write wins.
    pub async fn get_or_fetch<T, E, F, Fut>(
        &self,
        key: impl AsRef<str>,
        fetcher: F,
        policy: TtlPolicy,
    ) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let key = key.as_ref();
        if let Some(cached) = self.get::<T>(key) {
            self.counters.record_hit();
            debug!(key, "cache hit");
            return Ok(cached);
        }

        self.counters.record_miss();
        debug!(key, policy = %policy, "cache miss, fetching");
        let data = fetcher().await?;
        self.set(key, &data, policy);
        Ok(data)
    }

    // == Batch Get / Set ==
    /// Looks up several keys at once, preserving input order.
    pub fn get_many<T, K>(&self, keys: impl IntoIterator<Item = K>) -> Vec<Option<T>>
    where
        T: DeserializeOwned,
        K: AsRef<str>,
    {
        keys.into_iter().map(|key| self.get(key)).collect()
    }

    /// Stores several values under one policy.
    pub fn set_many<T, K>(&self, entries: impl IntoIterator<Item = (K, T)>, policy: TtlPolicy)
    where
        T: Serialize,
        K: AsRef<str>,
    {
        let ttl = self.policies.resolve(policy);
        for (key, data) in entries {
            self.write(key.as_ref(), &data, ttl);
        }
    }

    // == Invalidation ==
    /// Removes one entry. Returns whether it existed.
    pub fn clear(&self, key: impl AsRef<str>) -> bool {
        self.store().remove(key.as_ref())
    }

    /// Removes every entry.
    pub fn clear_all(&self) {
        self.store().clear();
    }

    /// Removes every entry whose TTL has elapsed. Returns the number removed.
    pub fn clear_expired(&self) -> usize {
        self.store().cleanup_expired()
    }

    /// Removes every key matching `pattern`. Returns the number removed.
    pub fn invalidate_pattern(&self, pattern: &Regex) -> usize {
        let removed = self.store().remove_matching(pattern);
        debug!(pattern = pattern.as_str(), removed, "invalidated cache pattern");
        removed
    }

    /// Compiles `pattern` and invalidates matching keys. An invalid pattern
    /// removes nothing.
    pub fn invalidate_matching(&self, pattern: &str) -> usize {
        match Regex::new(pattern) {
            Ok(regex) => self.invalidate_pattern(&regex),
            Err(err) => {
                warn!(pattern, error = %err, "invalid invalidation pattern");
                0
            }
        }
    }

    // == Stats ==
    pub fn stats(&self) -> CacheStats {
        let keys = self.store().keys();
        CacheStats::new(keys, self.counters.hits(), self.counters.misses())
    }

    pub fn len(&self) -> usize {
        self.store().len()
    }

    pub fn is_empty(&self) -> bool {
        self.store().is_empty()
    }
}
