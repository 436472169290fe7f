//! Cache Store Module
//!
//! Key/value storage of serialized snapshots with per-entry TTL and lazy expiry.

use std::collections::HashMap;
use std::time::Duration;

use regex::Regex;
use serde_json::Value;

use crate::cache::entry::current_timestamp_ms;
use crate::cache::CacheEntry;

// == Cache Store ==
/// Plain storage; owned and synchronized by [`CacheManager`](crate::cache::CacheManager).
#[derive(Debug, Default)]
pub struct CacheStore {
    entries: HashMap<String, CacheEntry>,
}

impl CacheStore {
    // == Constructor ==
    pub fn new() -> Self {
        Self::default()
    }

    // == Set ==
    /// Stores a snapshot, replacing any existing entry for `key` and
    /// restarting its lifetime.
    pub fn set(&mut self, key: String, data: Value, ttl: Option<Duration>) {
        self.entries.insert(key, CacheEntry::new(data, ttl));
    }

    // == Get ==
    /// Returns the snapshot for `key` if present and fresh.
    ///
    /// An expired entry found here is removed before returning `None`.
    pub fn get(&mut self, key: &str) -> Option<Value> {
        let expired = self.entries.get(key)?.is_expired();
        if expired {
            self.entries.remove(key);
            return None;
        }
        self.entries.get(key).map(|entry| entry.data.clone())
    }

    // == Remove ==
    /// Removes one entry. Returns whether it existed.
    pub fn remove(&mut self, key: &str) -> bool {
        self.entries.remove(key).is_some()
    }

    // == Clear ==
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    // == Remove Matching ==
    /// Removes every key the pattern matches. Returns the number removed.
    pub fn remove_matching(&mut self, pattern: &Regex) -> usize {
        let before = self.entries.len();
        self.entries.retain(|key, _| !pattern.is_match(key));
        before - self.entries.len()
    }

    // == Cleanup Expired ==
    /// Removes all expired entries from the store.
    ///
    /// Returns the number of entries removed.
    pub fn cleanup_expired(&mut self) -> usize {
        let now = current_timestamp_ms();
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_expired_at(now));
        before - self.entries.len()
    }

    /// Current keys, sorted for stable output. May include expired entries
    /// not yet swept.
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.entries.keys().cloned().collect();
        keys.sort();
        keys
    }

    // == Length ==
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::thread::sleep;

    #[test]
    fn test_store_set_and_get() {
        let mut store = CacheStore::new();

        store.set("key1".to_string(), json!("value1"), None);

        assert_eq!(store.get("key1"), Some(json!("value1")));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_store_get_nonexistent() {
        let mut store = CacheStore::new();
        assert_eq!(store.get("nonexistent"), None);
    }

    #[test]
    fn test_store_remove() {
        let mut store = CacheStore::new();

        store.set("key1".to_string(), json!(1), None);
        assert!(store.remove("key1"));
        assert!(!store.remove("key1"));
        assert!(store.is_empty());
    }

    #[test]
    fn test_store_overwrite() {
        let mut store = CacheStore::new();

        store.set("key1".to_string(), json!("value1"), None);
        store.set("key1".to_string(), json!("value2"), None);

        assert_eq!(store.get("key1"), Some(json!("value2")));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_store_lazy_expiry_evicts_on_read() {
        let mut store = CacheStore::new();

        store.set("key1".to_string(), json!(1), Some(Duration::from_millis(1)));
        sleep(Duration::from_millis(5));

        // Still physically present until someone reads it
        assert_eq!(store.len(), 1);
        assert_eq!(store.get("key1"), None);
        assert_eq!(store.len(), 0);
    }

    #[test]
    fn test_store_cleanup_expired() {
        let mut store = CacheStore::new();

        store.set("short".to_string(), json!(1), Some(Duration::from_millis(1)));
        store.set("long".to_string(), json!(2), Some(Duration::from_secs(10)));
        store.set("forever".to_string(), json!(3), None);

        sleep(Duration::from_millis(5));

        assert_eq!(store.cleanup_expired(), 1);
        assert_eq!(store.keys(), vec!["forever".to_string(), "long".to_string()]);
    }

    #[test]
    fn test_store_remove_matching() {
        let mut store = CacheStore::new();
        store.set("event:1".to_string(), json!(1), None);
        store.set("event:2".to_string(), json!(2), None);
        store.set("lodge:1".to_string(), json!(3), None);

        let removed = store.remove_matching(&Regex::new("^event:").unwrap());

        assert_eq!(removed, 2);
        assert_eq!(store.keys(), vec!["lodge:1".to_string()]);
    }
}
