//! Property-Based Tests for Cache Module
//!
//! Uses proptest to check the cache's behavioural guarantees over generated inputs.

use proptest::prelude::*;
use regex::Regex;
use std::collections::HashSet;
use std::thread::sleep;
use std::time::Duration;

use crate::cache::{CacheKey, CacheManager, TtlPolicy, TtlTable};

// == Strategies ==
/// Generates key suffixes, including the characters keys escape
fn key_part_strategy() -> impl Strategy<Value = String> {
    "[a-z0-9:~\\\\-]{1,16}"
}

fn valid_value_strategy() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9 ]{1,64}"
}

#[derive(Debug, Clone)]
enum FetchOp {
    /// `get_or_fetch` on key `key{0}`
    Fetch(u8),
    /// `clear` on key `key{0}`
    Clear(u8),
}

fn fetch_op_strategy() -> impl Strategy<Value = FetchOp> {
    prop_oneof![
        (0u8..5).prop_map(FetchOp::Fetch),
        (0u8..5).prop_map(FetchOp::Clear),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    // For any sequence of get_or_fetch/clear calls, hits and misses match a
    // model of which keys are present, and hit_rate follows from them.
    #[test]
    fn prop_hit_rate_accuracy(ops in prop::collection::vec(fetch_op_strategy(), 0..50)) {
        let cache = CacheManager::new();
        let mut present: HashSet<u8> = HashSet::new();
        let (mut hits, mut misses) = (0u64, 0u64);

        for op in ops {
            match op {
                FetchOp::Fetch(k) => {
                    let result: Result<u8, ()> = tokio_test::block_on(cache.get_or_fetch(
                        format!("key{k}"),
                        || async move { Ok(k) },
                        TtlPolicy::Static,
                    ));
                    prop_assert_eq!(result, Ok(k));
                    if present.insert(k) { misses += 1 } else { hits += 1 }
                }
                FetchOp::Clear(k) => {
                    cache.clear(format!("key{k}"));
                    present.remove(&k);
                }
            }
        }

        let stats = cache.stats();
        prop_assert_eq!(stats.hits, hits);
        prop_assert_eq!(stats.misses, misses);
        let expected = if hits + misses == 0 { 0.0 } else { hits as f64 / (hits + misses) as f64 * 100.0 };
        prop_assert!((stats.hit_rate - expected).abs() < 1e-9);
    }

    // Storing V1 then V2 under one key returns V2 and keeps one entry.
    #[test]
    fn prop_overwrite_semantics(
        key in key_part_strategy(),
        value1 in valid_value_strategy(),
        value2 in valid_value_strategy()
    ) {
        let cache = CacheManager::new();
        cache.set(&key, &value1, TtlPolicy::EventList);
        cache.set(&key, &value2, TtlPolicy::EventList);

        prop_assert_eq!(cache.get::<String>(&key), Some(value2));
        prop_assert_eq!(cache.len(), 1);
    }

    // Pattern invalidation removes exactly the matching keys.
    #[test]
    fn prop_pattern_invalidation(
        event_ids in prop::collection::hash_set(key_part_strategy(), 0..10),
        lodge_ids in prop::collection::hash_set(key_part_strategy(), 0..10)
    ) {
        let cache = CacheManager::new();
        for id in &event_ids {
            cache.set(CacheKey::event(id), id, TtlPolicy::EventDetail);
        }
        for id in &lodge_ids {
            cache.set(CacheKey::lodges(id), id, TtlPolicy::LodgeList);
        }

        let removed = cache.invalidate_pattern(&Regex::new("^event:").unwrap());

        prop_assert_eq!(removed, event_ids.len());
        for id in &lodge_ids {
            prop_assert_eq!(cache.get::<String>(CacheKey::lodges(id)), Some(id.clone()));
        }
        prop_assert_eq!(cache.len(), lodge_ids.len());
    }

    // Key derivation is deterministic, and injective within a namespace.
    #[test]
    fn prop_key_derivation(
        a in prop::collection::vec(prop::option::of(key_part_strategy()), 0..4),
        b in prop::collection::vec(prop::option::of(key_part_strategy()), 0..4)
    ) {
        prop_assert_eq!(CacheKey::registration_search(&a), CacheKey::registration_search(&a));
        if a != b {
            prop_assert_ne!(CacheKey::registration_search(&a), CacheKey::registration_search(&b));
        }
    }

    #[test]
    fn prop_event_list_keys_injective(
        a in (prop::option::of(any::<bool>()), prop::option::of(0u64..100), prop::option::of(0u64..100)),
        b in (prop::option::of(any::<bool>()), prop::option::of(0u64..100), prop::option::of(0u64..100))
    ) {
        let ka = CacheKey::event_list(a.0, a.1, a.2);
        let kb = CacheKey::event_list(b.0, b.1, b.2);
        prop_assert_eq!(a == b, ka == kb);
    }
}

// Separate proptest block with fewer cases for time-sensitive TTL tests
proptest! {
    #![proptest_config(ProptestConfig::with_cases(5))]

    // Finite-TTL entries are absent once the TTL has elapsed; infinite ones stay.
    #[test]
    fn prop_ttl_expiration_behavior(
        key in key_part_strategy(),
        value in valid_value_strategy()
    ) {
        let policies = TtlTable::default().with(TtlPolicy::EventList, Some(Duration::from_millis(1)));
        let cache = CacheManager::with_policies(policies);
        let forever = format!("{key}-static");

        cache.set(&key, &value, TtlPolicy::EventList);
        cache.set(&forever, &value, TtlPolicy::Static);

        sleep(Duration::from_millis(5));

        prop_assert_eq!(cache.get::<String>(&key), None);
        prop_assert_eq!(cache.get::<String>(&forever), Some(value));
    }
}
