//! Cache Module
//!
//! In-process snapshot cache with named TTL policies, namespaced keys and
//! pattern invalidation.

mod entry;
pub mod keys;
mod manager;
mod policy;
mod stats;
mod store;

#[cfg(test)]
mod property_tests;

// Re-export public types
pub use entry::CacheEntry;
pub use keys::CacheKey;
pub use manager::CacheManager;
pub use policy::{TtlPolicy, TtlTable};
pub use stats::{hit_rate, CacheStats};
pub use store::CacheStore;
