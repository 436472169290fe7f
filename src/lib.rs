//! Lodge Cache - caching and query shaping for the LodgeTix data layer
//!
//! Provides a TTL cache with named staleness policies, pure query builders,
//! bulk repository operations and cached service façades over a pluggable
//! [`Repository`](repository::Repository).

pub mod api;
pub mod batch;
pub mod cache;
pub mod config;
pub mod error;
pub mod models;
pub mod query;
pub mod repository;
pub mod services;
pub mod tasks;

pub use api::AppState;
pub use cache::CacheManager;
pub use config::Config;
pub use error::{DataError, Result};
pub use tasks::spawn_cleanup_task;
