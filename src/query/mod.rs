//! Query Module
//!
//! Immutable query specifications and the helpers that shape them before
//! they reach the repository.

pub mod builder;
pub mod optimizer;
pub mod spec;

pub use builder::{
    build_event_listing_query, build_registration_search_query, EventListingParams,
    RegistrationSearchParams,
};
pub use optimizer::{EventListOptions, QueryAnalysis, QueryStats, RegistrationQueryOptions};
pub use spec::{CountMode, Filter, Ordering, QuerySpec};
