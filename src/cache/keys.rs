//! Cache key definitions.
//!
//! Every key is `namespace:part:part...`. Parts are escaped so that distinct
//! argument tuples can never render to the same string, and each namespace
//! has an anchored pattern used for bulk invalidation.

use std::fmt;

use regex::Regex;

const EVENT: &str = "event";
const EVENT_SLUG: &str = "event-slug";
const EVENT_LIST: &str = "events:list";
const LODGES: &str = "lodges";
const GRAND_LODGES: &str = "grand-lodges";
const COUNTRIES: &str = "countries";
const TITLES: &str = "titles";
const RELATIONSHIPS: &str = "relationships";
const ORGANIZATION: &str = "organization";
const REGISTRATION: &str = "registration";
const REGISTRATION_SUMMARY: &str = "registration-summary";
const REGISTRATION_COMPLETE: &str = "registration-complete";
const REGISTRATION_SEARCH: &str = "registrations:search";
const EVENT_TICKETS: &str = "tickets:event";
const HOMEPAGE: &str = "homepage";

/// Placeholder for an absent optional part.
const NONE_PART: &str = "~";

/// A namespaced cache key.
///
/// Only constructible through the namespace constructors below, so key
/// derivation stays a pure function of its inputs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(String);

impl CacheKey {
    fn compose(namespace: &str, parts: &[String]) -> Self {
        let mut key = String::from(namespace);
        for part in parts {
            key.push(':');
            key.push_str(part);
        }
        CacheKey(key)
    }

    // Singletons
    pub fn homepage() -> Self {
        Self::compose(HOMEPAGE, &[])
    }

    pub fn grand_lodges() -> Self {
        Self::compose(GRAND_LODGES, &[])
    }

    pub fn countries() -> Self {
        Self::compose(COUNTRIES, &[])
    }

    pub fn titles() -> Self {
        Self::compose(TITLES, &[])
    }

    pub fn relationships() -> Self {
        Self::compose(RELATIONSHIPS, &[])
    }

    // Entities
    pub fn event(event_id: &str) -> Self {
        Self::compose(EVENT, &[escape(event_id)])
    }

    pub fn event_slug(slug: &str) -> Self {
        Self::compose(EVENT_SLUG, &[escape(slug)])
    }

    pub fn lodges(grand_lodge_id: &str) -> Self {
        Self::compose(LODGES, &[escape(grand_lodge_id)])
    }

    pub fn organization(organization_id: &str) -> Self {
        Self::compose(ORGANIZATION, &[escape(organization_id)])
    }

    pub fn registration(registration_id: &str) -> Self {
        Self::compose(REGISTRATION, &[escape(registration_id)])
    }

    pub fn registration_summary(registration_id: &str) -> Self {
        Self::compose(REGISTRATION_SUMMARY, &[escape(registration_id)])
    }

    pub fn registration_complete(registration_id: &str) -> Self {
        Self::compose(REGISTRATION_COMPLETE, &[escape(registration_id)])
    }

    pub fn event_tickets(event_id: &str) -> Self {
        Self::compose(EVENT_TICKETS, &[escape(event_id)])
    }

    // Derived collections
    /// Event listing variant, one key per distinct filter/paging combination.
    pub fn event_list(featured: Option<bool>, limit: Option<u64>, offset: Option<u64>) -> Self {
        Self::compose(
            EVENT_LIST,
            &[
                optional(featured.map(|f| if f { "featured" } else { "regular" })),
                optional(limit),
                optional(offset),
            ],
        )
    }

    /// Registration search variant. `parts` are the normalized search inputs
    /// in a fixed order; `None` marks an absent filter.
    pub fn registration_search(parts: &[Option<String>]) -> Self {
        let parts: Vec<String> = parts
            .iter()
            .map(|p| match p {
                Some(value) => escape(value),
                None => NONE_PART.to_string(),
            })
            .collect();
        Self::compose(REGISTRATION_SEARCH, &parts)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CacheKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<CacheKey> for String {
    fn from(key: CacheKey) -> Self {
        key.0
    }
}

// ============================================================================
// Invalidation patterns
// ============================================================================

/// Anchored patterns matching every key of one namespace.
pub mod patterns {
    use super::*;

    fn namespace(ns: &str) -> Regex {
        Regex::new(&format!("^{}:", regex::escape(ns))).expect("escaped literal is a valid pattern")
    }

    /// Every `event:{id}` key.
    pub fn events() -> Regex {
        namespace(EVENT)
    }

    /// Every `event-slug:{slug}` key.
    pub fn event_slugs() -> Regex {
        namespace(EVENT_SLUG)
    }

    /// Every event listing variant.
    pub fn event_lists() -> Regex {
        namespace(EVENT_LIST)
    }

    /// Every per-event ticket list.
    pub fn event_tickets() -> Regex {
        namespace(EVENT_TICKETS)
    }

    /// Every registration search variant.
    pub fn registration_searches() -> Regex {
        namespace(REGISTRATION_SEARCH)
    }

    /// Every registration summary.
    pub fn registration_summaries() -> Regex {
        namespace(REGISTRATION_SUMMARY)
    }

    /// Every composite registration view.
    pub fn registration_completes() -> Regex {
        namespace(REGISTRATION_COMPLETE)
    }

    /// Every lodge list.
    pub fn lodges() -> Regex {
        namespace(LODGES)
    }
}

fn escape(part: &str) -> String {
    let mut out = String::with_capacity(part.len());
    for ch in part.chars() {
        if matches!(ch, '\\' | ':' | '~') {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}

fn optional<T: ToString>(value: Option<T>) -> String {
    match value {
        Some(v) => escape(&v.to_string()),
        None => NONE_PART.to_string(),
    }
}
