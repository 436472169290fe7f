//! TTL Policy Module
//!
//! Named lifetimes for every family of cached data.

use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use serde::Serialize;

const MINUTE: u64 = 60;

// == TTL Policy ==
/// Named staleness bound for a family of cached data.
///
/// Every cache write goes through one of these (or through the explicit
/// `set_with_ttl` escape hatch) so staleness bounds stay auditable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TtlPolicy {
    /// Data that never changes while the process runs
    Static,
    /// Lodges under a grand lodge
    LodgeList,
    /// Event listings and list-derived aggregates
    EventList,
    /// Organization records
    Organization,
    /// A single event, its tickets and registrations
    EventDetail,
    /// Grand lodge reference list
    GrandLodge,
    /// Country reference list
    Countries,
    /// Attendee relationship reference list
    Relationships,
    /// Masonic/honorific title reference list
    Titles,
}

impl TtlPolicy {
    /// All policies, in declaration order.
    pub const ALL: [TtlPolicy; 9] = [
        TtlPolicy::Static,
        TtlPolicy::LodgeList,
        TtlPolicy::EventList,
        TtlPolicy::Organization,
        TtlPolicy::EventDetail,
        TtlPolicy::GrandLodge,
        TtlPolicy::Countries,
        TtlPolicy::Relationships,
        TtlPolicy::Titles,
    ];

    /// Built-in lifetime. `None` means the entry never expires.
    pub fn default_ttl(self) -> Option<Duration> {
        match self {
            TtlPolicy::LodgeList => Some(Duration::from_secs(5 * MINUTE)),
            TtlPolicy::EventList => Some(Duration::from_secs(MINUTE)),
            TtlPolicy::Organization => Some(Duration::from_secs(10 * MINUTE)),
            TtlPolicy::EventDetail => Some(Duration::from_secs(2 * MINUTE)),
            TtlPolicy::Static
            | TtlPolicy::GrandLodge
            | TtlPolicy::Countries
            | TtlPolicy::Relationships
            | TtlPolicy::Titles => None,
        }
    }

    /// Upper-case name used in logs and the admin API.
    pub fn name(self) -> &'static str {
        match self {
            TtlPolicy::Static => "STATIC",
            TtlPolicy::LodgeList => "LODGE_LIST",
            TtlPolicy::EventList => "EVENT_LIST",
            TtlPolicy::Organization => "ORGANIZATION",
            TtlPolicy::EventDetail => "EVENT_DETAIL",
            TtlPolicy::GrandLodge => "GRAND_LODGE",
            TtlPolicy::Countries => "COUNTRIES",
            TtlPolicy::Relationships => "RELATIONSHIPS",
            TtlPolicy::Titles => "TITLES",
        }
    }
}

impl fmt::Display for TtlPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// == TTL Table ==
/// Resolves policies to concrete lifetimes, with per-policy overrides.
#[derive(Debug, Clone, Default)]
pub struct TtlTable {
    overrides: HashMap<TtlPolicy, Option<Duration>>,
}

impl TtlTable {
    /// Replaces the lifetime of one policy.
    pub fn set(&mut self, policy: TtlPolicy, ttl: Option<Duration>) {
        self.overrides.insert(policy, ttl);
    }

    /// Builder form of [`set`](Self::set).
    pub fn with(mut self, policy: TtlPolicy, ttl: Option<Duration>) -> Self {
        self.set(policy, ttl);
        self
    }

    /// Lifetime for `policy`: the override if present, else the built-in value.
    pub fn resolve(&self, policy: TtlPolicy) -> Option<Duration> {
        match self.overrides.get(&policy) {
            Some(ttl) => *ttl,
            None => policy.default_ttl(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_durations() {
        assert_eq!(TtlPolicy::Static.default_ttl(), None);
        assert_eq!(
            TtlPolicy::LodgeList.default_ttl(),
            Some(Duration::from_secs(300))
        );
        assert_eq!(
            TtlPolicy::EventList.default_ttl(),
            Some(Duration::from_secs(60))
        );
        assert_eq!(
            TtlPolicy::Organization.default_ttl(),
            Some(Duration::from_secs(600))
        );
        assert_eq!(
            TtlPolicy::EventDetail.default_ttl(),
            Some(Duration::from_secs(120))
        );
        for policy in [
            TtlPolicy::GrandLodge,
            TtlPolicy::Countries,
            TtlPolicy::Relationships,
            TtlPolicy::Titles,
        ] {
            assert_eq!(policy.default_ttl(), None, "{policy} should never expire");
        }
    }

    #[test]
    fn test_table_override_and_fallback() {
        let table = TtlTable::default().with(TtlPolicy::Titles, Some(Duration::from_millis(1)));

        assert_eq!(
            table.resolve(TtlPolicy::Titles),
            Some(Duration::from_millis(1))
        );
        assert_eq!(
            table.resolve(TtlPolicy::EventList),
            TtlPolicy::EventList.default_ttl()
        );
    }

    #[test]
    fn test_policy_names_are_distinct() {
        let names: std::collections::HashSet<_> =
            TtlPolicy::ALL.iter().map(|p| p.name()).collect();
        assert_eq!(names.len(), TtlPolicy::ALL.len());
    }
}
