//! Configuration Module
//!
//! Handles loading runtime configuration from environment variables.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::cache::{TtlPolicy, TtlTable};

/// Runtime configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP port of the cache administration surface
    pub server_port: u16,
    /// Background expiry sweep interval in seconds
    pub cleanup_interval: u64,
    /// Maximum number of QR/PDF generations in flight at once.
    /// Read by `TicketService::from_config`.
    pub qr_batch_size: usize,
    /// Override for the event list TTL, in seconds
    pub event_list_ttl: Option<u64>,
    /// Override for the event detail TTL, in seconds
    pub event_detail_ttl: Option<u64>,
    /// Override for the lodge list TTL, in seconds
    pub lodge_list_ttl: Option<u64>,
    /// Override for the organization TTL, in seconds
    pub organization_ttl: Option<u64>,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    /// - `CLEANUP_INTERVAL` - Expiry sweep frequency in seconds (default: 30)
    /// - `QR_BATCH_SIZE` - Concurrent asset generations (default: 5)
    /// - `EVENT_LIST_TTL`, `EVENT_DETAIL_TTL`, `LODGE_LIST_TTL`,
    ///   `ORGANIZATION_TTL` - TTL overrides in seconds (default: built-in policy)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            server_port: parse_var("SERVER_PORT").unwrap_or(defaults.server_port),
            cleanup_interval: parse_var("CLEANUP_INTERVAL").unwrap_or(defaults.cleanup_interval),
            qr_batch_size: parse_var::<usize>("QR_BATCH_SIZE")
                .filter(|size| *size > 0)
                .unwrap_or(defaults.qr_batch_size),
            event_list_ttl: parse_var("EVENT_LIST_TTL"),
            event_detail_ttl: parse_var("EVENT_DETAIL_TTL"),
            lodge_list_ttl: parse_var("LODGE_LIST_TTL"),
            organization_ttl: parse_var("ORGANIZATION_TTL"),
        }
    }

    /// Builds the TTL table, applying any configured overrides on top of the
    /// built-in policy durations.
    pub fn ttl_table(&self) -> TtlTable {
        let mut table = TtlTable::default();
        let overrides = [
            (TtlPolicy::EventList, self.event_list_ttl),
            (TtlPolicy::EventDetail, self.event_detail_ttl),
            (TtlPolicy::LodgeList, self.lodge_list_ttl),
            (TtlPolicy::Organization, self.organization_ttl),
        ];
        for (policy, secs) in overrides {
            if let Some(secs) = secs {
                table.set(policy, Some(Duration::from_secs(secs)));
            }
        }
        table
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_port: 3000,
            cleanup_interval: 30,
            qr_batch_size: 5,
            event_list_ttl: None,
            event_detail_ttl: None,
            lodge_list_ttl: None,
            organization_ttl: None,
        }
    }
}

fn parse_var<T: FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.server_port, 3000);
        assert_eq!(config.cleanup_interval, 30);
        assert_eq!(config.qr_batch_size, 5);
        assert!(config.event_list_ttl.is_none());
    }

    #[test]
    fn test_config_from_env_defaults() {
        // Clear any existing env vars to test defaults
        env::remove_var("SERVER_PORT");
        env::remove_var("CLEANUP_INTERVAL");
        env::remove_var("QR_BATCH_SIZE");
        env::remove_var("EVENT_LIST_TTL");

        let config = Config::from_env();
        assert_eq!(config.server_port, 3000);
        assert_eq!(config.cleanup_interval, 30);
        assert_eq!(config.qr_batch_size, 5);
        assert!(config.event_list_ttl.is_none());
    }

    #[test]
    fn test_ttl_table_overrides() {
        let config = Config {
            event_list_ttl: Some(15),
            ..Config::default()
        };
        let table = config.ttl_table();

        assert_eq!(table.resolve(TtlPolicy::EventList), Some(Duration::from_secs(15)));
        assert_eq!(
            table.resolve(TtlPolicy::EventDetail),
            Some(Duration::from_secs(120))
        );
        assert_eq!(table.resolve(TtlPolicy::Countries), None);
    }
}
