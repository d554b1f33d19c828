//! # Scanner Configuration
//!
//! Tunables for the scan loop. The defaults give the plain scanner: five
//! well-known bootstrap peers, 20 seeds per round, the `/ws` marker,
//! back-to-back rounds and first-strike invalidation.

use std::path::PathBuf;
use std::time::Duration;

use crate::domain::ConfigError;

/// Well-known peers dialled once at startup.
pub const DEFAULT_BOOTSTRAP_ADDRS: [&str; 5] = [
    "/ip4/104.131.131.82/tcp/4001/ipfs/QmaCpDMGvV2BGHeYERUEnRQAwe3N8SzbUtfsmvsqQLuvuJ",
    "/dns4/node0.preload.ipfs.io/tcp/443/wss/ipfs/QmZMxNdpMkewiVZLMRxaNxUeZpDUb34pWjZ1kZvsd16Zic",
    "/dns4/node1.preload.ipfs.io/tcp/443/wss/ipfs/Qmbut9Ywz9YEDrz8ySBSgWyJk41Uvm2QJPhwDJzJyGFsD6",
    "/dns4/ipfs-service-provider.fullstackcash.nl/tcp/443/wss/ipfs/QmbyYXKbnAmMbMGo8LRBZ58jYs58anqUzY1m4jxDmhDsjd",
    "/dns4/go-ipfs-wss.fullstackcash.nl/tcp/443/wss/ipfs/QmTtXA18C6sg3ji9zem4wpNyoz9m4UZT85mA2D2jx2gzEk",
];

/// Seeds drawn per round.
pub const DEFAULT_SAMPLE_SIZE: usize = 20;

/// Substring that marks a websocket-capable multiaddress.
pub const DEFAULT_TRANSPORT_MARKER: &str = "/ws";

/// Scanner configuration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScannerConfig {
    /// Multiaddresses dialled once before the first round.
    pub bootstrap_addrs: Vec<String>,

    /// Upper bound on seeds per round.
    pub sample_size: usize,

    /// Substring identifying the target transport.
    pub transport_marker: String,

    /// Directory holding the JSON snapshots.
    pub data_dir: PathBuf,

    /// Minimum time between round starts. 0 runs rounds back-to-back.
    pub min_round_interval_secs: u64,

    /// Deadline for a single neighbor query, address resolution or dial.
    /// The overlay's own query timeout is set to this value.
    pub query_timeout_secs: u64,

    /// Slack added on top of `query_timeout_secs` for the scanner's outer
    /// deadline, so results the overlay flushes at its own timeout still
    /// arrive.
    pub query_grace_secs: u64,

    /// Consecutive "no capability" probes before a peer is marked invalid.
    pub invalid_after_strikes: u32,

    /// Known-invalid peers re-probed per round. 0 disables re-validation.
    pub revalidate_per_round: usize,

    /// Cap on each known set, oldest evicted first. 0 means unbounded.
    pub max_known_peers: usize,

    /// Supervisor delay before restarting after a fatal round error.
    pub restart_backoff_secs: u64,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            bootstrap_addrs: DEFAULT_BOOTSTRAP_ADDRS.iter().map(|s| s.to_string()).collect(),
            sample_size: DEFAULT_SAMPLE_SIZE,
            transport_marker: DEFAULT_TRANSPORT_MARKER.to_string(),
            data_dir: PathBuf::from("."),
            min_round_interval_secs: 0,
            query_timeout_secs: 60,
            query_grace_secs: 10,
            invalid_after_strikes: 1,
            revalidate_per_round: 0,
            max_known_peers: 0,
            restart_backoff_secs: 5,
        }
    }
}

impl ScannerConfig {
    /// Create a config for testing (no bootstrap peers, short timeouts).
    pub fn for_testing() -> Self {
        Self {
            bootstrap_addrs: Vec::new(),
            query_timeout_secs: 1,
            query_grace_secs: 1,
            restart_backoff_secs: 0,
            ..Self::default()
        }
    }

    /// Reject values the scan loop cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.transport_marker.is_empty() {
            return Err(ConfigError::Invalid("transport_marker must not be empty".into()));
        }
        if self.query_timeout_secs == 0 {
            return Err(ConfigError::Invalid("query_timeout_secs must be positive".into()));
        }
        if self.invalid_after_strikes == 0 {
            return Err(ConfigError::Invalid("invalid_after_strikes must be at least 1".into()));
        }
        Ok(())
    }

    /// Deadline the overlay applies to its own queries.
    pub fn query_timeout(&self) -> Duration {
        Duration::from_secs(self.query_timeout_secs)
    }

    /// Outer deadline for one overlay call: the query timeout plus grace.
    pub fn call_deadline(&self) -> Duration {
        Duration::from_secs(self.query_timeout_secs.saturating_add(self.query_grace_secs))
    }

    /// Minimum round spacing.
    pub fn min_round_interval(&self) -> Duration {
        Duration::from_secs(self.min_round_interval_secs)
    }

    /// Supervisor restart delay.
    pub fn restart_backoff(&self) -> Duration {
        Duration::from_secs(self.restart_backoff_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ScannerConfig::default();
        assert_eq!(config.bootstrap_addrs.len(), 5);
        assert_eq!(config.sample_size, 20);
        assert_eq!(config.transport_marker, "/ws");
        assert_eq!(config.min_round_interval(), Duration::ZERO);
        assert_eq!(config.invalid_after_strikes, 1);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_testing_config_has_no_bootstrap() {
        let config = ScannerConfig::for_testing();
        assert!(config.bootstrap_addrs.is_empty());
        assert_eq!(config.query_timeout(), Duration::from_secs(1));
    }

    #[test]
    fn test_call_deadline_outlasts_query_timeout() {
        let config = ScannerConfig::default();
        assert_eq!(config.query_timeout(), Duration::from_secs(60));
        assert_eq!(config.call_deadline(), Duration::from_secs(70));

        let config = ScannerConfig {
            query_grace_secs: 0,
            ..ScannerConfig::for_testing()
        };
        assert_eq!(config.call_deadline(), config.query_timeout());
    }

    #[test]
    fn test_validate_rejects_zero_strikes() {
        let config = ScannerConfig {
            invalid_after_strikes: 0,
            ..ScannerConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_validate_rejects_empty_marker() {
        let config = ScannerConfig {
            transport_marker: String::new(),
            ..ScannerConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
