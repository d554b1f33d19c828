use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::config::ScannerConfig;
use crate::domain::ConfigError;
use crate::ports::ConfigProvider;

// ============================================================================
// StaticConfigProvider - Hardcoded config for testing/development
// ============================================================================

/// Static configuration provider with hardcoded values.
///
/// Useful for testing and development. For deployments, use `TomlConfigProvider`.
#[derive(Debug, Clone, Default)]
pub struct StaticConfigProvider {
    config: ScannerConfig,
}

impl StaticConfigProvider {
    /// Create with the default config.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the bootstrap list.
    #[must_use]
    pub fn with_bootstrap_addrs(mut self, addrs: Vec<String>) -> Self {
        self.config.bootstrap_addrs = addrs;
        self
    }

    /// Replace the whole config.
    #[must_use]
    pub fn with_config(mut self, config: ScannerConfig) -> Self {
        self.config = config;
        self
    }
}

impl ConfigProvider for StaticConfigProvider {
    fn scanner_config(&self) -> ScannerConfig {
        self.config.clone()
    }
}

// ============================================================================
// TomlConfigProvider - File-based config loading
// ============================================================================

/// Configuration file structure.
#[derive(Debug, Deserialize, Default)]
struct ConfigFile {
    #[serde(default)]
    bootstrap: Option<BootstrapSection>,
    #[serde(default)]
    scan: ScanSection,
}

#[derive(Debug, Deserialize, Default)]
struct BootstrapSection {
    #[serde(default)]
    nodes: Vec<String>,
}

#[derive(Debug, Deserialize, Default)]
struct ScanSection {
    sample_size: Option<usize>,
    transport_marker: Option<String>,
    data_dir: Option<PathBuf>,
    min_round_interval_secs: Option<u64>,
    query_timeout_secs: Option<u64>,
    query_grace_secs: Option<u64>,
    invalid_after_strikes: Option<u32>,
    revalidate_per_round: Option<usize>,
    max_known_peers: Option<usize>,
    restart_backoff_secs: Option<u64>,
}

/// TOML-based configuration provider.
///
/// # Config File Format
///
/// ```toml
/// [bootstrap]
/// nodes = [
///     "/ip4/104.131.131.82/tcp/4001/p2p/QmaCpDMGvV2BGHeYERUEnRQAwe3N8SzbUtfsmvsqQLuvuJ",
/// ]
///
/// [scan]
/// sample_size = 20
/// transport_marker = "/ws"
/// data_dir = "/var/lib/wss-scanner"
/// min_round_interval_secs = 30
/// query_timeout_secs = 60
/// query_grace_secs = 10
/// invalid_after_strikes = 2
/// revalidate_per_round = 5
/// max_known_peers = 0
/// restart_backoff_secs = 5
/// ```
///
/// Omitting `[bootstrap]` keeps the built-in list; an empty `nodes` array
/// disables bootstrapping.
#[derive(Debug, Clone)]
pub struct TomlConfigProvider {
    config: ScannerConfig,
}

impl TomlConfigProvider {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns error if file cannot be read, parsed or validated.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path.as_ref()).map_err(|e| ConfigError::Io {
            path: path.as_ref().display().to_string(),
            error: e.to_string(),
        })?;

        Self::parse(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let file: ConfigFile =
            toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;

        let defaults = ScannerConfig::default();
        let scan = file.scan;
        let config = ScannerConfig {
            bootstrap_addrs: file
                .bootstrap
                .map(|b| b.nodes)
                .unwrap_or(defaults.bootstrap_addrs),
            sample_size: scan.sample_size.unwrap_or(defaults.sample_size),
            transport_marker: scan.transport_marker.unwrap_or(defaults.transport_marker),
            data_dir: scan.data_dir.unwrap_or(defaults.data_dir),
            min_round_interval_secs: scan
                .min_round_interval_secs
                .unwrap_or(defaults.min_round_interval_secs),
            query_timeout_secs: scan.query_timeout_secs.unwrap_or(defaults.query_timeout_secs),
            query_grace_secs: scan.query_grace_secs.unwrap_or(defaults.query_grace_secs),
            invalid_after_strikes: scan
                .invalid_after_strikes
                .unwrap_or(defaults.invalid_after_strikes),
            revalidate_per_round: scan
                .revalidate_per_round
                .unwrap_or(defaults.revalidate_per_round),
            max_known_peers: scan.max_known_peers.unwrap_or(defaults.max_known_peers),
            restart_backoff_secs: scan
                .restart_backoff_secs
                .unwrap_or(defaults.restart_backoff_secs),
        };
        config.validate()?;

        Ok(Self { config })
    }

    /// Consume the provider, returning the parsed config.
    pub fn into_config(self) -> ScannerConfig {
        self.config
    }
}

impl ConfigProvider for TomlConfigProvider {
    fn scanner_config(&self) -> ScannerConfig {
        self.config.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_provider_overrides_bootstrap() {
        let provider = StaticConfigProvider::new()
            .with_bootstrap_addrs(vec!["/ip4/127.0.0.1/tcp/4001".into()]);
        let config = provider.scanner_config();
        assert_eq!(config.bootstrap_addrs.len(), 1);
        assert_eq!(config.sample_size, 20);
    }

    #[test]
    fn test_empty_toml_yields_defaults() {
        let provider = TomlConfigProvider::parse("").unwrap();
        assert_eq!(provider.scanner_config(), ScannerConfig::default());
    }

    #[test]
    fn test_toml_overrides_selected_fields() {
        let provider = TomlConfigProvider::parse(
            r#"
            [bootstrap]
            nodes = ["/ip4/10.0.0.1/tcp/4001"]

            [scan]
            sample_size = 5
            min_round_interval_secs = 30
            invalid_after_strikes = 3
            data_dir = "/tmp/scan"
            "#,
        )
        .unwrap();
        let config = provider.scanner_config();
        assert_eq!(config.bootstrap_addrs, vec!["/ip4/10.0.0.1/tcp/4001".to_string()]);
        assert_eq!(config.sample_size, 5);
        assert_eq!(config.min_round_interval_secs, 30);
        assert_eq!(config.invalid_after_strikes, 3);
        assert_eq!(config.data_dir, PathBuf::from("/tmp/scan"));
        assert_eq!(config.transport_marker, "/ws");
    }

    #[test]
    fn test_empty_bootstrap_list_disables_bootstrapping() {
        let provider = TomlConfigProvider::parse("[bootstrap]\nnodes = []\n").unwrap();
        assert!(provider.scanner_config().bootstrap_addrs.is_empty());
    }

    #[test]
    fn test_toml_sets_query_grace() {
        let toml = "[scan]\nquery_timeout_secs = 20\nquery_grace_secs = 5\n";
        let config = TomlConfigProvider::parse(toml).unwrap().into_config();
        assert_eq!(config.call_deadline(), std::time::Duration::from_secs(25));
    }

    #[test]
    fn test_invalid_toml_is_parse_error() {
        let err = TomlConfigProvider::parse("[scan\nsample_size = ").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_invalid_value_is_rejected() {
        let err = TomlConfigProvider::parse("[scan]\nquery_timeout_secs = 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = TomlConfigProvider::load("/nonexistent/wss-scanner.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
