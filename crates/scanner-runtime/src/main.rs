//! # WSS Scanner Runtime
//!
//! Entry point for the DHT websocket scanner.
//!
//! ## Startup Sequence
//!
//! 1. Initialize logging (`RUST_LOG`, default `info`)
//! 2. Load configuration (`WSS_SCANNER_CONFIG` TOML file, `WSS_DATA_DIR` override)
//! 3. Start the libp2p overlay
//! 4. Load snapshots, dial bootstrap peers, run rounds until Ctrl+C

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use wss_scanner::{
    ConfigProvider, JsonFileStore, Libp2pOverlay, OsRandomSource, ScanService, ScannerConfig,
    TomlConfigProvider,
};

/// Load configuration from an optional TOML file and the environment.
fn load_config() -> Result<ScannerConfig> {
    let mut config = match std::env::var("WSS_SCANNER_CONFIG") {
        Ok(path) => {
            let provider = TomlConfigProvider::load(&path)
                .with_context(|| format!("loading config from {path}"))?;
            info!(%path, "Loaded configuration file");
            provider.scanner_config()
        }
        Err(_) => ScannerConfig::default(),
    };

    if let Ok(dir) = std::env::var("WSS_DATA_DIR") {
        config.data_dir = PathBuf::from(dir);
    }

    config.validate().context("invalid configuration")?;
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(true)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = load_config()?;
    info!(
        version = wss_scanner::VERSION,
        data_dir = %config.data_dir.display(),
        bootstrap = config.bootstrap_addrs.len(),
        marker = %config.transport_marker,
        "Starting WSS scanner"
    );

    let overlay = Arc::new(
        Libp2pOverlay::spawn(&config)
            .await
            .context("starting libp2p overlay")?,
    );
    info!(peer_id = %overlay.local_peer_id(), "Overlay ready");

    let store = Arc::new(JsonFileStore::new(&config.data_dir));
    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);

    tokio::spawn(async move {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!(%err, "Could not listen for Ctrl+C");
            return;
        }
        info!("Ctrl+C received, finishing current probe");
        let _ = shutdown_tx.send(true);
    });

    let mut service =
        ScanService::new(config, overlay, store, OsRandomSource::new()).with_shutdown(shutdown_rx);
    let rounds = service.run_forever().await;

    info!(rounds, "Scanner exited cleanly");
    Ok(())
}
