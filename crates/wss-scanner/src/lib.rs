//! # WSS Scanner
//!
//! Walks a libp2p Kademlia DHT and catalogues which peers advertise a
//! websocket (`/ws`) multiaddress, persisting the result as JSON so a
//! restarted scanner resumes where it stopped.
//!
//! ## Architecture
//!
//! The crate follows Hexagonal Architecture with:
//! - **Domain Layer:** peer/address types, known sets, sampler, classifier
//! - **Ports Layer:** `Overlay`, `SnapshotStore`, `RandomSource`, `ConfigProvider`
//! - **Service Layer:** the round state machine (`ScanService`)
//! - **Adapters Layer:** JSON files, TOML config, in-memory doubles, libp2p
//!
//! The live overlay requires feature `libp2p`; everything else runs against
//! the in-memory adapters.
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use wss_scanner::{
//!     FixedRandomSource, InMemoryOverlay, InMemorySnapshotStore, PeerIdentifier,
//!     MultiAddress, ScanService, ScannerApi, ScannerConfig,
//! };
//!
//! # let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap();
//! # runtime.block_on(async {
//! let overlay = Arc::new(InMemoryOverlay::new());
//! overlay.set_connected(vec![PeerIdentifier::new("QmSeed")]);
//! overlay.set_neighbors(PeerIdentifier::new("QmSeed"), vec![PeerIdentifier::new("QmA")]);
//! overlay.set_addresses(
//!     PeerIdentifier::new("QmA"),
//!     vec![MultiAddress::new("/ip4/1.2.3.4/tcp/443/ws")],
//! );
//!
//! let store = Arc::new(InMemorySnapshotStore::new());
//! let mut service = ScanService::new(
//!     ScannerConfig::for_testing(),
//!     overlay,
//!     store,
//!     FixedRandomSource::first(),
//! );
//! service.start().await;
//! let summary = service.run_round().await.unwrap();
//!
//! assert_eq!(summary.new_valid, 1);
//! assert_eq!(service.known_valid(), &[PeerIdentifier::new("QmA")]);
//! # });
//! ```

pub mod adapters;
pub mod config;
pub mod domain;
pub mod ports;
pub mod service;

// =============================================================================
// RE-EXPORTS
// =============================================================================

// Domain
pub use domain::{
    classify, sample, Classification, ClassificationRecord, ConfigError, KnownSet, MergeOutcome,
    MultiAddress, OverlayError, PeerIdentifier, RoundSummary, ScanError, ScanState, StoreError,
};

// Ports
pub use ports::{ConfigProvider, NeighborStream, Overlay, RandomSource, ScannerApi, SnapshotStore};

// Service
pub use service::{
    BootstrapReport, ProbeOutcome, ScanPhase, ScanService, KNOWN_INVALID_FILE, KNOWN_VALID_FILE,
    WS_PEERS_FILE,
};

// Config
pub use config::{
    ScannerConfig, DEFAULT_BOOTSTRAP_ADDRS, DEFAULT_SAMPLE_SIZE, DEFAULT_TRANSPORT_MARKER,
};

// Adapters
pub use adapters::{
    FixedRandomSource, InMemoryOverlay, InMemorySnapshotStore, JsonFileStore, OsRandomSource,
    StaticConfigProvider, TomlConfigProvider,
};

#[cfg(feature = "libp2p")]
pub use adapters::Libp2pOverlay;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
