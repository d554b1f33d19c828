//! # Driven Ports (Outbound SPI)
//!
//! These are the interfaces the scanner **requires** from its host: the DHT
//! overlay, a durable snapshot store and a source of randomness.

use async_trait::async_trait;
use futures::stream::BoxStream;

use crate::config::ScannerConfig;
use crate::domain::{MultiAddress, OverlayError, PeerIdentifier, StoreError};

/// Lazy sequence of peers near a queried key.
///
/// An `Err` item ends the query for that seed.
pub type NeighborStream = BoxStream<'static, Result<PeerIdentifier, OverlayError>>;

/// Abstract interface to the DHT overlay network.
///
/// Every method is a suspension point. Implementations must be `Send + Sync`
/// so the scan loop can run on a multi-threaded runtime.
///
/// # Example Implementation
///
/// ```rust,ignore
/// struct KadOverlay { commands: mpsc::Sender<Command> }
///
/// #[async_trait]
/// impl Overlay for KadOverlay {
///     async fn list_peers(&self) -> Result<Vec<PeerIdentifier>, OverlayError> {
///         // ask the swarm task for `connected_peers()`
///         todo!()
///     }
///     // ...
/// }
/// ```
#[async_trait]
pub trait Overlay: Send + Sync {
    /// Dial a multiaddress and wait until the connection settles.
    async fn connect(&self, addr: &MultiAddress) -> Result<(), OverlayError>;

    /// Peers the overlay currently holds connections to.
    async fn list_peers(&self) -> Result<Vec<PeerIdentifier>, OverlayError>;

    /// Start a proximity query for `peer` and stream the peers it yields.
    async fn query_near(&self, peer: &PeerIdentifier) -> Result<NeighborStream, OverlayError>;

    /// Look up the addresses a peer advertises.
    async fn resolve_addresses(
        &self,
        peer: &PeerIdentifier,
    ) -> Result<Vec<MultiAddress>, OverlayError>;
}

/// Durable named JSON documents.
///
/// Every save is a full snapshot that replaces the previous document.
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Read the document stored under `name`.
    ///
    /// Returns `StoreError::NotFound` if nothing has been written yet.
    async fn load(&self, name: &str) -> Result<serde_json::Value, StoreError>;

    /// Replace the document stored under `name`.
    async fn save(&self, name: &str, value: &serde_json::Value) -> Result<(), StoreError>;
}

/// Source of uniform random indices.
///
/// Injected so sampling can be made deterministic in tests.
pub trait RandomSource: Send + Sync {
    /// Uniform value in `0..max`. Returns 0 when `max == 0`.
    fn random_usize(&self, max: usize) -> usize;
}

/// Abstract interface for configuration loading.
///
/// Allows different configuration sources (file, environment, etc.)
pub trait ConfigProvider: Send + Sync {
    /// Full scanner configuration.
    fn scanner_config(&self) -> ScannerConfig;
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Counter(std::sync::atomic::AtomicUsize);

    impl RandomSource for Counter {
        fn random_usize(&self, max: usize) -> usize {
            if max == 0 {
                return 0;
            }
            self.0.fetch_add(1, std::sync::atomic::Ordering::SeqCst) % max
        }
    }

    #[test]
    fn test_random_source_is_object_safe() {
        let rng: Box<dyn RandomSource> = Box::new(Counter(Default::default()));
        assert_eq!(rng.random_usize(3), 0);
        assert_eq!(rng.random_usize(3), 1);
        assert_eq!(rng.random_usize(0), 0);
    }
}
