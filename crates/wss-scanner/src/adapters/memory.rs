//! In-memory adapters for tests and offline simulation.
//!
//! `InMemoryOverlay` is a scripted DHT: callers decide who is connected,
//! which neighbors each seed yields, what each peer resolves to, and which
//! calls fail. Every call is recorded for later assertions.

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use async_trait::async_trait;
use futures::stream;
use futures::StreamExt;
use parking_lot::Mutex;

use crate::domain::{MultiAddress, OverlayError, PeerIdentifier, StoreError};
use crate::ports::{NeighborStream, Overlay, SnapshotStore};

#[derive(Debug, Default)]
struct OverlayScript {
    connected: Vec<PeerIdentifier>,
    neighbors: HashMap<PeerIdentifier, Vec<PeerIdentifier>>,
    addresses: HashMap<PeerIdentifier, Vec<MultiAddress>>,
    failing_queries: HashSet<PeerIdentifier>,
    truncated_queries: HashSet<PeerIdentifier>,
    failing_resolves: HashSet<PeerIdentifier>,
    refused_dials: HashSet<MultiAddress>,
    list_failures: usize,
    response_delay: Duration,
    dialed: Vec<MultiAddress>,
    queried: Vec<PeerIdentifier>,
    resolved: Vec<PeerIdentifier>,
}

/// Scripted overlay double.
#[derive(Debug, Default)]
pub struct InMemoryOverlay {
    script: Mutex<OverlayScript>,
}

impl InMemoryOverlay {
    /// Create an empty overlay: no peers, no neighbors.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the peers reported by `list_peers`.
    pub fn set_connected(&self, peers: Vec<PeerIdentifier>) {
        self.script.lock().connected = peers;
    }

    /// Set the neighbors yielded when `seed` is queried.
    pub fn set_neighbors(&self, seed: PeerIdentifier, neighbors: Vec<PeerIdentifier>) {
        self.script.lock().neighbors.insert(seed, neighbors);
    }

    /// Set the addresses `peer` resolves to.
    pub fn set_addresses(&self, peer: PeerIdentifier, addrs: Vec<MultiAddress>) {
        self.script.lock().addresses.insert(peer, addrs);
    }

    /// Make `query_near(seed)` fail before yielding anything.
    pub fn fail_query(&self, seed: PeerIdentifier) {
        self.script.lock().failing_queries.insert(seed);
    }

    /// Make the stream for `seed` yield its neighbors, then an error.
    pub fn truncate_query(&self, seed: PeerIdentifier) {
        self.script.lock().truncated_queries.insert(seed);
    }

    /// Make `resolve_addresses(peer)` fail.
    pub fn fail_resolve(&self, peer: PeerIdentifier) {
        self.script.lock().failing_resolves.insert(peer);
    }

    /// Stop failing `resolve_addresses(peer)`.
    pub fn heal_resolve(&self, peer: &PeerIdentifier) {
        self.script.lock().failing_resolves.remove(peer);
    }

    /// Make dialling `addr` fail.
    pub fn refuse_dial(&self, addr: MultiAddress) {
        self.script.lock().refused_dials.insert(addr);
    }

    /// Make the next `count` calls to `list_peers` fail.
    pub fn fail_list_peers(&self, count: usize) {
        self.script.lock().list_failures = count;
    }

    /// Delay every neighbor query and address resolution by `delay`.
    pub fn set_response_delay(&self, delay: Duration) {
        self.script.lock().response_delay = delay;
    }

    /// Addresses dialled so far, in order.
    pub fn dialed(&self) -> Vec<MultiAddress> {
        self.script.lock().dialed.clone()
    }

    /// Seeds queried so far, in order.
    pub fn queried(&self) -> Vec<PeerIdentifier> {
        self.script.lock().queried.clone()
    }

    /// Peers whose addresses were resolved so far, in order.
    pub fn resolved(&self) -> Vec<PeerIdentifier> {
        self.script.lock().resolved.clone()
    }
}

#[async_trait]
impl Overlay for InMemoryOverlay {
    async fn connect(&self, addr: &MultiAddress) -> Result<(), OverlayError> {
        let mut script = self.script.lock();
        script.dialed.push(addr.clone());
        if script.refused_dials.contains(addr) {
            return Err(OverlayError::Dial(format!("connection refused: {addr}")));
        }
        Ok(())
    }

    async fn list_peers(&self) -> Result<Vec<PeerIdentifier>, OverlayError> {
        let mut script = self.script.lock();
        if script.list_failures > 0 {
            script.list_failures -= 1;
            return Err(OverlayError::Closed);
        }
        Ok(script.connected.clone())
    }

    async fn query_near(&self, peer: &PeerIdentifier) -> Result<NeighborStream, OverlayError> {
        let (delay, result) = {
            let mut script = self.script.lock();
            script.queried.push(peer.clone());
            let result = if script.failing_queries.contains(peer) {
                Err(OverlayError::Unreachable(peer.to_string()))
            } else {
                let mut items: Vec<Result<PeerIdentifier, OverlayError>> = script
                    .neighbors
                    .get(peer)
                    .cloned()
                    .unwrap_or_default()
                    .into_iter()
                    .map(Ok)
                    .collect();
                if script.truncated_queries.contains(peer) {
                    items.push(Err(OverlayError::Timeout));
                }
                Ok(stream::iter(items).boxed())
            };
            (script.response_delay, result)
        };
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        result
    }

    async fn resolve_addresses(
        &self,
        peer: &PeerIdentifier,
    ) -> Result<Vec<MultiAddress>, OverlayError> {
        let (delay, result) = {
            let mut script = self.script.lock();
            script.resolved.push(peer.clone());
            let result = if script.failing_resolves.contains(peer) {
                Err(OverlayError::Unreachable(peer.to_string()))
            } else {
                script
                    .addresses
                    .get(peer)
                    .cloned()
                    .ok_or(OverlayError::NotFound)
            };
            (script.response_delay, result)
        };
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        result
    }
}

/// Snapshot store kept in a hash map.
#[derive(Debug, Default)]
pub struct InMemorySnapshotStore {
    documents: Mutex<HashMap<String, serde_json::Value>>,
    fail_saves: Mutex<bool>,
}

impl InMemorySnapshotStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populate a document.
    pub fn insert(&self, name: &str, value: serde_json::Value) {
        self.documents.lock().insert(name.to_string(), value);
    }

    /// Read a document without going through the port.
    pub fn get(&self, name: &str) -> Option<serde_json::Value> {
        self.documents.lock().get(name).cloned()
    }

    /// Make every subsequent `save` fail (or succeed again).
    pub fn set_fail_saves(&self, fail: bool) {
        *self.fail_saves.lock() = fail;
    }
}

#[async_trait]
impl SnapshotStore for InMemorySnapshotStore {
    async fn load(&self, name: &str) -> Result<serde_json::Value, StoreError> {
        self.get(name)
            .ok_or_else(|| StoreError::NotFound(name.to_string()))
    }

    async fn save(&self, name: &str, value: &serde_json::Value) -> Result<(), StoreError> {
        if *self.fail_saves.lock() {
            return Err(StoreError::Io {
                name: name.to_string(),
                source: std::io::Error::new(std::io::ErrorKind::Other, "disk full"),
            });
        }
        self.insert(name, value.clone());
        Ok(())
    }
}
