//! Core value types: peer identifiers, multiaddresses and classification records.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque identifier of a DHT participant.
///
/// Equality is plain string equality. The scanner never decodes the
/// identifier; only the overlay adapter knows its wire representation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PeerIdentifier(String);

impl PeerIdentifier {
    /// Wrap a textual peer identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the textual form.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PeerIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PeerIdentifier {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for PeerIdentifier {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Textual multiaddress as advertised by a peer.
///
/// Only the surface text is inspected (substring match on the transport
/// marker). Parsing into protocol segments is left to the overlay adapter.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MultiAddress(String);

impl MultiAddress {
    /// Wrap a textual multiaddress.
    pub fn new(addr: impl Into<String>) -> Self {
        Self(addr.into())
    }

    /// Borrow the textual form.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True when the address text contains `marker` anywhere.
    ///
    /// `"/ws"` therefore matches both `/ws` and `/wss` stacks.
    pub fn contains_marker(&self, marker: &str) -> bool {
        self.0.contains(marker)
    }
}

impl fmt::Display for MultiAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for MultiAddress {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Evidence that `id` exposes the target transport at `addr`.
///
/// Serialized as `{"addr": ..., "id": ...}` in `ws-peers.json`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClassificationRecord {
    /// Matching address.
    pub addr: MultiAddress,
    /// Peer that advertised it.
    pub id: PeerIdentifier,
}

/// Verdict for a single candidate whose addresses were resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    /// At least one address carries the marker; one record per match.
    Valid(Vec<ClassificationRecord>),
    /// No address carries the marker.
    Invalid,
}

impl Classification {
    /// Whether this verdict marks the peer as exposing the capability.
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid(_))
    }
}

/// What happened when a merge was applied to the scan state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    /// Peer newly entered the known-valid set.
    NewValid,
    /// Peer moved from known-invalid to known-valid.
    Revalidated,
    /// Peer newly entered the known-invalid set.
    NewInvalid,
    /// Peer collected a strike but stays unclassified.
    Strike(u32),
    /// Peer was already classified this way; nothing changed.
    Unchanged,
}

/// Per-round statistics returned by the scan loop.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoundSummary {
    /// 1-based round number for this process.
    pub round: u64,
    /// Connected peers reported by the overlay at round start.
    pub connected: usize,
    /// Seeds produced by the sampler.
    pub seeds: usize,
    /// Deduplicated candidates found by neighbor discovery.
    pub candidates: usize,
    /// Candidates probed before the round ended (shutdown may cut it short).
    pub probed: usize,
    /// Peers that entered the known-valid set.
    pub new_valid: usize,
    /// Peers that entered the known-invalid set.
    pub new_invalid: usize,
    /// Candidates whose addresses could not be resolved.
    pub unreachable: usize,
    /// Known-invalid peers promoted to valid by re-validation.
    pub revalidated: usize,
    /// Known-valid set size after the round.
    pub known_valid: usize,
    /// Known-invalid set size after the round.
    pub known_invalid: usize,
    /// Classification records held after the round.
    pub records: usize,
    /// Whether the end-of-round snapshot was written.
    pub persisted: bool,
}
