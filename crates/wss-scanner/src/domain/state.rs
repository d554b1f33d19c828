//! # Scan State
//!
//! The process-wide accumulator: known-valid peers, known-invalid peers and
//! the append-only classification records. Owned by the scan loop and only
//! mutated between rounds' probe steps, never concurrently.
//!
//! ## Invariants
//!
//! - A peer is never in both known sets after a merge.
//! - Both sets keep insertion order (this is the order written to disk).
//! - Membership tests are O(1).

use std::collections::{HashMap, HashSet};

use super::types::{Classification, ClassificationRecord, MergeOutcome, PeerIdentifier};

/// Insertion-ordered set of peer identifiers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KnownSet {
    order: Vec<PeerIdentifier>,
    members: HashSet<PeerIdentifier>,
}

impl KnownSet {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a peer. Returns `false` if it was already present.
    pub fn insert(&mut self, peer: PeerIdentifier) -> bool {
        if !self.members.insert(peer.clone()) {
            return false;
        }
        self.order.push(peer);
        true
    }

    /// Remove a peer. Returns `true` if it was present.
    pub fn remove(&mut self, peer: &PeerIdentifier) -> bool {
        if !self.members.remove(peer) {
            return false;
        }
        self.order.retain(|p| p != peer);
        true
    }

    /// O(1) membership test.
    pub fn contains(&self, peer: &PeerIdentifier) -> bool {
        self.members.contains(peer)
    }

    /// Number of peers.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// True if no peers are held.
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Peers in insertion order.
    pub fn as_slice(&self) -> &[PeerIdentifier] {
        &self.order
    }

    /// Iterate in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &PeerIdentifier> {
        self.order.iter()
    }

    /// Drop the oldest entries until at most `cap` remain.
    ///
    /// Returns the evicted peers, oldest first.
    pub fn retain_newest(&mut self, cap: usize) -> Vec<PeerIdentifier> {
        if self.order.len() <= cap {
            return Vec::new();
        }
        let excess = self.order.len() - cap;
        let evicted: Vec<_> = self.order.drain(..excess).collect();
        for peer in &evicted {
            self.members.remove(peer);
        }
        evicted
    }
}

impl FromIterator<PeerIdentifier> for KnownSet {
    fn from_iter<I: IntoIterator<Item = PeerIdentifier>>(iter: I) -> Self {
        let mut set = Self::new();
        for peer in iter {
            set.insert(peer);
        }
        set
    }
}

/// Classification state for the lifetime of the process.
#[derive(Debug, Clone, Default)]
pub struct ScanState {
    known_valid: KnownSet,
    known_invalid: KnownSet,
    records: Vec<ClassificationRecord>,
    /// Consecutive "no capability" probes for peers not yet classified invalid.
    strikes: HashMap<PeerIdentifier, u32>,
    /// Peers holding strikes, in order of their first strike.
    struck: KnownSet,
}

impl ScanState {
    /// Empty state for a fresh start.
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild state from persisted snapshots.
    ///
    /// Duplicates are dropped. A peer present in both lists (written by an
    /// older run that never reclassified invalid peers) is kept as valid only.
    pub fn restore(
        valid: Vec<PeerIdentifier>,
        invalid: Vec<PeerIdentifier>,
        records: Vec<ClassificationRecord>,
    ) -> Self {
        let known_valid: KnownSet = valid.into_iter().collect();
        let known_invalid: KnownSet = invalid
            .into_iter()
            .filter(|peer| !known_valid.contains(peer))
            .collect();
        Self {
            known_valid,
            known_invalid,
            records,
            strikes: HashMap::new(),
            struck: KnownSet::new(),
        }
    }

    /// Peers confirmed to expose the capability.
    pub fn known_valid(&self) -> &KnownSet {
        &self.known_valid
    }

    /// Peers probed and found without the capability.
    pub fn known_invalid(&self) -> &KnownSet {
        &self.known_invalid
    }

    /// All classification records, oldest first.
    pub fn records(&self) -> &[ClassificationRecord] {
        &self.records
    }

    /// Current strike count for an unclassified peer.
    pub fn strikes(&self, peer: &PeerIdentifier) -> u32 {
        self.strikes.get(peer).copied().unwrap_or(0)
    }

    /// Number of unclassified peers currently holding strikes.
    pub fn struck_len(&self) -> usize {
        self.struck.len()
    }

    /// True if the peer is in either known set.
    pub fn is_known(&self, peer: &PeerIdentifier) -> bool {
        self.known_valid.contains(peer) || self.known_invalid.contains(peer)
    }

    /// Merge a probe verdict for `peer`.
    ///
    /// Valid verdicts always win: the peer leaves the invalid set, enters the
    /// valid set, and every record is appended. Invalid verdicts add a strike
    /// and move the peer to the invalid set once `strike_threshold` is reached.
    pub fn merge(
        &mut self,
        peer: &PeerIdentifier,
        verdict: Classification,
        strike_threshold: u32,
    ) -> MergeOutcome {
        match verdict {
            Classification::Valid(records) => {
                self.clear_strikes(peer);
                self.records.extend(records);
                let was_invalid = self.known_invalid.remove(peer);
                let inserted = self.known_valid.insert(peer.clone());
                match (was_invalid, inserted) {
                    (true, _) => MergeOutcome::Revalidated,
                    (false, true) => MergeOutcome::NewValid,
                    (false, false) => MergeOutcome::Unchanged,
                }
            }
            Classification::Invalid => {
                if self.is_known(peer) {
                    return MergeOutcome::Unchanged;
                }
                let strikes = self.strikes.entry(peer.clone()).or_insert(0);
                *strikes += 1;
                let strikes = *strikes;
                if strikes < strike_threshold.max(1) {
                    self.struck.insert(peer.clone());
                    return MergeOutcome::Strike(strikes);
                }
                self.clear_strikes(peer);
                self.known_invalid.insert(peer.clone());
                MergeOutcome::NewInvalid
            }
        }
    }

    /// Enforce a size cap on both known sets, evicting oldest first.
    ///
    /// Records of evicted valid peers are dropped as well, and the strike
    /// table is trimmed to the `cap` most recently struck peers. `cap == 0`
    /// disables the cap. Returns the number of evicted known peers.
    pub fn enforce_cap(&mut self, cap: usize) -> usize {
        if cap == 0 {
            return 0;
        }
        let evicted_valid: HashSet<_> = self.known_valid.retain_newest(cap).into_iter().collect();
        let evicted_invalid = self.known_invalid.retain_newest(cap).len();
        for peer in self.struck.retain_newest(cap) {
            self.strikes.remove(&peer);
        }
        if !evicted_valid.is_empty() {
            self.records.retain(|record| !evicted_valid.contains(&record.id));
        }
        evicted_valid.len() + evicted_invalid
    }

    fn clear_strikes(&mut self, peer: &PeerIdentifier) {
        if self.strikes.remove(peer).is_some() {
            self.struck.remove(peer);
        }
    }
}
