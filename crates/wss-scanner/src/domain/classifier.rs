//! Address classification against the target transport marker.

use super::types::{Classification, ClassificationRecord, MultiAddress, PeerIdentifier};

/// Classify `peer` from the addresses it resolved to.
///
/// Every address containing `marker` becomes a record; one match is enough
/// for `Valid`. Pure and deterministic: the same inputs always produce the
/// same verdict with records in address order.
pub fn classify(peer: &PeerIdentifier, addrs: &[MultiAddress], marker: &str) -> Classification {
    let records: Vec<ClassificationRecord> = addrs
        .iter()
        .filter(|addr| addr.contains_marker(marker))
        .map(|addr| ClassificationRecord {
            addr: addr.clone(),
            id: peer.clone(),
        })
        .collect();

    if records.is_empty() {
        Classification::Invalid
    } else {
        Classification::Valid(records)
    }
}
