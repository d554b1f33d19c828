//! Snapshot load/save for the scan state.
//!
//! Three documents, each a plain JSON array fully rewritten every round:
//! `known-valid-addrs.json`, `known-invalid-addrs.json`, `ws-peers.json`.

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{info, warn};

use crate::domain::{ClassificationRecord, PeerIdentifier, ScanState, StoreError};
use crate::ports::SnapshotStore;

/// Known-valid peer identifiers.
pub const KNOWN_VALID_FILE: &str = "known-valid-addrs.json";
/// Known-invalid peer identifiers.
pub const KNOWN_INVALID_FILE: &str = "known-invalid-addrs.json";
/// Classification records.
pub const WS_PEERS_FILE: &str = "ws-peers.json";

/// Load the scan state, treating missing or unreadable snapshots as empty.
pub async fn load_state<S: SnapshotStore + ?Sized>(store: &S) -> ScanState {
    let valid: Vec<PeerIdentifier> = load_collection(store, KNOWN_VALID_FILE).await;
    let invalid: Vec<PeerIdentifier> = load_collection(store, KNOWN_INVALID_FILE).await;
    let records: Vec<ClassificationRecord> = load_collection(store, WS_PEERS_FILE).await;

    let state = ScanState::restore(valid, invalid, records);
    info!(
        known_valid = state.known_valid().len(),
        known_invalid = state.known_invalid().len(),
        records = state.records().len(),
        "Starting with persisted scan state"
    );
    state
}

/// Write all three snapshots.
///
/// Every document is attempted even if an earlier one fails; the first
/// error is returned.
pub async fn save_state<S: SnapshotStore + ?Sized>(
    store: &S,
    state: &ScanState,
) -> Result<(), StoreError> {
    let results = [
        save_collection(store, KNOWN_INVALID_FILE, state.known_invalid().as_slice()).await,
        save_collection(store, KNOWN_VALID_FILE, state.known_valid().as_slice()).await,
        save_collection(store, WS_PEERS_FILE, state.records()).await,
    ];
    results.into_iter().collect()
}

async fn load_collection<S, T>(store: &S, name: &str) -> Vec<T>
where
    S: SnapshotStore + ?Sized,
    T: DeserializeOwned,
{
    let value = match store.load(name).await {
        Ok(value) => value,
        Err(StoreError::NotFound(_)) => {
            info!(file = name, "Could not open snapshot, starting empty");
            return Vec::new();
        }
        Err(err) => {
            warn!(file = name, %err, "Could not read snapshot, starting empty");
            return Vec::new();
        }
    };

    match serde_json::from_value(value) {
        Ok(items) => {
            info!(file = name, "Successfully opened snapshot");
            items
        }
        Err(err) => {
            warn!(file = name, %err, "Snapshot has unexpected shape, starting empty");
            Vec::new()
        }
    }
}

async fn save_collection<S, T>(store: &S, name: &str, items: &[T]) -> Result<(), StoreError>
where
    S: SnapshotStore + ?Sized,
    T: Serialize,
{
    let value = serde_json::to_value(items).map_err(|source| StoreError::Serde {
        name: name.to_string(),
        source,
    })?;
    store.save(name, &value).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::{InMemorySnapshotStore, JsonFileStore};
    use crate::domain::{Classification, MultiAddress};
    use serde_json::json;

    fn peer(id: &str) -> PeerIdentifier {
        PeerIdentifier::new(id)
    }

    #[tokio::test]
    async fn test_missing_snapshots_load_as_empty() {
        let store = InMemorySnapshotStore::new();
        let state = load_state(&store).await;
        assert!(state.known_valid().is_empty());
        assert!(state.known_invalid().is_empty());
        assert!(state.records().is_empty());
    }

    #[tokio::test]
    async fn test_malformed_snapshot_loads_as_empty() {
        let store = InMemorySnapshotStore::new();
        store.insert(KNOWN_VALID_FILE, json!({"not": "an array"}));
        store.insert(KNOWN_INVALID_FILE, json!(["QmB"]));
        let state = load_state(&store).await;
        assert!(state.known_valid().is_empty());
        assert_eq!(state.known_invalid().as_slice(), &[peer("QmB")]);
    }

    #[tokio::test]
    async fn test_round_trip_through_json_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path());

        let mut state = ScanState::new();
        state.merge(
            &peer("QmA"),
            Classification::Valid(vec![ClassificationRecord {
                addr: MultiAddress::new("/ip4/1.2.3.4/tcp/443/ws"),
                id: peer("QmA"),
            }]),
            1,
        );
        state.merge(&peer("QmB"), Classification::Invalid, 1);

        save_state(&store, &state).await.unwrap();
        let restored = load_state(&store).await;

        assert_eq!(restored.known_valid(), state.known_valid());
        assert_eq!(restored.known_invalid(), state.known_invalid());
        assert_eq!(restored.records(), state.records());
        assert_eq!(
            store.load(WS_PEERS_FILE).await.unwrap(),
            json!([{"addr": "/ip4/1.2.3.4/tcp/443/ws", "id": "QmA"}])
        );
    }

    #[tokio::test]
    async fn test_save_failure_is_reported() {
        let store = InMemorySnapshotStore::new();
        store.set_fail_saves(true);
        assert!(save_state(&store, &ScanState::new()).await.is_err());
    }
}
