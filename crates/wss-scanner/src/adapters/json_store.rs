//! JSON file snapshot store.
//!
//! One pretty-printed JSON document per name inside a data directory.
//! Writes go to `<name>.tmp` and are renamed over the target, so a crash
//! mid-write leaves the previous snapshot intact.

use std::io::ErrorKind;
use std::path::PathBuf;

use async_trait::async_trait;
use tracing::debug;

use crate::domain::StoreError;
use crate::ports::SnapshotStore;

/// Snapshot store writing `<data_dir>/<name>`.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    data_dir: PathBuf,
}

impl JsonFileStore {
    /// Store rooted at `data_dir`. The directory is created on first save.
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    fn path_for(&self, name: &str) -> PathBuf {
        self.data_dir.join(name)
    }

    fn io_error(name: &str, source: std::io::Error) -> StoreError {
        StoreError::Io {
            name: name.to_string(),
            source,
        }
    }
}

#[async_trait]
impl SnapshotStore for JsonFileStore {
    async fn load(&self, name: &str) -> Result<serde_json::Value, StoreError> {
        let path = self.path_for(name);
        let content = match tokio::fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(StoreError::NotFound(name.to_string()))
            }
            Err(e) => return Err(Self::io_error(name, e)),
        };
        serde_json::from_str(&content).map_err(|source| StoreError::Serde {
            name: name.to_string(),
            source,
        })
    }

    async fn save(&self, name: &str, value: &serde_json::Value) -> Result<(), StoreError> {
        let body = serde_json::to_string_pretty(value).map_err(|source| StoreError::Serde {
            name: name.to_string(),
            source,
        })?;

        tokio::fs::create_dir_all(&self.data_dir)
            .await
            .map_err(|e| Self::io_error(name, e))?;

        let target = self.path_for(name);
        let staging = self.path_for(&format!("{name}.tmp"));
        tokio::fs::write(&staging, body.as_bytes())
            .await
            .map_err(|e| Self::io_error(name, e))?;
        tokio::fs::rename(&staging, &target)
            .await
            .map_err(|e| Self::io_error(name, e))?;

        debug!(path = %target.display(), bytes = body.len(), "snapshot written");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path());
        let err = store.load("known-valid-addrs.json").await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound(name) if name == "known-valid-addrs.json"));
    }

    #[tokio::test]
    async fn test_save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path());
        let value = json!(["QmA", "QmB"]);
        store.save("known-valid-addrs.json", &value).await.unwrap();
        assert_eq!(store.load("known-valid-addrs.json").await.unwrap(), value);
    }

    #[tokio::test]
    async fn test_save_is_pretty_and_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path());
        let value = json!([{"addr": "/ip4/1.2.3.4/tcp/443/ws", "id": "QmA"}]);

        store.save("ws-peers.json", &value).await.unwrap();
        let first = std::fs::read(dir.path().join("ws-peers.json")).unwrap();
        store.save("ws-peers.json", &value).await.unwrap();
        let second = std::fs::read(dir.path().join("ws-peers.json")).unwrap();

        assert_eq!(first, second);
        let text = String::from_utf8(first).unwrap();
        assert!(text.contains("\n  {"), "expected 2-space indentation: {text}");
        assert!(!dir.path().join("ws-peers.json.tmp").exists());
    }

    #[tokio::test]
    async fn test_save_overwrites_previous_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path());
        store.save("known-invalid-addrs.json", &json!(["QmA", "QmB", "QmC"])).await.unwrap();
        store.save("known-invalid-addrs.json", &json!(["QmD"])).await.unwrap();
        assert_eq!(store.load("known-invalid-addrs.json").await.unwrap(), json!(["QmD"]));
    }

    #[tokio::test]
    async fn test_corrupt_file_is_serde_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("ws-peers.json"), "[{not json").unwrap();
        let store = JsonFileStore::new(dir.path());
        let err = store.load("ws-peers.json").await.unwrap_err();
        assert!(matches!(err, StoreError::Serde { .. }));
    }

    #[tokio::test]
    async fn test_save_creates_data_dir() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("state").join("scan");
        let store = JsonFileStore::new(&nested);
        store.save("ws-peers.json", &json!([])).await.unwrap();
        assert!(nested.join("ws-peers.json").exists());
    }
}
