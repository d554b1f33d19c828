//! End-to-end scan scenarios against the scripted overlay and real JSON
//! files in a temporary directory.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use serde_json::{json, Value};
use wss_scanner::{
    FixedRandomSource, InMemoryOverlay, JsonFileStore, MultiAddress, PeerIdentifier, ScanService,
    ScannerApi, ScannerConfig, TomlConfigProvider, KNOWN_INVALID_FILE, KNOWN_VALID_FILE,
    WS_PEERS_FILE,
};

fn peer(id: &str) -> PeerIdentifier {
    PeerIdentifier::new(id)
}

fn read_json(dir: &Path, name: &str) -> Value {
    let text = fs::read_to_string(dir.join(name)).unwrap();
    serde_json::from_str(&text).unwrap()
}

/// `QmSeed` is connected and knows `QmA` (ws + tcp) and `QmB` (tcp).
fn network() -> Arc<InMemoryOverlay> {
    let overlay = InMemoryOverlay::new();
    overlay.set_connected(vec![peer("QmSeed")]);
    overlay.set_neighbors(peer("QmSeed"), vec![peer("QmA"), peer("QmB")]);
    overlay.set_addresses(
        peer("QmA"),
        vec![
            MultiAddress::new("/ip4/1.2.3.4/tcp/4001"),
            MultiAddress::new("/ip4/1.2.3.4/tcp/443/ws"),
        ],
    );
    overlay.set_addresses(peer("QmB"), vec![MultiAddress::new("/ip4/5.6.7.8/tcp/4001")]);
    Arc::new(overlay)
}

fn config_for(dir: &Path) -> ScannerConfig {
    ScannerConfig {
        data_dir: dir.to_path_buf(),
        ..ScannerConfig::for_testing()
    }
}

#[tokio::test]
async fn fresh_scan_writes_all_three_snapshots() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_for(dir.path());
    let store = Arc::new(JsonFileStore::new(&config.data_dir));
    let mut service = ScanService::new(config, network(), store, FixedRandomSource::first());

    service.start().await;
    let summary = service.run_round().await.unwrap();

    assert!(summary.persisted);
    assert_eq!(read_json(dir.path(), KNOWN_VALID_FILE), json!(["QmA"]));
    assert_eq!(read_json(dir.path(), KNOWN_INVALID_FILE), json!(["QmB"]));
    assert_eq!(
        read_json(dir.path(), WS_PEERS_FILE),
        json!([{"addr": "/ip4/1.2.3.4/tcp/443/ws", "id": "QmA"}])
    );
    assert!(!dir.path().join(format!("{KNOWN_VALID_FILE}.tmp")).exists());
}

#[tokio::test]
async fn restarted_scanner_resumes_from_disk() {
    let dir = tempfile::tempdir().unwrap();

    {
        let config = config_for(dir.path());
        let store = Arc::new(JsonFileStore::new(&config.data_dir));
        let mut first = ScanService::new(config, network(), store, FixedRandomSource::first());
        first.start().await;
        first.run_round().await.unwrap();
    }

    let overlay = network();
    overlay.set_neighbors(peer("QmSeed"), vec![peer("QmA"), peer("QmB"), peer("QmC")]);
    overlay.set_addresses(peer("QmC"), vec![MultiAddress::new("/dns4/c.example/tcp/443/wss")]);

    let config = config_for(dir.path());
    let store = Arc::new(JsonFileStore::new(&config.data_dir));
    let mut second = ScanService::new(config, overlay.clone(), store, FixedRandomSource::first());
    second.start().await;
    assert_eq!(second.known_valid(), &[peer("QmA")]);
    assert_eq!(second.records().len(), 1);

    let summary = second.run_round().await.unwrap();

    assert_eq!(summary.candidates, 1);
    assert_eq!(overlay.resolved(), vec![peer("QmC")]);
    assert_eq!(read_json(dir.path(), KNOWN_VALID_FILE), json!(["QmA", "QmC"]));
    assert_eq!(
        read_json(dir.path(), WS_PEERS_FILE),
        json!([
            {"addr": "/ip4/1.2.3.4/tcp/443/ws", "id": "QmA"},
            {"addr": "/dns4/c.example/tcp/443/wss", "id": "QmC"}
        ])
    );
}

#[tokio::test]
async fn corrupt_snapshot_starts_empty_and_is_overwritten() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join(KNOWN_VALID_FILE), "{ not json").unwrap();

    let config = config_for(dir.path());
    let store = Arc::new(JsonFileStore::new(&config.data_dir));
    let mut service = ScanService::new(config, network(), store, FixedRandomSource::first());
    service.start().await;
    assert!(service.known_valid().is_empty());

    service.run_round().await.unwrap();
    assert_eq!(read_json(dir.path(), KNOWN_VALID_FILE), json!(["QmA"]));
}

#[tokio::test]
async fn toml_config_drives_the_scan() {
    let dir = tempfile::tempdir().unwrap();
    let toml = format!(
        r#"
[bootstrap]
nodes = ["/ip4/10.0.0.1/tcp/4001/p2p/QmBoot"]

[scan]
transport_marker = "/wss"
data_dir = "{}"
query_timeout_secs = 1
"#,
        dir.path().display()
    );
    let config = TomlConfigProvider::parse(&toml).unwrap().into_config();

    let overlay = network();
    let store = Arc::new(JsonFileStore::new(&config.data_dir));
    let mut service = ScanService::new(config, overlay.clone(), store, FixedRandomSource::first());
    service.start().await;
    let summary = service.run_round().await.unwrap();

    assert_eq!(overlay.dialed(), vec![MultiAddress::new("/ip4/10.0.0.1/tcp/4001/p2p/QmBoot")]);
    // Neither peer advertises `/wss`.
    assert_eq!(summary.new_valid, 0);
    assert_eq!(read_json(dir.path(), KNOWN_INVALID_FILE), json!(["QmA", "QmB"]));
}
