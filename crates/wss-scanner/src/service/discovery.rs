//! Neighbor discovery: turn seeds into a deduplicated candidate list.

use std::collections::HashSet;
use std::time::Duration;

use futures::StreamExt;
use tokio::sync::watch;
use tracing::{debug, info};

use crate::domain::{OverlayError, PeerIdentifier, ScanState};
use crate::ports::Overlay;

/// Query the overlay near each seed and collect unclassified peers.
///
/// Seeds are processed in order and candidates keep discovery order. A seed
/// whose query fails or times out contributes nothing; the remaining seeds
/// are still queried. Stops early once `shutdown` is raised.
pub async fn discover<O: Overlay + ?Sized>(
    overlay: &O,
    seeds: &[PeerIdentifier],
    state: &ScanState,
    limit: Duration,
    shutdown: &watch::Receiver<bool>,
) -> Vec<PeerIdentifier> {
    let mut candidates = Vec::new();
    let mut seen = HashSet::new();

    for seed in seeds {
        if *shutdown.borrow() {
            debug!("shutdown requested, skipping remaining seeds");
            break;
        }

        let neighbors = match tokio::time::timeout(limit, collect_neighbors(overlay, seed)).await {
            Ok(Ok(neighbors)) => neighbors,
            Ok(Err(err)) => {
                debug!(seed = %seed, %err, "neighbor query failed");
                Vec::new()
            }
            Err(_) => {
                debug!(seed = %seed, "neighbor query timed out");
                Vec::new()
            }
        };

        let found = neighbors.len();
        for neighbor in neighbors {
            if !state.is_known(&neighbor) && seen.insert(neighbor.clone()) {
                candidates.push(neighbor);
            }
        }

        info!(
            seed = %seed,
            neighbors = found,
            at = %chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
            "DHT queried"
        );
    }

    candidates
}

/// Drain the full neighbor stream for one seed.
///
/// An error anywhere in the stream discards the whole seed.
async fn collect_neighbors<O: Overlay + ?Sized>(
    overlay: &O,
    seed: &PeerIdentifier,
) -> Result<Vec<PeerIdentifier>, OverlayError> {
    let mut stream = overlay.query_near(seed).await?;
    let mut neighbors = Vec::new();
    while let Some(item) = stream.next().await {
        neighbors.push(item?);
    }
    Ok(neighbors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::InMemoryOverlay;

    fn peer(id: &str) -> PeerIdentifier {
        PeerIdentifier::new(id)
    }

    fn no_shutdown() -> watch::Receiver<bool> {
        watch::channel(false).1
    }

    #[tokio::test]
    async fn test_failing_middle_seed_is_isolated() {
        let overlay = InMemoryOverlay::new();
        overlay.set_neighbors(peer("s1"), vec![peer("a")]);
        overlay.set_neighbors(peer("s2"), vec![peer("b")]);
        overlay.fail_query(peer("s2"));
        overlay.set_neighbors(peer("s3"), vec![peer("c")]);

        let seeds = vec![peer("s1"), peer("s2"), peer("s3")];
        let found = discover(
            &overlay,
            &seeds,
            &ScanState::new(),
            Duration::from_secs(1),
            &no_shutdown(),
        )
        .await;

        assert_eq!(found, vec![peer("a"), peer("c")]);
        assert_eq!(overlay.queried(), seeds);
    }

    #[tokio::test]
    async fn test_error_mid_stream_discards_seed() {
        let overlay = InMemoryOverlay::new();
        overlay.set_neighbors(peer("s1"), vec![peer("a"), peer("b")]);
        overlay.truncate_query(peer("s1"));
        overlay.set_neighbors(peer("s2"), vec![peer("c")]);

        let found = discover(
            &overlay,
            &[peer("s1"), peer("s2")],
            &ScanState::new(),
            Duration::from_secs(1),
            &no_shutdown(),
        )
        .await;

        assert_eq!(found, vec![peer("c")]);
    }

    #[tokio::test]
    async fn test_dedup_against_known_sets_and_each_other() {
        let overlay = InMemoryOverlay::new();
        overlay.set_neighbors(peer("s1"), vec![peer("v"), peer("a"), peer("a")]);
        overlay.set_neighbors(peer("s2"), vec![peer("i"), peer("a"), peer("b")]);
        let state = ScanState::restore(vec![peer("v")], vec![peer("i")], Vec::new());

        let found = discover(
            &overlay,
            &[peer("s1"), peer("s2"), peer("s1")],
            &state,
            Duration::from_secs(1),
            &no_shutdown(),
        )
        .await;

        assert_eq!(found, vec![peer("a"), peer("b")]);
        assert!(found.iter().all(|c| !state.is_known(c)));
    }

    #[tokio::test]
    async fn test_shutdown_stops_before_querying() {
        let overlay = InMemoryOverlay::new();
        overlay.set_neighbors(peer("s1"), vec![peer("a")]);
        let (tx, rx) = watch::channel(false);
        tx.send(true).unwrap();

        let limit = Duration::from_secs(1);
        let found = discover(&overlay, &[peer("s1")], &ScanState::new(), limit, &rx).await;

        assert!(found.is_empty());
        assert!(overlay.queried().is_empty());
    }
}
