use std::sync::Arc;

use tokio::sync::watch;

use crate::config::ScannerConfig;
use crate::domain::{ClassificationRecord, PeerIdentifier, ScanState};
use crate::ports::{Overlay, RandomSource, ScannerApi, SnapshotStore};

/// Lifecycle of the scan loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanPhase {
    /// Loading snapshots and dialling bootstrap peers.
    Bootstrapping,
    /// Sampling, discovering and probing.
    RoundRunning,
    /// Writing the end-of-round snapshot.
    RoundPersisting,
    /// Shutdown was requested and the last snapshot is written.
    Stopped,
}

/// Scan service owning the classification state.
///
/// Wires the overlay, snapshot store and random source to the round state
/// machine. All mutation of [`ScanState`] happens through `&mut self`.
///
/// # Example
///
/// ```rust,ignore
/// let overlay = Arc::new(Libp2pOverlay::spawn(&config).await?);
/// let store = Arc::new(JsonFileStore::new(&config.data_dir));
/// let mut service = ScanService::new(config, overlay, store, OsRandomSource::new())
///     .with_shutdown(shutdown_rx);
/// service.run_forever().await;
/// ```
pub struct ScanService<O: Overlay, S: SnapshotStore, R: RandomSource> {
    pub(crate) config: ScannerConfig,
    pub(crate) overlay: Arc<O>,
    pub(crate) store: Arc<S>,
    pub(crate) rng: R,
    pub(crate) state: ScanState,
    pub(crate) phase: ScanPhase,
    pub(crate) rounds: u64,
    pub(crate) shutdown: watch::Receiver<bool>,
    /// Keeps the default channel open when no external signal is attached.
    _shutdown_tx: Option<watch::Sender<bool>>,
}

impl<O: Overlay, S: SnapshotStore, R: RandomSource> ScanService<O, S, R> {
    /// Create a service with empty state.
    ///
    /// Call [`ScanService::start`] (or `run_forever`) to load snapshots and
    /// bootstrap before running rounds.
    pub fn new(config: ScannerConfig, overlay: Arc<O>, store: Arc<S>, rng: R) -> Self {
        let (tx, rx) = watch::channel(false);
        Self {
            config,
            overlay,
            store,
            rng,
            state: ScanState::new(),
            phase: ScanPhase::Bootstrapping,
            rounds: 0,
            shutdown: rx,
            _shutdown_tx: Some(tx),
        }
    }

    /// Attach an external shutdown signal. Sending `true` stops the loop
    /// after the in-flight probe and a final snapshot.
    #[must_use]
    pub fn with_shutdown(mut self, shutdown: watch::Receiver<bool>) -> Self {
        self.shutdown = shutdown;
        self._shutdown_tx = None;
        self
    }

    /// Replace the in-memory state (used by tests and simulations).
    #[must_use]
    pub fn with_state(mut self, state: ScanState) -> Self {
        self.state = state;
        self
    }

    /// Current classification state.
    pub fn state(&self) -> &ScanState {
        &self.state
    }

    /// Current lifecycle phase.
    pub fn phase(&self) -> ScanPhase {
        self.phase
    }

    /// Active configuration.
    pub fn config(&self) -> &ScannerConfig {
        &self.config
    }

    pub(crate) fn shutdown_requested(&self) -> bool {
        *self.shutdown.borrow()
    }
}

impl<O: Overlay, S: SnapshotStore, R: RandomSource> ScannerApi for ScanService<O, S, R> {
    fn known_valid(&self) -> &[PeerIdentifier] {
        self.state.known_valid().as_slice()
    }

    fn known_invalid(&self) -> &[PeerIdentifier] {
        self.state.known_invalid().as_slice()
    }

    fn records(&self) -> &[ClassificationRecord] {
        self.state.records()
    }

    fn rounds_completed(&self) -> u64 {
        self.rounds
    }
}
