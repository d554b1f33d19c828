//! The round state machine.
//!
//! ```text
//! Bootstrapping ──► RoundRunning ──► RoundPersisting ──┐
//!                        ▲                             │
//!                        └──────── (pause) ◄───────────┘
//!                                     │ shutdown
//!                                     ▼
//!                                  Stopped
//! ```

use std::time::Duration;

use tracing::{debug, error, info, warn};

use super::bootstrap::{connect_all, BootstrapReport};
use super::core::{ScanPhase, ScanService};
use super::discovery::discover;
use super::persistence::{load_state, save_state};
use super::prober::{probe, ProbeOutcome};
use crate::domain::{
    sample, Classification, MergeOutcome, MultiAddress, OverlayError, PeerIdentifier,
    RoundSummary, ScanError,
};
use crate::ports::{Overlay, RandomSource, SnapshotStore};

impl<O: Overlay, S: SnapshotStore, R: RandomSource> ScanService<O, S, R> {
    /// Load persisted state and dial the bootstrap peers.
    pub async fn start(&mut self) -> BootstrapReport {
        self.phase = ScanPhase::Bootstrapping;
        self.state = load_state(&*self.store).await;

        let addrs: Vec<MultiAddress> = self
            .config
            .bootstrap_addrs
            .iter()
            .map(MultiAddress::new)
            .collect();
        let report = connect_all(&*self.overlay, &addrs, self.config.call_deadline()).await;
        info!(
            connected = report.connected.len(),
            failed = report.failed.len(),
            "Bootstrap complete"
        );

        self.phase = ScanPhase::RoundRunning;
        report
    }

    /// Run one sample → discover → probe → persist cycle.
    ///
    /// Only a failure to list connected peers aborts the round. Persistence
    /// is best-effort: a failed save is logged and the merged state is kept.
    pub async fn run_round(&mut self) -> Result<RoundSummary, ScanError> {
        let round = self.rounds + 1;
        let limit = self.config.call_deadline();
        self.phase = ScanPhase::RoundRunning;
        info!(
            round,
            timestamp = %chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
            "Iteration starting"
        );

        let connected = match tokio::time::timeout(limit, self.overlay.list_peers()).await {
            Ok(result) => result?,
            Err(_) => return Err(OverlayError::Timeout.into()),
        };
        info!(round, connected = connected.len(), "Connected peers");

        let seeds = sample(&connected, &self.state, self.config.sample_size, &self.rng);
        let candidates =
            discover(&*self.overlay, &seeds, &self.state, limit, &self.shutdown).await;
        info!(round, candidates = candidates.len(), "Scanning candidates");

        let mut summary = RoundSummary {
            round,
            connected: connected.len(),
            seeds: seeds.len(),
            candidates: candidates.len(),
            ..RoundSummary::default()
        };

        for candidate in &candidates {
            if self.shutdown_requested() {
                info!(
                    round,
                    remaining = candidates.len() - summary.probed,
                    "Shutdown requested, ending round early"
                );
                break;
            }
            let marker = &self.config.transport_marker;
            let outcome = probe(&*self.overlay, candidate, marker, limit).await;
            summary.probed += 1;
            self.apply_outcome(candidate, outcome, &mut summary);
        }

        if !self.shutdown_requested() {
            self.revalidate(&mut summary).await;
        }

        let evicted = self.state.enforce_cap(self.config.max_known_peers);
        if evicted > 0 {
            info!(round, evicted, "Retention cap evicted oldest peers");
        }

        summary.known_valid = self.state.known_valid().len();
        summary.known_invalid = self.state.known_invalid().len();
        summary.records = self.state.records().len();
        info!(round, known_invalid = summary.known_invalid, "Known invalid addresses");
        info!(round, known_valid = summary.known_valid, "Known valid addresses");

        self.phase = ScanPhase::RoundPersisting;
        summary.persisted = match save_state(&*self.store, &self.state).await {
            Ok(()) => {
                info!(round, "Successfully wrote out new JSON files");
                true
            }
            Err(err) => {
                warn!(round, %err, "Could not write snapshots, keeping state in memory");
                false
            }
        };

        self.rounds = round;
        self.phase = ScanPhase::RoundRunning;
        Ok(summary)
    }

    /// Run rounds until shutdown, pacing them by `min_round_interval`.
    ///
    /// Returns the first round-level error.
    pub async fn run(&mut self) -> Result<(), ScanError> {
        loop {
            if self.shutdown_requested() {
                self.phase = ScanPhase::Stopped;
                return Ok(());
            }

            let started = tokio::time::Instant::now();
            self.run_round().await?;

            let rest = self.config.min_round_interval().saturating_sub(started.elapsed());
            if !rest.is_zero() {
                self.pause(rest).await;
            }
        }
    }

    /// Bootstrap, then run rounds forever, restarting after fatal errors.
    ///
    /// In-memory state survives restarts. Returns the number of completed
    /// rounds once shutdown is requested.
    pub async fn run_forever(&mut self) -> u64 {
        self.start().await;

        while let Err(err) = self.run().await {
            error!(
                %err,
                round = self.rounds + 1,
                backoff_secs = self.config.restart_backoff_secs,
                "Scan round failed, restarting"
            );
            self.pause(self.config.restart_backoff()).await;
        }

        info!(rounds = self.rounds, "Scanner stopped");
        self.rounds
    }

    fn apply_outcome(
        &mut self,
        candidate: &PeerIdentifier,
        outcome: ProbeOutcome,
        summary: &mut RoundSummary,
    ) {
        let verdict = match outcome {
            ProbeOutcome::Classified(verdict) => verdict,
            ProbeOutcome::Unreachable(_) => {
                summary.unreachable += 1;
                return;
            }
        };

        match self
            .state
            .merge(candidate, verdict, self.config.invalid_after_strikes)
        {
            MergeOutcome::NewValid => {
                info!(peer = %candidate, "WS peer found");
                summary.new_valid += 1;
            }
            MergeOutcome::Revalidated => {
                info!(peer = %candidate, "Previously invalid peer now exposes WS");
                summary.revalidated += 1;
            }
            MergeOutcome::NewInvalid => summary.new_invalid += 1,
            MergeOutcome::Strike(strikes) => {
                debug!(peer = %candidate, strikes, "No WS address, strike recorded");
            }
            MergeOutcome::Unchanged => {}
        }
    }

    /// Re-probe a window of known-invalid peers, promoting any now valid.
    async fn revalidate(&mut self, summary: &mut RoundSummary) {
        let invalid = self.state.known_invalid().as_slice();
        let count = self.config.revalidate_per_round.min(invalid.len());
        if count == 0 {
            return;
        }

        let start = self.rng.random_usize(invalid.len());
        let picked: Vec<PeerIdentifier> = (0..count)
            .map(|i| invalid[(start + i) % invalid.len()].clone())
            .collect();
        let limit = self.config.call_deadline();

        for peer in &picked {
            if self.shutdown_requested() {
                break;
            }
            let outcome = probe(&*self.overlay, peer, &self.config.transport_marker, limit).await;
            if let ProbeOutcome::Classified(verdict @ Classification::Valid(_)) = outcome {
                self.apply_outcome(peer, ProbeOutcome::Classified(verdict), summary);
            }
        }
    }

    /// Sleep for `duration`, returning early if shutdown is requested.
    async fn pause(&self, duration: Duration) {
        let mut shutdown = self.shutdown.clone();
        tokio::select! {
            _ = tokio::time::sleep(duration) => {}
            Ok(_) = shutdown.wait_for(|stop| *stop) => {}
        }
    }
}
