//! # Scan Service
//!
//! Drives the scan loop: bootstrap once, then repeat sample → discover →
//! probe → persist until shutdown is requested.
//!
//! The free functions (`connect_all`, `discover`, `probe`, `load_state`,
//! `save_state`) are the individual stages; `ScanService` owns the state
//! and sequences them.

// Semantic submodules
mod bootstrap;
mod core;
mod discovery;
mod persistence;
mod prober;
mod round;

// Re-export public API
pub use bootstrap::{connect_all, BootstrapReport};
pub use self::core::{ScanPhase, ScanService};
pub use discovery::discover;
pub use persistence::{load_state, save_state, KNOWN_INVALID_FILE, KNOWN_VALID_FILE, WS_PEERS_FILE};
pub use prober::{probe, ProbeOutcome};
