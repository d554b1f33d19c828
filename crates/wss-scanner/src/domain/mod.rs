//! Domain Layer - Pure scanning logic with no I/O
//!
//! This module contains:
//! - Peer identifiers, multiaddresses and classification records
//! - The insertion-ordered known sets and the process-wide scan state
//! - The seed sampler
//! - Address classification against the transport marker

pub mod classifier;
pub mod errors;
pub mod sampler;
pub mod state;
pub mod types;

pub use classifier::classify;
pub use errors::{ConfigError, OverlayError, ScanError, StoreError};
pub use sampler::sample;
pub use state::{KnownSet, ScanState};
pub use types::{
    Classification, ClassificationRecord, MergeOutcome, MultiAddress, PeerIdentifier,
    RoundSummary,
};
