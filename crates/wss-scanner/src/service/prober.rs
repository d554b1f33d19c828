//! Capability probing for a single candidate.

use std::time::Duration;

use tracing::debug;

use crate::domain::{classify, Classification, OverlayError, PeerIdentifier};
use crate::ports::Overlay;

/// Result of probing one candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// Addresses were resolved and classified.
    Classified(Classification),
    /// Addresses could not be resolved; the candidate stays unclassified.
    Unreachable(OverlayError),
}

/// Resolve `candidate`'s addresses and classify them against `marker`.
///
/// Resolution failures and timeouts are reported as `Unreachable` rather
/// than propagated, so one bad candidate never aborts the round.
pub async fn probe<O: Overlay + ?Sized>(
    overlay: &O,
    candidate: &PeerIdentifier,
    marker: &str,
    limit: Duration,
) -> ProbeOutcome {
    match tokio::time::timeout(limit, overlay.resolve_addresses(candidate)).await {
        Ok(Ok(addrs)) => ProbeOutcome::Classified(classify(candidate, &addrs, marker)),
        Ok(Err(err)) => {
            debug!(peer = %candidate, %err, "address resolution failed");
            ProbeOutcome::Unreachable(err)
        }
        Err(_) => {
            debug!(peer = %candidate, "address resolution timed out");
            ProbeOutcome::Unreachable(OverlayError::Timeout)
        }
    }
}
