//! Bootstrap connector: dial the well-known peers once at startup.

use std::time::Duration;

use tracing::{info, warn};

use crate::domain::{MultiAddress, OverlayError};
use crate::ports::Overlay;

/// Outcome of the bootstrap pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BootstrapReport {
    /// Addresses that connected.
    pub connected: Vec<MultiAddress>,
    /// Addresses that failed, with the reason.
    pub failed: Vec<(MultiAddress, OverlayError)>,
}

/// Dial each address once, in order.
///
/// Failures are logged and recorded; they never stop the remaining dials.
pub async fn connect_all<O: Overlay + ?Sized>(
    overlay: &O,
    addrs: &[MultiAddress],
    limit: Duration,
) -> BootstrapReport {
    let mut report = BootstrapReport::default();

    for addr in addrs {
        let result = match tokio::time::timeout(limit, overlay.connect(addr)).await {
            Ok(result) => result,
            Err(_) => Err(OverlayError::Timeout),
        };
        match result {
            Ok(()) => {
                info!(%addr, "Connected to bootstrap peer");
                report.connected.push(addr.clone());
            }
            Err(err) => {
                warn!(%addr, %err, "Could not connect to bootstrap peer");
                report.failed.push((addr.clone(), err));
            }
        }
    }

    report
}
