//! # Driving Ports (Inbound API)
//!
//! Read-only view of the scanner exposed to the host application.

use crate::domain::{ClassificationRecord, PeerIdentifier};

/// Query API over the scanner's accumulated results.
///
/// # Example
///
/// ```rust,ignore
/// use wss_scanner::ports::ScannerApi;
///
/// fn report<T: ScannerApi>(scanner: &T) {
///     println!("{} websocket peers after {} rounds",
///         scanner.known_valid().len(), scanner.rounds_completed());
/// }
/// ```
pub trait ScannerApi {
    /// Peers confirmed to expose the target transport, oldest first.
    fn known_valid(&self) -> &[PeerIdentifier];

    /// Peers probed and found without it, oldest first.
    fn known_invalid(&self) -> &[PeerIdentifier];

    /// Every matching address recorded so far.
    fn records(&self) -> &[ClassificationRecord];

    /// Rounds completed since the process started.
    fn rounds_completed(&self) -> u64;
}
