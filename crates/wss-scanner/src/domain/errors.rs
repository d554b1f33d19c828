//! # Domain Errors
//!
//! Overlay failures are all "peer unreachable" class errors: expected,
//! isolated to the peer that caused them, retried whenever that peer
//! comes up again. Store and config failures are reported to the caller.

use thiserror::Error;

/// Failures reported by the DHT overlay collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OverlayError {
    /// The call did not settle within the configured query timeout.
    #[error("overlay operation timed out")]
    Timeout,

    /// The peer could not be reached.
    #[error("peer unreachable: {0}")]
    Unreachable(String),

    /// The DHT lookup finished without locating the peer.
    #[error("peer not found in the DHT")]
    NotFound,

    /// An identifier or address could not be interpreted.
    #[error("malformed input: {0}")]
    Malformed(String),

    /// Dialling a multiaddress failed.
    #[error("dial failed: {0}")]
    Dial(String),

    /// The transport stack could not be built.
    #[error("transport setup failed: {0}")]
    Transport(String),

    /// The overlay driver has stopped.
    #[error("overlay driver closed")]
    Closed,
}

/// Failures of the snapshot store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No snapshot has been written under this name yet.
    #[error("snapshot {0} not found")]
    NotFound(String),

    /// Reading or writing the snapshot failed.
    #[error("snapshot {name} I/O error: {source}")]
    Io {
        /// Snapshot name.
        name: String,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The snapshot is not valid JSON or has the wrong shape.
    #[error("snapshot {name} is malformed: {source}")]
    Serde {
        /// Snapshot name.
        name: String,
        /// Underlying error.
        #[source]
        source: serde_json::Error,
    },
}

/// Errors that can occur during config loading.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// File I/O error.
    #[error("Failed to read {path}: {error}")]
    Io {
        /// Path of the file that failed to load.
        path: String,
        /// Error message from the I/O operation.
        error: String,
    },
    /// TOML parsing error.
    #[error("Failed to parse config: {0}")]
    Parse(String),
    /// A value is out of range.
    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Round-level failures that abort the current round.
///
/// Per-peer failures never show up here; they are isolated where they occur.
#[derive(Debug, Error)]
pub enum ScanError {
    /// The overlay could not list connected peers.
    #[error("overlay error: {0}")]
    Overlay(#[from] OverlayError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overlay_error_display() {
        assert_eq!(OverlayError::Timeout.to_string(), "overlay operation timed out");
        assert_eq!(
            OverlayError::Dial("connection refused".into()).to_string(),
            "dial failed: connection refused"
        );
        assert_eq!(OverlayError::NotFound.to_string(), "peer not found in the DHT");
    }

    #[test]
    fn test_scan_error_wraps_overlay() {
        let err: ScanError = OverlayError::Closed.into();
        assert!(err.to_string().contains("overlay driver closed"));
    }

    #[test]
    fn test_store_error_names_snapshot() {
        let err = StoreError::NotFound("ws-peers.json".into());
        assert!(err.to_string().contains("ws-peers.json"));
    }
}
