//! Unified error handling for Clevofan
//!
//! A single error type shared by the EC access layer, the control loop and the
//! command line front end. Built on thiserror for the Display/Error impls.

use std::io;
use std::path::PathBuf;

/// Result type alias using ClevofanError
pub type Result<T> = std::result::Result<T, ClevofanError>;

/// Unified error type for all Clevofan operations
#[derive(thiserror::Error, Debug)]
pub enum ClevofanError {
    // ============================================================================
    // Port Access Errors
    // ============================================================================
    #[error("Permission denied for EC port {port:#04x}: {source}")]
    PermissionDenied {
        port: u16,
        source: io::Error,
    },

    #[error(
        "wait_ec error on port {port:#04x}, data={data:#04x}, flag={flag:#04x}, value={value:#04x}"
    )]
    Timeout {
        port: u16,
        flag: u8,
        value: u8,
        /// Last status byte observed before giving up
        data: u8,
    },

    #[error("Port I/O not supported: {0}")]
    NotSupported(String),

    // ============================================================================
    // Bulk Snapshot Errors
    // ============================================================================
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Unable to open EC image {path}: {source}")]
    SnapshotOpen {
        path: PathBuf,
        source: io::Error,
    },

    #[error("Wrong EC size: expected {expected} bytes, got {actual}")]
    SizeMismatch {
        expected: usize,
        actual: usize,
    },

    // ============================================================================
    // Validation Errors
    // ============================================================================
    #[error("Wrong fan duty: {value} (must be 0-100)")]
    InvalidDuty {
        value: i64,
    },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    // ============================================================================
    // Process Errors
    // ============================================================================
    #[error("Failed to serialize status: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Signal handler error: {0}")]
    Signal(String),
}

impl ClevofanError {
    /// Create an invalid argument error from a string
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    /// Create a signal registration error from a string
    pub fn signal(msg: impl Into<String>) -> Self {
        Self::Signal(msg.into())
    }

    /// Whether the control loop may skip the current tick and carry on.
    ///
    /// Only a failed bulk read and a short/long bulk read are soft. Failing to
    /// open the EC image at all stops the loop, as do port faults.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Io(_) | Self::SizeMismatch { .. })
    }

    /// Whether this is a handshake timeout
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}
