//! Error types for the sync core.
//!
//! Nothing in this crate is fatal to the watch app. Errors are returned so the
//! caller can log them and let the user retry (usually by reopening a view).
//!
//! ## Error Categories
//!
//! - **Transport Errors**: busy outbox, oversize messages, closed channels
//! - **Request Errors**: invalid request arguments rejected at the boundary
//! - **Parse Errors**: date strings and structured messages that do not decode
//! - **Config Errors**: unreadable or invalid configuration files
//!
//! ```rust
//! use flashback::SyncError;
//!
//! let error = SyncError::busy();
//! if error.is_retryable() {
//!     for suggestion in error.recovery_suggestions() {
//!         println!("  - {}", suggestion);
//!     }
//! }
//! ```

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for sync operations.
pub type Result<T, E = SyncError> = std::result::Result<T, E>;

/// Main error type for sync operations.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum SyncError {
    #[error("Transport failure: {reason}")]
    Transport {
        reason: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Outbox is busy, message not queued")]
    Busy,

    #[error("Message of {size} bytes exceeds {direction} capacity of {capacity} bytes")]
    MessageTooLarge { size: usize, capacity: usize, direction: &'static str },

    #[error("Message channel closed")]
    ChannelClosed,

    #[error("Transport used before open()")]
    NotOpen,

    #[error("Invalid request: {details}")]
    InvalidRequest { details: String },

    #[error("Parse error in {context}: {details}")]
    Parse { context: String, details: String },

    #[error("Configuration error: {details}")]
    Config { details: String },

    #[error("Config file error: {path}")]
    File {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl SyncError {
    /// Returns whether this error is potentially recoverable through retry.
    pub fn is_retryable(&self) -> bool {
        match self {
            SyncError::Transport { .. } => true,
            SyncError::Busy => true,
            SyncError::MessageTooLarge { .. } => false,
            SyncError::ChannelClosed => false,
            SyncError::NotOpen => false,
            SyncError::InvalidRequest { .. } => false,
            SyncError::Parse { .. } => false,
            SyncError::Config { .. } => false,
            SyncError::File { .. } => false,
        }
    }

    /// Returns suggested recovery actions for this error.
    pub fn recovery_suggestions(&self) -> Vec<&'static str> {
        match self {
            SyncError::Transport { .. } => vec![
                "Check the phone is connected over Bluetooth",
                "Reopen the view to request the data again",
            ],
            SyncError::Busy => vec![
                "Wait for the previous message to be acknowledged",
                "Reopen the view to request the data again",
            ],
            SyncError::MessageTooLarge { .. } => vec![
                "Raise the inbox or outbox capacity in the sync config",
                "Split the payload into several messages on the phone",
            ],
            SyncError::ChannelClosed => vec![
                "Restart the companion app on the phone",
                "Restart the watch app",
            ],
            SyncError::NotOpen => vec!["Call open() on the transport before sending"],
            SyncError::InvalidRequest { .. } => vec![
                "Check the race round is within the season",
                "Use the round from the cached race record",
            ],
            SyncError::Parse { .. } => vec![
                "Check the phone sends ISO dates (YYYY-MM-DD)",
                "Verify the phone and watch agree on the wire format",
            ],
            SyncError::Config { .. } => vec![
                "Check config values are positive and within limits",
                "Remove the config file to fall back to defaults",
            ],
            SyncError::File { .. } => vec![
                "Check the config file exists and is readable",
                "Check file permissions",
            ],
        }
    }

    /// Helper constructor for transport errors.
    pub fn transport(reason: impl Into<String>) -> Self {
        SyncError::Transport { reason: reason.into(), source: None }
    }

    /// Helper constructor for transport errors with source.
    pub fn transport_with_source(
        reason: impl Into<String>,
        source: Box<dyn std::error::Error + Send + Sync>,
    ) -> Self {
        SyncError::Transport { reason: reason.into(), source: Some(source) }
    }

    /// Helper constructor for a busy outbox.
    pub fn busy() -> Self {
        SyncError::Busy
    }

    /// Helper constructor for rejected requests.
    pub fn invalid_request(details: impl Into<String>) -> Self {
        SyncError::InvalidRequest { details: details.into() }
    }

    /// Helper constructor for parse errors.
    pub fn parse(context: impl Into<String>, details: impl Into<String>) -> Self {
        SyncError::Parse { context: context.into(), details: details.into() }
    }

    /// Helper constructor for config errors.
    pub fn config(details: impl Into<String>) -> Self {
        SyncError::Config { details: details.into() }
    }

    /// Helper constructor for config file errors with path context.
    pub fn file_error(path: PathBuf, source: std::io::Error) -> Self {
        SyncError::File { path, source }
    }
}

impl From<serde_yaml_ng::Error> for SyncError {
    fn from(err: serde_yaml_ng::Error) -> Self {
        SyncError::Config { details: format!("YAML parsing failed: {}", err) }
    }
}
