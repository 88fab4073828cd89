//! Session configuration
//!
//! Every field has a default, so an empty YAML document is a valid config.
//!
//! ```yaml
//! inbox_capacity: 2048
//! outbox_capacity: 128
//! queue_depth: 16
//! generation_tagging: true
//! max_driver_errors: 10
//! retry_backoff_ms: 50
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{Result, SyncError};

/// Smallest inbox that still fits a count reply
const MIN_INBOX_CAPACITY: usize = 32;

/// Smallest outbox that still fits a race details request
const MIN_OUTBOX_CAPACITY: usize = 32;

/// Tunables for a [`SyncSession`](crate::SyncSession) and its driver
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SyncConfig {
    /// Inbound buffer size in bytes
    #[serde(default = "default_inbox_capacity")]
    pub inbox_capacity: usize,

    /// Outbound buffer size in bytes
    #[serde(default = "default_outbox_capacity")]
    pub outbox_capacity: usize,

    /// Messages queued per direction on an in-memory link
    #[serde(default = "default_queue_depth")]
    pub queue_depth: usize,

    /// Tag requests with a generation and drop replies to older ones
    #[serde(default = "default_generation_tagging")]
    pub generation_tagging: bool,

    /// Consecutive source errors before the driver stops
    #[serde(default = "default_max_driver_errors")]
    pub max_driver_errors: u32,

    /// Base delay of the driver's exponential backoff
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            inbox_capacity: default_inbox_capacity(),
            outbox_capacity: default_outbox_capacity(),
            queue_depth: default_queue_depth(),
            generation_tagging: default_generation_tagging(),
            max_driver_errors: default_max_driver_errors(),
            retry_backoff_ms: default_retry_backoff_ms(),
        }
    }
}

fn default_inbox_capacity() -> usize {
    2048
}
fn default_outbox_capacity() -> usize {
    128
}
fn default_queue_depth() -> usize {
    16
}
fn default_generation_tagging() -> bool {
    true
}
fn default_max_driver_errors() -> u32 {
    10
}
fn default_retry_backoff_ms() -> u64 {
    50
}

impl SyncConfig {
    /// Parse and validate a YAML document
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: Self = if yaml.trim().is_empty() {
            Self::default()
        } else {
            serde_yaml_ng::from_str(yaml)?
        };
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a YAML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path)
            .map_err(|e| SyncError::file_error(path.to_path_buf(), e))?;
        debug!(path = %path.display(), "Loading sync config");
        Self::from_yaml_str(&yaml)
    }

    pub fn validate(&self) -> Result<()> {
        if self.inbox_capacity < MIN_INBOX_CAPACITY {
            return Err(SyncError::config(format!(
                "inbox_capacity must be at least {} bytes, got {}",
                MIN_INBOX_CAPACITY, self.inbox_capacity
            )));
        }
        if self.outbox_capacity < MIN_OUTBOX_CAPACITY {
            return Err(SyncError::config(format!(
                "outbox_capacity must be at least {} bytes, got {}",
                MIN_OUTBOX_CAPACITY, self.outbox_capacity
            )));
        }
        if self.queue_depth == 0 {
            return Err(SyncError::config("queue_depth must be positive"));
        }
        if self.max_driver_errors == 0 {
            return Err(SyncError::config("max_driver_errors must be positive"));
        }
        Ok(())
    }

    /// Backoff before retrying after the `attempt`-th consecutive error
    ///
    /// Doubles per attempt, capped at 32 times the base delay.
    pub fn backoff(&self, attempt: u32) -> Duration {
        Duration::from_millis(self.retry_backoff_ms.saturating_mul(1 << attempt.min(5)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_are_valid() {
        let config = SyncConfig::default();
        assert_eq!(config.inbox_capacity, 2048);
        assert_eq!(config.outbox_capacity, 128);
        assert!(config.generation_tagging);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn empty_document_yields_defaults() {
        assert_eq!(SyncConfig::from_yaml_str("").unwrap(), SyncConfig::default());
    }

    #[test]
    fn partial_document_keeps_other_defaults() {
        let config = SyncConfig::from_yaml_str("inbox_capacity: 512\ngeneration_tagging: false\n").unwrap();
        assert_eq!(config.inbox_capacity, 512);
        assert!(!config.generation_tagging);
        assert_eq!(config.outbox_capacity, 128);
        assert_eq!(config.max_driver_errors, 10);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = SyncConfig::from_yaml_str("inbox_size: 10\n").unwrap_err();
        assert!(matches!(err, SyncError::Config { .. }));
    }

    #[test]
    fn tiny_buffers_fail_validation() {
        let err = SyncConfig::from_yaml_str("outbox_capacity: 4\n").unwrap_err();
        assert!(err.to_string().contains("outbox_capacity"));
    }

    #[test]
    fn backoff_doubles_then_caps() {
        let config = SyncConfig::default();
        assert_eq!(config.backoff(0), Duration::from_millis(50));
        assert_eq!(config.backoff(1), Duration::from_millis(100));
        assert_eq!(config.backoff(5), Duration::from_millis(1600));
        assert_eq!(config.backoff(12), Duration::from_millis(1600));
    }

    #[test]
    fn loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "queue_depth: 4").unwrap();
        writeln!(file, "retry_backoff_ms: 10").unwrap();

        let config = SyncConfig::from_file(file.path()).unwrap();
        assert_eq!(config.queue_depth, 4);
        assert_eq!(config.retry_backoff_ms, 10);
    }

    #[test]
    fn missing_file_is_a_file_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = SyncConfig::from_file(dir.path().join("absent.yaml")).unwrap_err();
        assert!(matches!(err, SyncError::File { .. }));
    }
}
