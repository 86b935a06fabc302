//! Error types for the acquisition pipeline.

use std::path::PathBuf;
use sysinfo::Pid;

/// Result type for registry operations.
pub type Result<T> = std::result::Result<T, MonitorError>;

/// Failures reported by a [`MetricSource`](crate::metrics::source::MetricSource).
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SourceError {
    /// The process exited between enumeration and the read
    #[error("process {pid} is gone")]
    ProcessGone { pid: Pid },

    /// The platform refused to expose the counters for this process
    #[error("access denied reading process {pid}")]
    AccessDenied { pid: Pid },

    /// The live process table could not be listed
    #[error("cannot enumerate processes: {reason}")]
    Enumeration { reason: String },

    /// The running platform is not supported by the metric backend
    #[error("metric source not supported on this platform")]
    Unsupported,

    /// Any other platform failure
    #[error("platform error: {reason}")]
    Platform { reason: String },
}

impl SourceError {
    /// Per-process failures are expected and never abort a cycle.
    pub fn is_per_process(&self) -> bool {
        matches!(
            self,
            SourceError::ProcessGone { .. } | SourceError::AccessDenied { .. }
        )
    }
}

/// Failures surfaced to whatever invoked a cycle.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MonitorError {
    /// Listing live processes failed; the previous process list stays published
    #[error("process enumeration failed: {0}")]
    Enumeration(#[source] SourceError),

    /// Reading system totals failed; the previous system snapshot stays published
    #[error("system totals unavailable: {0}")]
    SystemTotals(#[source] SourceError),
}

/// Configuration loading and validation errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// I/O operation failed
    #[error("failed to read config {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// TOML could not be parsed into a config
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// A value is out of range
    #[error("invalid config value for {field}: {reason}")]
    Invalid {
        field: &'static str,
        reason: String,
    },
}
