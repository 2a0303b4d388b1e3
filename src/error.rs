//! Error types for netscout.
//!
//! Uses `thiserror` for ergonomic error definitions. Probe failures are never
//! errors here: they are recorded as `closed`, `filtered` or `error` outcomes.

use crate::types::{PortError, TargetError};
use std::path::PathBuf;
use thiserror::Error;

/// Session-level errors raised by the scan engine.
#[derive(Error, Debug)]
pub enum ScanError {
    #[error(transparent)]
    Target(#[from] TargetError),

    #[error(transparent)]
    Port(#[from] PortError),

    #[error("scan cancelled")]
    Cancelled,

    #[error("task source is closed")]
    SourceClosed,

    #[error("scan session is {0}, expected idle")]
    InvalidState(crate::scanner::SessionState),

    #[error(transparent)]
    Aggregate(#[from] AggregateError),
}

impl ScanError {
    /// Whether this error is the cooperative cancellation of a scan.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

/// Errors raised by the result aggregator.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AggregateError {
    #[error("aggregator is closed")]
    Closed,

    #[error("internal inconsistency: {0}")]
    InternalInconsistency(&'static str),
}

/// Errors raised while loading or validating configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("could not determine the configuration directory")]
    DirectoryNotFound,

    #[error("failed to read {path}: {reason}")]
    ReadFailed { path: PathBuf, reason: String },

    #[error("invalid settings file: {0}")]
    InvalidFormat(String),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Result type alias for scan operations.
pub type ScanResult<T> = Result<T, ScanError>;

/// Result type alias for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;
