//! Probe abstraction and the data that flows through the scan engine.
//!
//! Defines the `Prober` trait implemented by the TCP connect prober, the
//! immutable `ProbeTask`/`ProbeOutcome` records and the engine configuration.

use crate::types::Port;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};
use std::fmt;
use std::net::IpAddr;
use std::time::Duration;

/// Status of a probed endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProbeStatus {
    /// The TCP handshake completed.
    Open,
    /// The connection attempt failed for a reason other than a timeout.
    Closed,
    /// The deadline elapsed before the handshake completed.
    Filtered,
    /// No connection attempt could be made (e.g. out of sockets).
    Error,
}

impl fmt::Display for ProbeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Open => write!(f, "open"),
            Self::Closed => write!(f, "closed"),
            Self::Filtered => write!(f, "filtered"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// One (host, port) pair waiting to be probed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProbeTask {
    pub host: IpAddr,
    pub port: Port,
}

impl ProbeTask {
    pub fn new(host: IpAddr, port: Port) -> Self {
        Self { host, port }
    }
}

impl fmt::Display for ProbeTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Result of probing a single endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProbeOutcome {
    /// Probed host.
    pub host: IpAddr,
    /// Probed port.
    pub port: Port,
    /// Classified status.
    pub status: ProbeStatus,
    /// When the attempt started.
    pub timestamp: DateTime<Utc>,
    /// Wall-clock time from attempt start to classification.
    #[serde(rename = "duration_ms", serialize_with = "serialize_millis")]
    pub duration: Duration,
    /// Underlying failure, if any.
    #[serde(rename = "error", skip_serializing_if = "Option::is_none")]
    pub error_detail: Option<String>,
}

impl ProbeOutcome {
    /// Create an outcome for `task` that started at `timestamp`.
    pub fn new(task: ProbeTask, status: ProbeStatus, timestamp: DateTime<Utc>) -> Self {
        Self {
            host: task.host,
            port: task.port,
            status,
            timestamp,
            duration: Duration::ZERO,
            error_detail: None,
        }
    }

    /// Set the measured duration.
    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    /// Set the failure detail.
    pub fn with_error(mut self, detail: impl Into<String>) -> Self {
        self.error_detail = Some(detail.into());
        self
    }

    /// Check if the endpoint accepted the connection.
    pub fn is_open(&self) -> bool {
        self.status == ProbeStatus::Open
    }
}

pub(crate) fn serialize_millis<S: Serializer>(duration: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_f64(duration.as_nanos() as f64 / 1_000_000.0)
}

/// Engine configuration, trusted once it reaches the scanner.
#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// Number of concurrent worker loops.
    pub workers: usize,
    /// Per-probe connect deadline.
    pub timeout: Duration,
    /// Maximum task submissions per second, 0 for unlimited.
    pub rate_limit: u32,
    /// Progress sampling interval, `None` when progress is not reported.
    pub progress_interval: Option<Duration>,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            workers: 100,
            timeout: Duration::from_secs(2),
            rate_limit: 0,
            progress_interval: None,
        }
    }
}

impl ScanConfig {
    /// Default progress sampling interval.
    pub const DEFAULT_PROGRESS_INTERVAL: Duration = Duration::from_secs(5);

    /// Set the worker count.
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    /// Set the timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the rate limit.
    pub fn with_rate_limit(mut self, rate: u32) -> Self {
        self.rate_limit = rate;
        self
    }

    /// Enable progress reporting at the given interval.
    pub fn with_progress(mut self, interval: Duration) -> Self {
        self.progress_interval = Some(interval);
        self
    }
}

/// Trait for probe implementations.
///
/// A prober is shared by every worker of a pool, so implementations must not
/// keep per-call mutable state.
#[async_trait]
pub trait Prober: Send + Sync {
    /// Probe a single endpoint. Failures are encoded in the outcome status.
    async fn probe(&self, task: ProbeTask) -> ProbeOutcome;
}
