//! # netscout - a concurrent TCP connect scanner
//!
//! netscout expands a set of targets (IP addresses and CIDR blocks) and a port
//! specification into (host, port) probe tasks, then runs a full TCP handshake
//! against each one with a bounded pool of async workers.
//!
//! ## Features
//!
//! - **Bounded concurrency**: a fixed worker pool fed by a bounded queue
//! - **Rate limiting**: optional evenly spaced dispatch slots
//! - **Graceful cancellation**: in-flight probes finish and are reported
//! - **Progress reporting**: periodic throughput samples on a progress bar
//! - **Multiple Output Formats**: text, JSON, and CSV
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use netscout::scanner::{ScanConfig, ScanSession};
//! use std::time::Duration;
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn run() -> Result<(), netscout::ScanError> {
//! let config = ScanConfig::default()
//!     .with_workers(50)
//!     .with_timeout(Duration::from_millis(500));
//! let mut session = ScanSession::new(&["192.168.1.0/28"], "22,80,443", config)?;
//!
//! session.scan(CancellationToken::new()).await?;
//! for outcome in session.all_results() {
//!     if outcome.is_open() {
//!         println!("{}:{} is open", outcome.host, outcome.port);
//!     }
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - [`types`] - Ports, targets and their expanders
//! - [`scanner`] - Prober, worker pool, rate limiter, aggregator, progress and the scan session
//! - [`config`] - Settings file and validated scan options
//! - [`output`] - Result formatters and status lines
//! - [`cli`] - Command-line interface
//! - [`error`] - Error types

pub mod cli;
pub mod config;
pub mod error;
pub mod output;
pub mod scanner;
pub mod types;

// Re-export commonly used types
pub use error::{AggregateError, ConfigError, ScanError};
pub use scanner::{ProbeOutcome, ProbeStatus, ProbeTask, Prober, ScanConfig, ScanSession};
pub use types::{expand_ports, expand_targets, Port, PortSpec, SessionId, TargetSpec};
