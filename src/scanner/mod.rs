//! Scanner module - probes, workers and the scan session that drives them.
//!
//! A `ScanSession` expands its targets, feeds `ProbeTask`s through the
//! optional rate limiter into a bounded `WorkerPool`, and every worker reports
//! its `ProbeOutcome` to the shared `Aggregator`. A `ProgressMonitor` samples
//! the aggregator while the scan runs.

pub mod aggregator;
pub mod pool;
pub mod progress;
pub mod rate_limiter;
pub mod session;
pub mod tcp;
pub mod traits;

pub use aggregator::{AggregateSnapshot, Aggregator};
pub use pool::WorkerPool;
pub use progress::{BarSink, ProgressMonitor, ProgressReport, ProgressSink};
pub use rate_limiter::RateLimiter;
pub use session::{ScanSession, SessionState};
pub use tcp::TcpProber;
pub use traits::{ProbeOutcome, ProbeStatus, ProbeTask, Prober, ScanConfig};
