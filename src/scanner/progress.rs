//! Periodic progress reporting.
//!
//! The monitor samples the aggregator on a fixed interval and turns the
//! difference between two samples into a throughput figure.

use crate::scanner::aggregator::Aggregator;
use crate::scanner::traits::ProbeOutcome;
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// One progress sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProgressReport {
    pub completed: u64,
    pub total: u64,
    pub open: u64,
    /// Completion in percent.
    pub percent: f64,
    /// Probes per second over the last interval.
    pub rate: f64,
}

impl ProgressReport {
    fn new(completed: u64, previous: u64, total: u64, open: u64, interval: Duration) -> Self {
        let percent = if total == 0 {
            100.0
        } else {
            completed as f64 / total as f64 * 100.0
        };
        let rate = completed.saturating_sub(previous) as f64 / interval.as_secs_f64();
        Self {
            completed,
            total,
            open,
            percent,
            rate,
        }
    }

    /// Whether every task has been accounted for.
    pub fn is_complete(&self) -> bool {
        self.completed >= self.total
    }
}

/// Receives progress reports.
pub trait ProgressSink: Send + Sync {
    fn report(&self, report: &ProgressReport);

    /// Called once after the last report of a finished scan.
    fn finish(&self) {}

    /// Called once when the scan is cancelled; no report follows.
    fn abandon(&self) {}

    /// Called for every open endpoint as it is recorded.
    fn open_port(&self, _outcome: &ProbeOutcome) {}
}

/// Renders progress on an `indicatif` bar.
#[derive(Debug, Clone)]
pub struct BarSink {
    bar: ProgressBar,
}

impl BarSink {
    /// Create a bar for `total` probes drawn on stderr.
    pub fn new(total: u64) -> Self {
        let bar = ProgressBar::with_draw_target(Some(total), ProgressDrawTarget::stderr());
        if let Ok(style) = ProgressStyle::default_bar().template(
            "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg}",
        ) {
            bar.set_style(style.progress_chars("=>-"));
        }
        Self { bar }
    }
}

impl ProgressSink for BarSink {
    fn report(&self, report: &ProgressReport) {
        self.bar.set_position(report.completed);
        self.bar.set_message(format!(
            "open: {} | rate: {:.0} probes/sec",
            report.open, report.rate
        ));
    }

    fn finish(&self) {
        self.bar.finish();
    }

    fn abandon(&self) {
        self.bar.abandon_with_message("cancelled");
    }

    fn open_port(&self, outcome: &ProbeOutcome) {
        // Printed above the bar so it is not overdrawn.
        self.bar
            .println(format!("[+] {}:{} - {}", outcome.host, outcome.port, outcome.status));
    }
}

/// Samples an aggregator until the scan is complete.
#[derive(Debug)]
pub struct ProgressMonitor {
    handle: JoinHandle<()>,
    done: CancellationToken,
}

impl ProgressMonitor {
    /// Spawn the monitor loop.
    ///
    /// The loop stops once `total` probes are counted, when `cancel` fires
    /// (without further reports), or when `finish` is called.
    pub fn spawn(
        aggregator: Arc<Aggregator>,
        total: u64,
        interval: Duration,
        sink: Arc<dyn ProgressSink>,
        cancel: CancellationToken,
    ) -> Self {
        let done = CancellationToken::new();
        let handle = tokio::spawn(monitor_loop(
            aggregator,
            total,
            interval,
            sink,
            cancel,
            done.clone(),
        ));
        Self { handle, done }
    }

    /// Take a final sample and wait for the loop to stop.
    pub async fn finish(self) {
        self.done.cancel();
        if let Err(e) = self.handle.await {
            debug!(error = %e, "progress monitor task failed");
        }
    }
}

async fn monitor_loop(
    aggregator: Arc<Aggregator>,
    total: u64,
    interval: Duration,
    sink: Arc<dyn ProgressSink>,
    cancel: CancellationToken,
    done: CancellationToken,
) {
    let mut ticker = interval_at(Instant::now() + interval, interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut previous = 0u64;
    let mut last_tick = Instant::now();

    loop {
        let finishing = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!("progress monitor cancelled");
                sink.abandon();
                return;
            }
            _ = done.cancelled() => true,
            _ = ticker.tick() => false,
        };

        let snapshot = aggregator.snapshot();
        // The final sample may come early; measure the real span.
        let span = if finishing {
            last_tick.elapsed().max(Duration::from_millis(1))
        } else {
            interval
        };
        last_tick = Instant::now();

        let report = ProgressReport::new(
            snapshot.total_completed,
            previous,
            total,
            snapshot.open,
            span,
        );
        sink.report(&report);
        previous = snapshot.total_completed;

        if finishing || report.is_complete() {
            sink.finish();
            return;
        }
    }
}
