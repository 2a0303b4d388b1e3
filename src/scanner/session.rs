//! Scan session: the orchestrator control loop.
//!
//! A `ScanSession` expands its targets up front, then `scan` walks the
//! host×port cross product in host-major order, gating each submission on
//! the optional rate limiter and feeding the worker pool. Whatever way the
//! loop ends, the session drains the pool and the aggregator before
//! returning, so partial results are always complete for the tasks that were
//! dispatched.

use crate::error::{ScanError, ScanResult};
use crate::scanner::aggregator::{AggregateSnapshot, Aggregator};
use crate::scanner::pool::WorkerPool;
use crate::scanner::progress::{BarSink, ProgressMonitor, ProgressSink};
use crate::scanner::rate_limiter::RateLimiter;
use crate::scanner::tcp::TcpProber;
use crate::scanner::traits::{ProbeOutcome, ProbeTask, Prober, ScanConfig};
use crate::types::{expand_ports, expand_targets, Port, SessionId};
use std::fmt;
use std::net::IpAddr;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Lifecycle of a scan session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Running,
    Draining,
    Cancelled,
    Closed,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Running => write!(f, "running"),
            Self::Draining => write!(f, "draining"),
            Self::Cancelled => write!(f, "cancelled"),
            Self::Closed => write!(f, "closed"),
        }
    }
}

/// One scan over a fixed set of hosts and ports.
pub struct ScanSession {
    id: SessionId,
    hosts: Vec<IpAddr>,
    ports: Vec<Port>,
    config: ScanConfig,
    prober: Arc<dyn Prober>,
    progress_sink: Option<Arc<dyn ProgressSink>>,
    aggregator: Arc<Aggregator>,
    state: SessionState,
}

impl ScanSession {
    /// Expand `targets` and `ports` and prepare a TCP connect scan.
    ///
    /// Invalid targets or ports fail here, before anything is probed.
    pub fn new<S: AsRef<str>>(targets: &[S], ports: &str, config: ScanConfig) -> ScanResult<Self> {
        let hosts = expand_targets(targets)?;
        let ports = expand_ports(ports)?;
        let prober = Arc::new(TcpProber::new(config.timeout));
        Ok(Self::with_prober(hosts, ports, config, prober))
    }

    /// Prepare a session over already expanded hosts and ports.
    pub fn with_prober(
        hosts: Vec<IpAddr>,
        ports: Vec<Port>,
        config: ScanConfig,
        prober: Arc<dyn Prober>,
    ) -> Self {
        Self {
            id: SessionId::new(),
            hosts,
            ports,
            config,
            prober,
            progress_sink: None,
            aggregator: Arc::new(Aggregator::new()),
            state: SessionState::Idle,
        }
    }

    /// Send progress reports to `sink` instead of the default progress bar.
    pub fn with_progress_sink(mut self, sink: Arc<dyn ProgressSink>) -> Self {
        self.progress_sink = Some(sink);
        self
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn hosts(&self) -> &[IpAddr] {
        &self.hosts
    }

    pub fn ports(&self) -> &[Port] {
        &self.ports
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Number of probes this session dispatches when not cancelled.
    pub fn total_tasks(&self) -> u64 {
        self.hosts.len() as u64 * self.ports.len() as u64
    }

    /// Run the scan to completion or cancellation.
    ///
    /// Returns `Cancelled` if `cancel` fired; results gathered up to that
    /// point remain available through `final_summary` and `all_results`.
    pub async fn scan(&mut self, cancel: CancellationToken) -> ScanResult<()> {
        if self.state != SessionState::Idle {
            return Err(ScanError::InvalidState(self.state));
        }
        self.state = SessionState::Running;

        let total = self.total_tasks();
        info!(
            session = %self.id.short(),
            hosts = self.hosts.len(),
            ports = self.ports.len(),
            total,
            workers = self.config.workers,
            timeout = ?self.config.timeout,
            rate_limit = self.config.rate_limit,
            "starting scan"
        );

        let sink = self.config.progress_interval.map(|interval| {
            let sink = self
                .progress_sink
                .clone()
                .unwrap_or_else(|| Arc::new(BarSink::new(total)) as Arc<dyn ProgressSink>);
            (interval, sink)
        });

        self.aggregator
            .start_observed(sink.as_ref().map(|(_, sink)| Arc::clone(sink)));
        let mut pool = WorkerPool::start(
            self.config.workers,
            Arc::clone(&self.prober),
            Arc::clone(&self.aggregator),
            cancel.clone(),
        );
        let monitor = sink.map(|(interval, sink)| {
            ProgressMonitor::spawn(
                Arc::clone(&self.aggregator),
                total,
                interval,
                sink,
                cancel.clone(),
            )
        });
        let limiter = RateLimiter::new(self.config.rate_limit);

        let dispatched = self.dispatch(&pool, limiter.as_ref(), &cancel).await;
        pool.close_source();
        self.state = if dispatched.is_ok() {
            SessionState::Draining
        } else {
            SessionState::Cancelled
        };

        pool.join().await;

        // A cancel during the drain drops queued tasks, so it counts too.
        let outcome = match dispatched {
            Ok(()) if cancel.is_cancelled() => Err(ScanError::Cancelled),
            other => other,
        };
        if let Err(e) = &outcome {
            self.state = SessionState::Cancelled;
            warn!(session = %self.id.short(), error = %e, "scan stopped early");
        }

        self.aggregator.close().await?;
        if let Some(monitor) = monitor {
            monitor.finish().await;
        }

        self.state = SessionState::Closed;
        let summary = self.aggregator.snapshot();
        info!(
            session = %self.id.short(),
            completed = summary.total_completed,
            open = summary.open,
            elapsed = ?summary.elapsed,
            "scan finished"
        );

        outcome
    }

    /// Submit every task, host-major.
    async fn dispatch(
        &self,
        pool: &WorkerPool,
        limiter: Option<&RateLimiter>,
        cancel: &CancellationToken,
    ) -> ScanResult<()> {
        let mut submitted = 0u64;

        for &host in &self.hosts {
            for &port in &self.ports {
                if cancel.is_cancelled() {
                    debug!(submitted, "cancelled before dispatch");
                    return Err(ScanError::Cancelled);
                }
                if let Some(limiter) = limiter {
                    limiter.await_slot(cancel).await?;
                }
                pool.submit(ProbeTask::new(host, port)).await?;
                submitted += 1;
            }
        }

        debug!(submitted, "all tasks submitted");
        Ok(())
    }

    /// Current (or final) aggregate counters.
    pub fn final_summary(&self) -> AggregateSnapshot {
        self.aggregator.snapshot()
    }

    /// Every outcome, sorted by host then port.
    pub fn all_results(&self) -> Vec<ProbeOutcome> {
        self.aggregator.all_results()
    }
}

impl fmt::Debug for ScanSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScanSession")
            .field("id", &self.id)
            .field("hosts", &self.hosts.len())
            .field("ports", &self.ports.len())
            .field("config", &self.config)
            .field("state", &self.state)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scanner::progress::ProgressReport;
    use crate::scanner::traits::ProbeStatus;
    use async_trait::async_trait;
    use chrono::Utc;
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::{Duration, Instant};

    /// Records the order in which tasks reach the prober.
    struct RecordingProber {
        delay: Duration,
        seen: Mutex<Vec<ProbeTask>>,
        calls: AtomicUsize,
    }

    impl RecordingProber {
        fn new(delay: Duration) -> Arc<Self> {
            Arc::new(Self {
                delay,
                seen: Mutex::new(Vec::new()),
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl Prober for RecordingProber {
        async fn probe(&self, task: ProbeTask) -> ProbeOutcome {
            self.seen.lock().unwrap().push(task);
            self.calls.fetch_add(1, Ordering::SeqCst);
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            let status = if task.port.as_u16() % 2 == 0 {
                ProbeStatus::Open
            } else {
                ProbeStatus::Closed
            };
            ProbeOutcome::new(task, status, Utc::now())
        }
    }

    #[derive(Default)]
    struct CountingSink {
        reports: Mutex<Vec<ProgressReport>>,
        open: AtomicUsize,
    }

    impl ProgressSink for CountingSink {
        fn report(&self, report: &ProgressReport) {
            self.reports.lock().unwrap().push(*report);
        }

        fn open_port(&self, _outcome: &ProbeOutcome) {
            self.open.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn hosts(n: u8) -> Vec<IpAddr> {
        (1..=n).map(|d| IpAddr::from([10, 0, 0, d])).collect()
    }

    fn ports(list: &[u16]) -> Vec<Port> {
        list.iter().map(|&p| Port::new(p).unwrap()).collect()
    }

    #[test]
    fn test_invalid_input_fails_before_scanning() {
        let config = ScanConfig::default();
        assert!(matches!(
            ScanSession::new(&["nope"], "80", config.clone()),
            Err(ScanError::Target(_))
        ));
        assert!(matches!(
            ScanSession::new(&["127.0.0.1"], "0", config.clone()),
            Err(ScanError::Port(_))
        ));

        let session = ScanSession::new(&["10.0.0.0/30", "10.0.0.9"], "22,80", config).unwrap();
        assert_eq!(session.total_tasks(), 6);
        assert_eq!(session.state(), SessionState::Idle);
        assert_eq!(
            session.hosts(),
            &[
                IpAddr::from([10, 0, 0, 1]),
                IpAddr::from([10, 0, 0, 2]),
                IpAddr::from([10, 0, 0, 9])
            ]
        );
        assert_eq!(session.ports(), ports(&[22, 80]).as_slice());
    }

    #[tokio::test]
    async fn test_scan_completes_every_task_once() {
        let prober = RecordingProber::new(Duration::ZERO);
        let config = ScanConfig::default().with_workers(4);
        let mut session =
            ScanSession::with_prober(hosts(3), ports(&[22, 80, 443, 8080]), config, prober.clone());

        session.scan(CancellationToken::new()).await.unwrap();

        assert_eq!(session.state(), SessionState::Closed);
        let summary = session.final_summary();
        assert_eq!(summary.total_completed, 12);
        assert_eq!(summary.open, 9);
        assert_eq!(summary.closed, 3);

        let results = session.all_results();
        let unique: HashSet<(IpAddr, Port)> = results.iter().map(|o| (o.host, o.port)).collect();
        assert_eq!(unique.len(), 12);
        assert_eq!(results[0].host, IpAddr::from([10, 0, 0, 1]));
        assert_eq!(results[0].port.as_u16(), 22);
    }

    #[tokio::test]
    async fn test_single_worker_sees_host_major_order() {
        let prober = RecordingProber::new(Duration::ZERO);
        let config = ScanConfig::default().with_workers(1);
        let mut session =
            ScanSession::with_prober(hosts(2), ports(&[443, 80]), config, prober.clone());

        session.scan(CancellationToken::new()).await.unwrap();

        let seen: Vec<(IpAddr, u16)> = prober
            .seen
            .lock()
            .unwrap()
            .iter()
            .map(|t| (t.host, t.port.as_u16()))
            .collect();
        let a = IpAddr::from([10, 0, 0, 1]);
        let b = IpAddr::from([10, 0, 0, 2]);
        assert_eq!(seen, vec![(a, 443), (a, 80), (b, 443), (b, 80)]);
    }

    #[tokio::test]
    async fn test_scan_twice_is_rejected() {
        let prober = RecordingProber::new(Duration::ZERO);
        let mut session =
            ScanSession::with_prober(hosts(1), ports(&[80]), ScanConfig::default(), prober);

        session.scan(CancellationToken::new()).await.unwrap();
        assert!(matches!(
            session.scan(CancellationToken::new()).await,
            Err(ScanError::InvalidState(SessionState::Closed))
        ));
    }

    #[tokio::test]
    async fn test_cancel_mid_scan_keeps_partial_results() {
        let prober = RecordingProber::new(Duration::from_millis(20));
        let config = ScanConfig::default().with_workers(2);
        let ports: Vec<Port> = (1..=200).map(|p| Port::new(p).unwrap()).collect();
        let mut session = ScanSession::with_prober(hosts(1), ports, config, prober.clone());

        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(70)).await;
            trigger.cancel();
        });

        let result = session.scan(cancel).await;
        assert!(matches!(result, Err(ScanError::Cancelled)));
        assert_eq!(session.state(), SessionState::Closed);

        let results = session.all_results();
        let calls = prober.calls.load(Ordering::SeqCst);
        assert_eq!(results.len(), calls);
        assert!(!results.is_empty());
        assert!((results.len() as u64) < session.total_tasks());

        let unique: HashSet<Port> = results.iter().map(|o| o.port).collect();
        assert_eq!(unique.len(), results.len());
        assert_eq!(session.final_summary().total_completed, results.len() as u64);
    }

    #[tokio::test]
    async fn test_cancel_after_dispatch_is_still_cancelled() {
        // Capacity 20 holds every task, so dispatch is over before the cancel.
        let prober = RecordingProber::new(Duration::from_millis(50));
        let config = ScanConfig::default().with_workers(2);
        let ports: Vec<Port> = (1..=20).map(|p| Port::new(p).unwrap()).collect();
        let mut session = ScanSession::with_prober(hosts(1), ports, config, prober.clone());

        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(30)).await;
            trigger.cancel();
        });

        let result = session.scan(cancel).await;
        assert!(matches!(result, Err(ScanError::Cancelled)));
        assert_eq!(session.state(), SessionState::Closed);

        let completed = session.final_summary().total_completed;
        assert_eq!(completed, prober.calls.load(Ordering::SeqCst) as u64);
        assert!(completed < session.total_tasks());
    }

    #[tokio::test]
    async fn test_already_cancelled_scan_probes_nothing() {
        let prober = RecordingProber::new(Duration::ZERO);
        let mut session =
            ScanSession::with_prober(hosts(2), ports(&[80, 443]), ScanConfig::default(), prober.clone());

        let cancel = CancellationToken::new();
        cancel.cancel();
        assert!(matches!(session.scan(cancel).await, Err(ScanError::Cancelled)));
        assert_eq!(prober.calls.load(Ordering::SeqCst), 0);
        assert_eq!(session.final_summary().total_completed, 0);
    }

    #[tokio::test]
    async fn test_rate_limit_paces_dispatch() {
        let prober = RecordingProber::new(Duration::ZERO);
        let config = ScanConfig::default().with_workers(8).with_rate_limit(50);
        let mut session =
            ScanSession::with_prober(hosts(1), ports(&[1, 2, 3, 4, 5, 6]), config, prober);

        let start = Instant::now();
        session.scan(CancellationToken::new()).await.unwrap();

        // Six slots at 20ms spacing, the first one immediate.
        assert!(start.elapsed() >= Duration::from_millis(95));
        assert_eq!(session.final_summary().total_completed, 6);
    }

    #[tokio::test]
    async fn test_progress_reaches_completion() {
        let prober = RecordingProber::new(Duration::from_millis(1));
        let sink = Arc::new(CountingSink::default());
        let config = ScanConfig::default()
            .with_workers(4)
            .with_progress(Duration::from_secs(60));
        let mut session =
            ScanSession::with_prober(hosts(2), ports(&[80, 81, 82]), config, prober)
                .with_progress_sink(sink.clone());

        session.scan(CancellationToken::new()).await.unwrap();

        let reports = sink.reports.lock().unwrap().clone();
        let last = reports.last().copied().unwrap();
        assert_eq!(last.completed, 6);
        assert_eq!(last.total, 6);
        assert_eq!(last.percent, 100.0);
        // Ports 80 and 82 answer on both hosts.
        assert_eq!(sink.open.load(Ordering::SeqCst), 4);
    }
}
