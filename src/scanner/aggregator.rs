//! Result aggregation.
//!
//! The `Aggregator` is the single sink every probe outcome flows into. Workers
//! hand outcomes over through an unbounded channel, so `submit` never blocks
//! a worker; one collection task folds them into the running counters. Readers
//! only ever see copies taken under the state lock.

use crate::error::AggregateError;
use crate::scanner::progress::ProgressSink;
use crate::scanner::traits::{serialize_millis, ProbeOutcome, ProbeStatus};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// Point-in-time copy of the aggregate counters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AggregateSnapshot {
    pub total_completed: u64,
    pub open: u64,
    pub closed: u64,
    pub filtered: u64,
    pub errors: u64,
    pub start_time: DateTime<Utc>,
    #[serde(rename = "elapsed_ms", serialize_with = "serialize_millis")]
    pub elapsed: Duration,
}

impl AggregateSnapshot {
    /// Sum of the four status counters.
    pub fn status_sum(&self) -> u64 {
        self.open + self.closed + self.filtered + self.errors
    }
}

struct AggregateState {
    total_completed: u64,
    open: u64,
    closed: u64,
    filtered: u64,
    errors: u64,
    results: Vec<ProbeOutcome>,
    start_time: DateTime<Utc>,
    started: Instant,
    finished: Option<Instant>,
}

impl AggregateState {
    fn new() -> Self {
        Self {
            total_completed: 0,
            open: 0,
            closed: 0,
            filtered: 0,
            errors: 0,
            results: Vec::new(),
            start_time: Utc::now(),
            started: Instant::now(),
            finished: None,
        }
    }

    fn restart_clock(&mut self) {
        self.start_time = Utc::now();
        self.started = Instant::now();
    }

    fn fold(&mut self, outcome: ProbeOutcome) {
        self.total_completed += 1;
        match outcome.status {
            ProbeStatus::Open => self.open += 1,
            ProbeStatus::Closed => self.closed += 1,
            ProbeStatus::Filtered => self.filtered += 1,
            ProbeStatus::Error => self.errors += 1,
        }
        self.results.push(outcome);
    }

    fn snapshot(&self) -> AggregateSnapshot {
        let end = self.finished.unwrap_or_else(Instant::now);
        AggregateSnapshot {
            total_completed: self.total_completed,
            open: self.open,
            closed: self.closed,
            filtered: self.filtered,
            errors: self.errors,
            start_time: self.start_time,
            elapsed: end.duration_since(self.started),
        }
    }
}

/// Concurrency-safe sink for probe outcomes.
pub struct Aggregator {
    tx: Mutex<Option<mpsc::UnboundedSender<ProbeOutcome>>>,
    rx: Mutex<Option<mpsc::UnboundedReceiver<ProbeOutcome>>>,
    collector: Mutex<Option<JoinHandle<()>>>,
    state: Arc<Mutex<AggregateState>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Aggregator {
    /// Create an aggregator. Outcomes submitted before `start` are buffered.
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            tx: Mutex::new(Some(tx)),
            rx: Mutex::new(Some(rx)),
            collector: Mutex::new(None),
            state: Arc::new(Mutex::new(AggregateState::new())),
        }
    }

    /// Spawn the collection loop. Calling it again has no effect.
    ///
    /// The elapsed-time clock starts here, not at construction.
    pub fn start(&self) {
        self.start_observed(None);
    }

    /// Like `start`, but open ports are shown through `observer` instead of
    /// the `info` log.
    pub fn start_observed(&self, observer: Option<Arc<dyn ProgressSink>>) {
        let Some(mut rx) = lock(&self.rx).take() else {
            return;
        };
        lock(&self.state).restart_clock();

        let state = Arc::clone(&self.state);
        let handle = tokio::spawn(async move {
            while let Some(outcome) = rx.recv().await {
                if outcome.is_open() {
                    match &observer {
                        Some(observer) => {
                            debug!(host = %outcome.host, port = %outcome.port, "open port");
                            observer.open_port(&outcome);
                        }
                        None => info!(host = %outcome.host, port = %outcome.port, "open port"),
                    }
                }
                lock(&state).fold(outcome);
            }
            debug!("aggregator collection loop drained");
        });
        *lock(&self.collector) = Some(handle);
    }

    /// Hand an outcome over to the collection loop.
    ///
    /// Never blocks. Fails with `Closed` once `close` has been called.
    pub fn submit(&self, outcome: ProbeOutcome) -> Result<(), AggregateError> {
        let tx = lock(&self.tx);
        match tx.as_ref() {
            Some(tx) => tx.send(outcome).map_err(|_| AggregateError::Closed),
            None => Err(AggregateError::Closed),
        }
    }

    /// Stop accepting outcomes and wait until every accepted one is folded.
    ///
    /// Fails with `InternalInconsistency` when called a second time.
    pub async fn close(&self) -> Result<(), AggregateError> {
        let tx = lock(&self.tx)
            .take()
            .ok_or(AggregateError::InternalInconsistency("aggregator closed twice"))?;
        drop(tx);

        let collector = lock(&self.collector).take();
        if let Some(handle) = collector {
            handle
                .await
                .map_err(|_| AggregateError::InternalInconsistency("collection loop panicked"))?;
        }

        // Never started: fold the buffered outcomes here.
        if let Some(mut rx) = lock(&self.rx).take() {
            let mut state = lock(&self.state);
            while let Ok(outcome) = rx.try_recv() {
                state.fold(outcome);
            }
        }

        lock(&self.state).finished = Some(Instant::now());
        Ok(())
    }

    /// Whether `close` has been called.
    pub fn is_closed(&self) -> bool {
        lock(&self.tx).is_none()
    }

    /// Copy the current counters.
    pub fn snapshot(&self) -> AggregateSnapshot {
        lock(&self.state).snapshot()
    }

    /// Copy every folded outcome, sorted by host then port.
    pub fn all_results(&self) -> Vec<ProbeOutcome> {
        let mut results = lock(&self.state).results.clone();
        results.sort_by(|a, b| (a.host, a.port).cmp(&(b.host, b.port)));
        results
    }
}

impl Default for Aggregator {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Aggregator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Aggregator")
            .field("closed", &self.is_closed())
            .field("snapshot", &self.snapshot())
            .finish()
    }
}
