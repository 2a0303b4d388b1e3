//! Bounded worker pool.
//!
//! A fixed number of worker loops pull `ProbeTask`s from one shared bounded
//! queue, run the prober and hand every outcome to the `Aggregator`. The
//! queue applies backpressure: `submit` waits for capacity instead of
//! dropping tasks.

use crate::error::{ScanError, ScanResult};
use crate::scanner::aggregator::Aggregator;
use crate::scanner::traits::{ProbeTask, Prober};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Upper bound on queued tasks regardless of worker count.
pub const MAX_QUEUE_CAPACITY: usize = 10_000;

/// Queue capacity for a pool of `workers` loops.
pub fn queue_capacity(workers: usize) -> usize {
    workers.saturating_mul(10).clamp(1, MAX_QUEUE_CAPACITY)
}

/// A pool of probe workers sharing one task queue.
#[derive(Debug)]
pub struct WorkerPool {
    tx: Option<mpsc::Sender<ProbeTask>>,
    workers: Vec<JoinHandle<()>>,
    cancel: CancellationToken,
}

impl WorkerPool {
    /// Spawn `workers` loops probing with `prober` and reporting to `sink`.
    pub fn start(
        workers: usize,
        prober: Arc<dyn Prober>,
        sink: Arc<Aggregator>,
        cancel: CancellationToken,
    ) -> Self {
        let workers = workers.max(1);
        let (tx, rx) = mpsc::channel(queue_capacity(workers));
        let rx = Arc::new(Mutex::new(rx));

        let handles = (0..workers)
            .map(|id| {
                tokio::spawn(worker_loop(
                    id,
                    Arc::clone(&rx),
                    Arc::clone(&prober),
                    Arc::clone(&sink),
                    cancel.clone(),
                ))
            })
            .collect();

        debug!(workers, capacity = queue_capacity(workers), "worker pool started");

        Self {
            tx: Some(tx),
            workers: handles,
            cancel,
        }
    }

    /// Number of worker loops.
    pub fn size(&self) -> usize {
        self.workers.len()
    }

    /// Enqueue a task, waiting while the queue is full.
    ///
    /// Fails with `Cancelled` if the cancellation token fired before or while
    /// waiting, and with `SourceClosed` after `close_source`.
    pub async fn submit(&self, task: ProbeTask) -> ScanResult<()> {
        if self.cancel.is_cancelled() {
            return Err(ScanError::Cancelled);
        }
        let tx = self.tx.as_ref().ok_or(ScanError::SourceClosed)?;

        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(ScanError::Cancelled),
            sent = tx.send(task) => sent.map_err(|_| {
                // Every worker is gone, which only happens after cancellation.
                if self.cancel.is_cancelled() {
                    ScanError::Cancelled
                } else {
                    ScanError::SourceClosed
                }
            }),
        }
    }

    /// Signal that no more tasks will be submitted.
    ///
    /// Workers finish the queued tasks, then exit.
    pub fn close_source(&mut self) {
        self.tx = None;
    }

    /// Wait until every worker loop has exited.
    pub async fn join(self) {
        for result in futures::future::join_all(self.workers).await {
            if let Err(e) = result {
                warn!(error = %e, "worker task failed");
            }
        }
    }
}

async fn worker_loop(
    id: usize,
    rx: Arc<Mutex<mpsc::Receiver<ProbeTask>>>,
    prober: Arc<dyn Prober>,
    sink: Arc<Aggregator>,
    cancel: CancellationToken,
) {
    let mut probed = 0u64;

    loop {
        let next = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            task = async { rx.lock().await.recv().await } => task,
        };
        let Some(task) = next else {
            break;
        };

        // The probe itself is not interrupted by cancellation.
        let outcome = prober.probe(task).await;
        probed += 1;

        if let Err(e) = sink.submit(outcome) {
            warn!(worker = id, endpoint = %task, error = %e, "dropping outcome");
        }
    }

    debug!(worker = id, probed, cancelled = cancel.is_cancelled(), "worker exited");
}
