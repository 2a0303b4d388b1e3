//! TCP connect prober.
//!
//! Performs standard TCP connect probes using the operating system's socket
//! API. A successful handshake is closed again immediately; nothing is sent
//! or read on the connection.

use crate::scanner::traits::{ProbeOutcome, ProbeStatus, ProbeTask, Prober};
use async_trait::async_trait;
use chrono::Utc;
use std::io;
use std::net::SocketAddr;
use std::time::{Duration, Instant};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::trace;

/// TCP connect prober.
///
/// Holds only the deadline, so one instance is shared by every worker.
#[derive(Debug, Clone)]
pub struct TcpProber {
    deadline: Duration,
}

impl TcpProber {
    /// Create a new TCP connect prober.
    pub fn new(deadline: Duration) -> Self {
        Self { deadline }
    }
}

#[async_trait]
impl Prober for TcpProber {
    async fn probe(&self, task: ProbeTask) -> ProbeOutcome {
        let addr = SocketAddr::new(task.host, task.port.as_u16());
        let started_at = Utc::now();
        let start = Instant::now();

        let result = timeout(self.deadline, TcpStream::connect(addr)).await;
        let elapsed = start.elapsed();

        let outcome = match result {
            Ok(Ok(stream)) => {
                drop(stream);
                ProbeOutcome::new(task, ProbeStatus::Open, started_at)
            }
            Ok(Err(e)) => ProbeOutcome::new(task, classify_error(&e), started_at)
                .with_error(e.to_string()),
            Err(_) => ProbeOutcome::new(task, ProbeStatus::Filtered, started_at)
                .with_error(format!("connect timed out after {:?}", self.deadline)),
        };
        let outcome = outcome.with_duration(elapsed);

        trace!(endpoint = %task, status = %outcome.status, ?elapsed, "probe finished");
        outcome
    }
}

/// Map a failed connect to a status.
///
/// Timeouts reported by the OS count as `filtered`. Failures to create the
/// socket at all are `error`. Every other failure is `closed`.
pub(crate) fn classify_error(err: &io::Error) -> ProbeStatus {
    if err.kind() == io::ErrorKind::TimedOut {
        return ProbeStatus::Filtered;
    }
    if err.kind() == io::ErrorKind::OutOfMemory || is_resource_error(err) {
        return ProbeStatus::Error;
    }
    ProbeStatus::Closed
}

#[cfg(unix)]
fn is_resource_error(err: &io::Error) -> bool {
    matches!(
        err.raw_os_error(),
        Some(libc::EMFILE | libc::ENFILE | libc::ENOBUFS | libc::ENOMEM | libc::EAFNOSUPPORT)
    )
}

#[cfg(not(unix))]
fn is_resource_error(_err: &io::Error) -> bool {
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Port;
    use std::net::{IpAddr, Ipv4Addr};
    use tokio::net::TcpListener;

    fn localhost(port: u16) -> ProbeTask {
        ProbeTask::new(IpAddr::V4(Ipv4Addr::LOCALHOST), Port::new(port).unwrap())
    }

    #[test]
    fn test_classify_timeout_as_filtered() {
        let err = io::Error::new(io::ErrorKind::TimedOut, "timed out");
        assert_eq!(classify_error(&err), ProbeStatus::Filtered);
    }

    #[test]
    fn test_classify_other_failures_as_closed() {
        for kind in [
            io::ErrorKind::ConnectionRefused,
            io::ErrorKind::ConnectionReset,
            io::ErrorKind::PermissionDenied,
            io::ErrorKind::Other,
        ] {
            assert_eq!(classify_error(&io::Error::from(kind)), ProbeStatus::Closed);
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_classify_resource_exhaustion_as_error() {
        for code in [libc::EMFILE, libc::ENFILE, libc::ENOBUFS] {
            let err = io::Error::from_raw_os_error(code);
            assert_eq!(classify_error(&err), ProbeStatus::Error);
        }
        let refused = io::Error::from_raw_os_error(libc::ECONNREFUSED);
        assert_eq!(classify_error(&refused), ProbeStatus::Closed);
    }

    #[tokio::test]
    async fn test_probe_open_port() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let prober = TcpProber::new(Duration::from_secs(1));
        let outcome = prober.probe(localhost(port)).await;

        assert_eq!(outcome.status, ProbeStatus::Open);
        assert!(outcome.error_detail.is_none());
        assert_eq!(outcome.port.as_u16(), port);
    }

    #[tokio::test]
    async fn test_probe_refused_port() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let prober = TcpProber::new(Duration::from_secs(1));
        let outcome = prober.probe(localhost(port)).await;

        // Loopback refuses immediately instead of waiting for the deadline.
        assert_eq!(outcome.status, ProbeStatus::Closed);
        assert!(outcome.error_detail.is_some());
        assert!(outcome.duration < Duration::from_millis(200), "took {:?}", outcome.duration);
    }

    #[tokio::test]
    async fn test_probe_respects_deadline() {
        // TEST-NET-1 is never routed; depending on the network this either
        // times out or is rejected as unreachable.
        let task = ProbeTask::new("192.0.2.1".parse().unwrap(), Port::new(80).unwrap());
        let prober = TcpProber::new(Duration::from_millis(50));
        let start = Instant::now();
        let outcome = prober.probe(task).await;

        assert!(matches!(
            outcome.status,
            ProbeStatus::Filtered | ProbeStatus::Closed
        ));
        assert!(start.elapsed() < Duration::from_millis(1000));
        assert!(outcome.duration <= start.elapsed());
    }
}
