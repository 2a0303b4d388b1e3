//! Scan command implementation.

use crate::config::{parse_duration, AppSettings, ScanOptions};
use crate::output::{self, OutputFormat};
use crate::scanner::{BarSink, ScanSession};
use anyhow::{Context, Result};
use clap::Args;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::warn;

/// Flags describing one scan. Unset flags fall back to the settings file.
#[derive(Args, Debug)]
pub struct ScanCommand {
    /// Targets to scan, comma separated (IP or CIDR, e.g. 192.168.1.0/24)
    #[arg(short, long, value_name = "TARGETS", value_delimiter = ',')]
    pub targets: Vec<String>,

    /// Ports to scan (e.g. "80", "80,443", "1-1024") [default: 80,443]
    #[arg(short, long)]
    pub ports: Option<String>,

    /// Number of concurrent workers [default: 100]
    #[arg(short, long)]
    pub workers: Option<usize>,

    /// Connection timeout (e.g. "2s", "500ms") [default: 2s]
    #[arg(long, value_parser = parse_duration)]
    pub timeout: Option<Duration>,

    /// Maximum probes per second, 0 for unlimited [default: 0]
    #[arg(long)]
    pub rate: Option<u32>,

    /// Output format [default: text]
    #[arg(short, long, value_enum)]
    pub format: Option<OutputFormat>,

    /// Write results to this file instead of stdout
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<std::path::PathBuf>,

    /// Interval between progress reports in verbose mode [default: 5s]
    #[arg(long, value_parser = parse_duration)]
    pub progress_interval: Option<Duration>,
}

impl ScanCommand {
    /// Merge the flags over `settings`.
    pub fn options(&self, settings: &AppSettings, verbose: bool) -> ScanOptions {
        ScanOptions {
            targets: self.targets.clone(),
            ports: self.ports.clone().unwrap_or_else(|| settings.ports.clone()),
            workers: self.workers.unwrap_or(settings.workers),
            timeout: self
                .timeout
                .unwrap_or(Duration::from_millis(settings.timeout_ms)),
            rate_limit: self.rate.unwrap_or(settings.rate_limit),
            output_file: self.output.clone(),
            output_format: self
                .format
                .map(|f| f.to_string())
                .unwrap_or_else(|| settings.output_format.clone()),
            progress_interval: self
                .progress_interval
                .unwrap_or(Duration::from_secs(settings.progress_interval_secs)),
            verbose,
        }
    }

    /// Execute the scan command.
    ///
    /// Results are written even when the scan was cancelled; the scan error
    /// is returned afterwards.
    pub async fn execute(&self, verbose: bool, quiet: bool, config: Option<&Path>) -> Result<()> {
        let settings = AppSettings::load(config).context("failed to load settings")?;
        let options = self.options(&settings, verbose);
        options.validate()?;
        let format = options.format()?;

        let mut session = ScanSession::new(
            options.targets.as_slice(),
            &options.ports,
            options.to_scan_config(),
        )?;
        let total = session.total_tasks();
        let show_progress = verbose && !quiet;
        if show_progress {
            output::print_scan_header(&session, &options);
            session = session.with_progress_sink(Arc::new(BarSink::new(total)));
        }

        let cancel = CancellationToken::new();
        let signals = spawn_signal_handler(cancel.clone(), quiet);
        let scanned = session.scan(cancel).await;
        signals.abort();

        let summary = session.final_summary();
        write_output(options.output_file.as_deref(), format, &session)?;

        if show_progress {
            output::print_summary(&summary);
        }
        if let (Some(path), false) = (&options.output_file, quiet) {
            output::print_info(&format!("Results written to {}", path.display()));
        }

        match scanned {
            Err(e) if e.is_cancelled() && !quiet => {
                output::print_warning("Scan cancelled, results are partial");
                Err(e.into())
            }
            other => other.map_err(Into::into),
        }
    }
}

fn write_output(path: Option<&Path>, format: OutputFormat, session: &ScanSession) -> Result<()> {
    let summary = session.final_summary();
    let results = session.all_results();

    match path {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("failed to create {}", path.display()))?;
            let mut out = BufWriter::new(file);
            output::write_results(&mut out, format, &summary, &results)?;
            out.flush()?;
        }
        None => {
            let stdout = io::stdout();
            let mut out = stdout.lock();
            output::write_results(&mut out, format, &summary, &results)?;
            out.flush()?;
        }
    }
    Ok(())
}

/// Cancel `cancel` on the first SIGINT or SIGTERM. Later signals are only
/// logged while the scan drains.
fn spawn_signal_handler(cancel: CancellationToken, quiet: bool) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut received = 0u32;
        loop {
            if let Err(e) = wait_for_signal().await {
                warn!(error = %e, "failed to listen for signals");
                return;
            }
            received += 1;
            if received == 1 {
                if !quiet {
                    output::print_warning("Received interrupt signal, shutting down gracefully...");
                }
                cancel.cancel();
            } else {
                warn!(received, "already shutting down, waiting for in-flight probes");
            }
        }
    })
}

#[cfg(unix)]
async fn wait_for_signal() -> io::Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut terminate = signal(SignalKind::terminate())?;
    tokio::select! {
        result = tokio::signal::ctrl_c() => result,
        _ = terminate.recv() => Ok(()),
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() -> io::Result<()> {
    tokio::signal::ctrl_c().await
}
