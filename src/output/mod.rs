//! Output formatting module.
//!
//! Provides formatters for text, JSON, and CSV output of scan results, plus
//! the styled status lines printed to stderr.

mod csv_format;
mod json_format;
mod plain;
mod text_format;

pub use csv_format::write_csv;
pub use json_format::write_json;
pub use plain::{print_error, print_info, print_scan_header, print_summary, print_warning};
pub use text_format::write_text;

use crate::scanner::{AggregateSnapshot, ProbeOutcome};
use std::io::{self, Write};
use std::str::FromStr;

/// Output format for results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// One line per open port
    #[default]
    Text,
    /// JSON document with summary and results
    Json,
    /// CSV with one row per probe
    Csv,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text => write!(f, "text"),
            Self::Json => write!(f, "json"),
            Self::Csv => write!(f, "csv"),
        }
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            "csv" => Ok(Self::Csv),
            other => Err(format!("unknown output format '{}'", other)),
        }
    }
}

/// Write `results` to `out` in the given format.
pub fn write_results(
    out: &mut dyn Write,
    format: OutputFormat,
    summary: &AggregateSnapshot,
    results: &[ProbeOutcome],
) -> io::Result<()> {
    match format {
        OutputFormat::Text => write_text(out, results),
        OutputFormat::Json => write_json(out, summary, results),
        OutputFormat::Csv => write_csv(out, results),
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use crate::scanner::{Aggregator, ProbeOutcome, ProbeStatus, ProbeTask};
    use crate::types::Port;
    use chrono::{TimeZone, Utc};
    use std::net::{IpAddr, Ipv4Addr};
    use std::time::Duration;

    pub fn outcome(port: u16, status: ProbeStatus) -> ProbeOutcome {
        let task = ProbeTask::new(
            IpAddr::V4(Ipv4Addr::new(192, 168, 1, 10)),
            Port::new(port).unwrap(),
        );
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        ProbeOutcome::new(task, status, at).with_duration(Duration::from_micros(1500))
    }

    pub fn sample() -> Vec<ProbeOutcome> {
        vec![
            outcome(22, ProbeStatus::Open),
            outcome(23, ProbeStatus::Closed).with_error("connection refused"),
            outcome(80, ProbeStatus::Open),
            outcome(81, ProbeStatus::Filtered).with_error("connect timed out after 2s"),
        ]
    }

    pub fn summary_of(results: &[ProbeOutcome]) -> crate::scanner::AggregateSnapshot {
        let aggregator = Aggregator::new();
        for outcome in results {
            aggregator.submit(outcome.clone()).unwrap();
        }
        futures::executor::block_on(aggregator.close()).unwrap();
        aggregator.snapshot()
    }
}
