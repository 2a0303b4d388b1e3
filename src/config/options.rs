//! Validated scan options.

use crate::error::{ConfigError, ConfigResult};
use crate::output::OutputFormat;
use crate::scanner::ScanConfig;
use std::path::PathBuf;
use std::time::Duration;

/// Smallest accepted connect timeout.
pub const MIN_TIMEOUT: Duration = Duration::from_millis(1);
/// Largest accepted connect timeout.
pub const MAX_TIMEOUT: Duration = Duration::from_secs(5 * 60);
/// Largest accepted worker count.
pub const MAX_WORKERS: usize = 10_000;

/// Everything needed to run one scan from the command line.
#[derive(Debug, Clone)]
pub struct ScanOptions {
    pub targets: Vec<String>,
    pub ports: String,
    pub workers: usize,
    pub timeout: Duration,
    pub rate_limit: u32,
    pub output_file: Option<PathBuf>,
    pub output_format: String,
    pub progress_interval: Duration,
    pub verbose: bool,
}

impl ScanOptions {
    /// Check ranges and required fields.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.targets.iter().all(|t| t.trim().is_empty()) {
            return Err(invalid("at least one target must be specified"));
        }
        if self.ports.trim().is_empty() {
            return Err(invalid("ports must be specified"));
        }
        if self.workers < 1 {
            return Err(invalid("workers must be at least 1"));
        }
        if self.workers > MAX_WORKERS {
            return Err(invalid(format!("workers cannot exceed {}", MAX_WORKERS)));
        }
        if self.timeout < MIN_TIMEOUT {
            return Err(invalid("timeout must be at least 1ms"));
        }
        if self.timeout > MAX_TIMEOUT {
            return Err(invalid("timeout cannot exceed 5 minutes"));
        }
        if self.progress_interval.is_zero() {
            return Err(invalid("progress interval must be positive"));
        }
        self.format()?;
        Ok(())
    }

    /// Parsed output format.
    pub fn format(&self) -> ConfigResult<OutputFormat> {
        self.output_format.parse().map_err(|_| {
            invalid(format!(
                "invalid output format: {} (valid: text, json, csv)",
                self.output_format
            ))
        })
    }

    /// Engine configuration for these options.
    pub fn to_scan_config(&self) -> ScanConfig {
        let config = ScanConfig::default()
            .with_workers(self.workers)
            .with_timeout(self.timeout)
            .with_rate_limit(self.rate_limit);

        if self.verbose {
            config.with_progress(self.progress_interval)
        } else {
            config
        }
    }
}

fn invalid(reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid(reason.into())
}

/// Parse a duration such as `2s`, `500ms`, `1m` or `1.5s`.
///
/// A bare number is taken as milliseconds.
pub fn parse_duration(s: &str) -> Result<Duration, String> {
    let s = s.trim();
    let split = s
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(s.len());
    let (number, unit) = s.split_at(split);

    let value: f64 = number
        .parse()
        .map_err(|_| format!("invalid duration: '{}'", s))?;
    let secs = match unit.trim() {
        "" | "ms" => value / 1000.0,
        "s" => value,
        "m" => value * 60.0,
        "us" | "µs" => value / 1_000_000.0,
        other => return Err(format!("unknown duration unit '{}' in '{}'", other, s)),
    };

    Duration::try_from_secs_f64(secs).map_err(|e| format!("invalid duration '{}': {}", s, e))
}
