//! Styled status lines.
//!
//! Everything here goes to stderr so stdout carries only the results.

use crate::config::ScanOptions;
use crate::scanner::{AggregateSnapshot, ScanSession};
use console::style;

/// Print the scan parameters before scanning begins.
pub fn print_scan_header(session: &ScanSession, options: &ScanOptions) {
    eprintln!();
    eprintln!(
        "{} {} v{}",
        style("Starting").cyan(),
        style("netscout").cyan().bold(),
        env!("CARGO_PKG_VERSION")
    );
    eprintln!(
        "{} Session: {}",
        style("•").dim(),
        style(session.id().short()).dim()
    );
    eprintln!(
        "{} Targets: {} ({} hosts)",
        style("•").dim(),
        style(options.targets.join(",")).white().bold(),
        session.hosts().len()
    );
    eprintln!(
        "{} Ports: {} ({} ports)",
        style("•").dim(),
        options.ports,
        session.ports().len()
    );
    eprintln!(
        "{} Workers: {}  Timeout: {:?}",
        style("•").dim(),
        options.workers,
        options.timeout
    );
    if options.rate_limit > 0 {
        eprintln!(
            "{} Rate limit: {} probes/sec",
            style("•").dim(),
            options.rate_limit
        );
    }
    eprintln!(
        "{} Probing {} endpoints...",
        style("•").dim(),
        style(session.total_tasks()).white().bold()
    );
    eprintln!();
}

/// Print the final counters.
pub fn print_summary(summary: &AggregateSnapshot) {
    eprintln!();
    eprintln!("{}", style("Scan completed:").bold());
    eprintln!("  Total scanned: {}", summary.total_completed);
    eprintln!("  Open ports:    {}", style(summary.open).green().bold());
    eprintln!("  Closed ports:  {}", style(summary.closed).red());
    eprintln!("  Filtered:      {}", style(summary.filtered).yellow());
    if summary.errors > 0 {
        eprintln!("  Errors:        {}", style(summary.errors).red().bold());
    }
    eprintln!("  Duration:      {:.2?}", summary.elapsed);
}

/// Print an error message.
pub fn print_error(msg: &str) {
    eprintln!("{} {}", style("Error:").red().bold(), msg);
}

/// Print a warning message.
pub fn print_warning(msg: &str) {
    eprintln!("{} {}", style("Warning:").yellow().bold(), msg);
}

/// Print an info message.
pub fn print_info(msg: &str) {
    eprintln!("{} {}", style("ℹ").blue().bold(), msg);
}
