//! Command-line interface.
//!
//! netscout is a single command: every flag describes one scan.

mod scan;

pub use scan::ScanCommand;

use clap::Parser;
use std::path::PathBuf;

/// netscout - a concurrent TCP connect scanner.
///
/// Probes every (host, port) pair of the given targets with a full TCP
/// handshake and reports which endpoints are open, closed or filtered.
#[derive(Parser, Debug)]
#[command(name = "netscout")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "A concurrent TCP connect scanner", long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub scan: ScanCommand,

    /// Enable verbose output (scan header, progress, summary)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Path to a JSON settings file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,
}
