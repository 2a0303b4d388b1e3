//! Configuration management for netscout.
//!
//! Provides XDG-compliant settings storage and the validated options a scan
//! is started from.

mod options;
mod settings;

pub use options::{parse_duration, ScanOptions, MAX_TIMEOUT, MAX_WORKERS, MIN_TIMEOUT};
pub use settings::{AppSettings, Paths};
