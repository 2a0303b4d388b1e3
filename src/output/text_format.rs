//! Plain text result listing.

use crate::scanner::ProbeOutcome;
use std::io::{self, Write};

/// Write one `HOST:PORT - STATUS` line per open result.
pub fn write_text(out: &mut dyn Write, results: &[ProbeOutcome]) -> io::Result<()> {
    for result in results.iter().filter(|r| r.is_open()) {
        writeln!(out, "{}:{} - {}", result.host, result.port, result.status)?;
    }
    Ok(())
}
