//! CSV output formatting.

use crate::scanner::ProbeOutcome;
use chrono::SecondsFormat;
use std::io::{self, Write};

/// Write every result as a CSV row.
pub fn write_csv(out: &mut dyn Write, results: &[ProbeOutcome]) -> io::Result<()> {
    let mut wtr = csv::Writer::from_writer(out);

    wtr.write_record(["IP", "Port", "Status", "Timestamp", "Duration", "Error"])?;

    for result in results {
        wtr.write_record([
            result.host.to_string(),
            result.port.to_string(),
            result.status.to_string(),
            result.timestamp.to_rfc3339_opts(SecondsFormat::Secs, true),
            format!("{:?}", result.duration),
            result.error_detail.clone().unwrap_or_default(),
        ])?;
    }

    wtr.flush()?;
    Ok(())
}
