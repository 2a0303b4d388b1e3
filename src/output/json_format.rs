//! JSON output formatting.

use crate::scanner::{AggregateSnapshot, ProbeOutcome};
use serde::Serialize;
use std::io::{self, Write};

#[derive(Serialize)]
struct Report<'a> {
    summary: &'a AggregateSnapshot,
    results: &'a [ProbeOutcome],
}

/// Write `{ "summary": ..., "results": [...] }` as pretty JSON.
pub fn write_json(
    out: &mut dyn Write,
    summary: &AggregateSnapshot,
    results: &[ProbeOutcome],
) -> io::Result<()> {
    serde_json::to_writer_pretty(&mut *out, &Report { summary, results })?;
    writeln!(out)
}
