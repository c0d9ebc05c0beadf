// Roomsense - Concurrent sensor telemetry aggregation
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! CSV export of the full sample log.

use std::io::Write;
use std::path::Path;

use log::info;

use crate::error::ExportError;
use crate::history::BoundedHistory;
use crate::sample::Sample;

/// Timestamp format of the exported `timestamp` column.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Header row of an export.
pub const EXPORT_HEADER: [&str; 4] = ["timestamp", "light", "distance", "temperature"];

/// Result of an export request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportOutcome {
    /// Destination (over)written with this many rows
    Written { rows: usize },
    /// Full log was empty, destination left untouched
    Skipped,
}

/// Write the full log of `history` to `destination`, replacing its content.
///
/// The log is copied under the history lock before anything is written, so
/// concurrent appends never tear the export. An empty log is a no-op.
pub fn export_snapshot(
    history: &BoundedHistory,
    destination: impl AsRef<Path>,
) -> Result<ExportOutcome, ExportError> {
    let samples = history.full_log();
    if samples.is_empty() {
        return Ok(ExportOutcome::Skipped);
    }

    let destination = destination.as_ref();
    let file = std::fs::File::create(destination)?;
    let rows = write_samples(&samples, file)?;

    info!("Exported {} samples to {}", rows, destination.display());
    Ok(ExportOutcome::Written { rows })
}

/// Write samples as CSV (header + one row per sample) to any writer.
pub fn write_samples<W: Write>(samples: &[Sample], writer: W) -> Result<usize, ExportError> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    csv_writer.write_record(EXPORT_HEADER)?;

    for sample in samples {
        csv_writer.write_record(&[
            sample.captured_at.format(TIMESTAMP_FORMAT).to_string(),
            sample.light.to_string(),
            sample.distance_cm.to_string(),
            sample.temperature_c.to_string(),
        ])?;
    }

    csv_writer.flush()?;
    Ok(samples.len())
}
