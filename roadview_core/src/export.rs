//! JSONL telemetry recorder.
//!
//! Appends one JSON object per rendered frame so a run can be replayed or
//! plotted offline without the simulator.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use tracing::info;

use crate::telemetry::TelemetryRecord;

/// Writes [`TelemetryRecord`]s as JSON Lines.
pub struct TelemetryLog {
    writer: BufWriter<File>,
    records: u64,
}

impl TelemetryLog {
    /// Creates (truncating) the log file at `path`.
    pub fn create(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let file = File::create(path)?;
        Ok(Self {
            writer: BufWriter::new(file),
            records: 0,
        })
    }

    /// Appends one record as a single JSON line.
    pub fn append(&mut self, record: &TelemetryRecord) -> std::io::Result<()> {
        let line = serde_json::to_string(record)?;
        self.writer.write_all(line.as_bytes())?;
        self.writer.write_all(b"\n")?;
        self.records += 1;
        Ok(())
    }

    /// Number of records written so far.
    pub fn len(&self) -> u64 {
        self.records
    }

    pub fn is_empty(&self) -> bool {
        self.records == 0
    }

    /// Flushes and closes the log, logging the record count.
    pub fn finish(mut self) -> std::io::Result<()> {
        self.writer.flush()?;
        info!(records = self.records, "telemetry log closed");
        Ok(())
    }
}
