//! # Telemetry Module
//!
//! Logs link statistics to JSONL files.
//!
//! This module handles:
//! - Snapshotting receiver counters and the liveness flag
//! - Formatting records as JSONL (JSON Lines)
//! - Appending to a per-run log file

use chrono::Utc;
use serde::Serialize;
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::error::Result;

/// One link statistics record.
///
/// Counters are cumulative since receiver start; deltas are left to
/// whatever ingests the log.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct LinkStats {
    /// Wall-clock time of the snapshot, RFC 3339
    pub timestamp: String,

    /// Frames successfully decoded
    pub frames_decoded: u64,

    /// Frames dropped to resyncs or bad sentinels
    pub frames_dropped: u64,

    /// Liveness flag at snapshot time
    pub link_ok: bool,
}

impl LinkStats {
    /// Snapshot the given counters with the current wall-clock time
    pub fn capture(frames_decoded: u64, frames_dropped: u64, link_ok: bool) -> Self {
        Self {
            timestamp: Utc::now().to_rfc3339(),
            frames_decoded,
            frames_dropped,
            link_ok,
        }
    }
}

/// Appends link statistics records to a JSONL file, one per line
pub struct LinkStatsLogger {
    writer: BufWriter<File>,
    path: PathBuf,
}

impl LinkStatsLogger {
    /// Create a logger writing to a new timestamped file under `log_dir`.
    ///
    /// The directory is created if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns error if the directory or file cannot be created
    pub fn create<P: AsRef<Path>>(log_dir: P) -> Result<Self> {
        fs::create_dir_all(&log_dir)?;

        let name = format!("sbus-link-{}.jsonl", Utc::now().format("%Y%m%d-%H%M%S"));
        let path = log_dir.as_ref().join(name);

        let file = OpenOptions::new().create(true).append(true).open(&path)?;

        Ok(Self {
            writer: BufWriter::new(file),
            path,
        })
    }

    /// Append one record and flush it to disk
    pub fn log(&mut self, stats: &LinkStats) -> Result<()> {
        let line = serde_json::to_string(stats).map_err(std::io::Error::from)?;
        writeln!(self.writer, "{}", line)?;
        self.writer.flush()?;
        Ok(())
    }

    /// Path of the file being written
    pub fn path(&self) -> &Path {
        &self.path
    }
}
