//! Run accumulators and the operation log.
//!
//! Counters are explicit values threaded through each phase and merged by
//! the orchestrator; there is no ambient shared state.

use crate::executor::ExecOutcome;
use serde::Serialize;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Per-run outcome counters.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct CleanStats {
    /// Items removed (or dry-run removed).
    pub deleted: usize,
    /// Items the policy gate refused.
    pub skipped_protected: usize,
    /// Items whose removal failed.
    pub failed: usize,
    /// Items whose removal hit the wall-clock bound.
    pub timed_out: usize,
    /// Bytes reclaimed, best-effort estimate.
    pub bytes_freed: u64,
}

impl CleanStats {
    /// Fold one execution outcome into the counters.
    pub fn record(&mut self, outcome: &ExecOutcome) {
        match outcome {
            ExecOutcome::Removed { bytes } => {
                self.deleted += 1;
                self.bytes_freed += bytes;
            }
            ExecOutcome::AlreadyAbsent => self.deleted += 1,
            ExecOutcome::Denied { .. } => self.skipped_protected += 1,
            ExecOutcome::TimedOut => self.timed_out += 1,
            ExecOutcome::Failed { .. } => self.failed += 1,
        }
    }

    /// Merge counters produced by another worker.
    pub fn merge(&mut self, other: &CleanStats) {
        self.deleted += other.deleted;
        self.skipped_protected += other.skipped_protected;
        self.failed += other.failed;
        self.timed_out += other.timed_out;
        self.bytes_freed += other.bytes_freed;
    }
}

#[derive(Serialize)]
struct LogRecord<'a> {
    at: i64,
    path: &'a Path,
    #[serde(flatten)]
    outcome: &'a ExecOutcome,
}

/// Append-only JSONL log of executed deletions, consumed by external
/// reporting. Writes are best-effort: a failing log never fails the run.
#[derive(Debug)]
pub struct OperationLog {
    file: PathBuf,
}

impl OperationLog {
    /// Open (lazily creating) the log at `file`.
    pub fn open(file: PathBuf) -> Self {
        Self { file }
    }

    /// Append one record.
    pub fn append(&self, path: &Path, outcome: &ExecOutcome) {
        let record = LogRecord {
            at: chrono::Utc::now().timestamp(),
            path,
            outcome,
        };
        if let Err(err) = self.try_append(&record) {
            warn!(log = %self.file.display(), "operation log write failed: {err}");
        }
    }

    fn try_append(&self, record: &LogRecord<'_>) -> anyhow::Result<()> {
        if let Some(parent) = self.file.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut f = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.file)?;
        let mut line = serde_json::to_vec(record)?;
        line.push(b'\n');
        f.write_all(&line)?;
        Ok(())
    }
}
