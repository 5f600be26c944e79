pub mod batch;
pub mod progress;

pub use batch::{BatchAccumulator, SAMPLE_COLUMNS};
pub use progress::{ProgressSnapshot, ProgressTracker};

use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use uuid::Uuid;

/// Counters for one load run. Owned by the pipeline driver.
#[derive(Debug, Clone)]
pub struct RunStats {
    pub run_id: Uuid,
    pub lines_read: u64,
    /// Payloads tokenized, including ones later skipped for arity.
    pub records_parsed: u64,
    pub rows_inserted: u64,
    pub rows_skipped: u64,
    pub truncated_records: u64,
    pub batches_committed: u64,
    pub statements_ignored: u64,
    started: Instant,
}

impl RunStats {
    pub fn new() -> Self {
        Self {
            run_id: Uuid::new_v4(),
            lines_read: 0,
            records_parsed: 0,
            rows_inserted: 0,
            rows_skipped: 0,
            truncated_records: 0,
            batches_committed: 0,
            statements_ignored: 0,
            started: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    pub fn rows_per_second(&self) -> f64 {
        rate(self.rows_inserted, self.elapsed())
    }

    pub fn snapshot(&self) -> RunSummary {
        let elapsed = self.elapsed();
        RunSummary {
            run_id: self.run_id.to_string(),
            lines_read: self.lines_read,
            records_parsed: self.records_parsed,
            rows_inserted: self.rows_inserted,
            rows_skipped: self.rows_skipped,
            truncated_records: self.truncated_records,
            batches_committed: self.batches_committed,
            statements_ignored: self.statements_ignored,
            elapsed_seconds: elapsed.as_secs_f64(),
            rows_per_second: rate(self.rows_inserted, elapsed),
        }
    }
}

impl Default for RunStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Immutable result of a finished (or aborted) run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub run_id: String,
    pub lines_read: u64,
    /// Payloads tokenized, including ones later skipped for arity.
    pub records_parsed: u64,
    pub rows_inserted: u64,
    pub rows_skipped: u64,
    pub truncated_records: u64,
    pub batches_committed: u64,
    pub statements_ignored: u64,
    pub elapsed_seconds: f64,
    pub rows_per_second: f64,
}

impl RunSummary {
    /// Logs the end-of-run totals.
    pub fn log(&self) {
        tracing::info!(
            run_id = %self.run_id,
            lines_read = self.lines_read,
            records_parsed = self.records_parsed,
            rows_inserted = self.rows_inserted,
            rows_skipped = self.rows_skipped,
            truncated_records = self.truncated_records,
            batches = self.batches_committed,
            statements_ignored = self.statements_ignored,
            elapsed_seconds = %format!("{:.2}", self.elapsed_seconds),
            rows_per_second = %format!("{:.0}", self.rows_per_second),
            "Load finished"
        );
    }
}

pub(crate) fn rate(count: u64, elapsed: Duration) -> f64 {
    let secs = elapsed.as_secs_f64();
    if secs > 0.0 {
        count as f64 / secs
    } else {
        0.0
    }
}
