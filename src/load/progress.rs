use crate::load::{rate, RunStats};
use std::time::{Duration, Instant};

/// Point-in-time view of how far a run has got.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressSnapshot {
    pub percent: Option<f64>,
    pub rows_per_second: f64,
    pub eta: Option<Duration>,
}

impl ProgressSnapshot {
    /// Percent and ETA are derived from lines read against the known total.
    pub fn compute(
        lines_read: u64,
        total_lines: Option<u64>,
        rows_inserted: u64,
        elapsed: Duration,
    ) -> Self {
        let percent = total_lines
            .filter(|total| *total > 0)
            .map(|total| (lines_read.min(total) as f64 / total as f64) * 100.0);

        let lines_per_second = rate(lines_read, elapsed);
        let eta = match total_lines {
            Some(total) if lines_read > 0 && lines_per_second > 0.0 => {
                let remaining = total.saturating_sub(lines_read);
                Some(Duration::from_secs_f64(remaining as f64 / lines_per_second))
            }
            _ => None,
        };

        Self {
            percent,
            rows_per_second: rate(rows_inserted, elapsed),
            eta,
        }
    }
}

/// Rate-limited progress logging.
pub struct ProgressTracker {
    total_lines: Option<u64>,
    interval: Duration,
    last_report: Instant,
}

impl ProgressTracker {
    pub fn new(total_lines: Option<u64>, interval: Duration) -> Self {
        Self {
            total_lines,
            interval,
            last_report: Instant::now(),
        }
    }

    pub fn total_lines(&self) -> Option<u64> {
        self.total_lines
    }

    pub fn is_due(&self) -> bool {
        self.last_report.elapsed() >= self.interval
    }

    /// Logs progress unconditionally and restarts the interval.
    pub fn report(&mut self, stats: &RunStats) -> ProgressSnapshot {
        let snapshot = ProgressSnapshot::compute(
            stats.lines_read,
            self.total_lines,
            stats.rows_inserted,
            stats.elapsed(),
        );
        self.last_report = Instant::now();

        tracing::info!(
            percent = ?snapshot.percent.map(|p| format!("{:.1}", p)),
            lines_read = stats.lines_read,
            rows_inserted = stats.rows_inserted,
            rows_skipped = stats.rows_skipped,
            rows_per_second = %format!("{:.0}", snapshot.rows_per_second),
            eta_seconds = ?snapshot.eta.map(|eta| eta.as_secs()),
            "Load progress"
        );
        snapshot
    }

    /// Logs only when the interval has passed.
    pub fn maybe_report(&mut self, stats: &RunStats) -> Option<ProgressSnapshot> {
        if self.is_due() {
            Some(self.report(stats))
        } else {
            None
        }
    }
}
