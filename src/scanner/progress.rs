//! Percent-complete and ETA arithmetic for the emission phase.

use std::time::{Duration, Instant};

use super::types::ScanProgress;

pub const NO_FILES_MESSAGE: &str = "No files found above threshold.";

/// Integer percent, truncated. `total == 0` counts as done.
pub fn percent(processed: usize, total: usize) -> u8 {
    if total == 0 {
        return 100;
    }
    let processed = processed.min(total) as u128;
    (processed * 100 / total as u128) as u8
}

/// Seconds remaining, extrapolated from the mean time per processed item.
pub fn eta_secs(elapsed: Duration, processed: usize, total: usize) -> u64 {
    if processed == 0 || processed >= total {
        return 0;
    }
    let per_item = elapsed.as_secs_f64() / processed as f64;
    (per_item * (total - processed) as f64) as u64
}

/// Progress bookkeeping for one emission phase.
#[derive(Debug)]
pub struct ProgressTracker {
    started: Instant,
    total: usize,
    processed: usize,
}

impl ProgressTracker {
    pub fn new(total: usize) -> Self {
        Self::starting_at(Instant::now(), total)
    }

    pub fn starting_at(started: Instant, total: usize) -> Self {
        Self {
            started,
            total,
            processed: 0,
        }
    }

    pub fn processed(&self) -> usize {
        self.processed
    }

    /// Count one more emitted file and build its progress event.
    pub fn advance(&mut self, name: &str) -> ScanProgress {
        self.advance_at(Instant::now(), name)
    }

    pub fn advance_at(&mut self, now: Instant, name: &str) -> ScanProgress {
        self.processed += 1;
        let elapsed = now.saturating_duration_since(self.started);
        let eta = eta_secs(elapsed, self.processed, self.total);

        ScanProgress {
            percent: percent(self.processed, self.total),
            message: format!(
                "{} | {} of {} | ~{}s left",
                name, self.processed, self.total, eta
            ),
            eta_secs: eta,
        }
    }
}

/// The single progress event of a scan that found nothing.
pub fn empty_result() -> ScanProgress {
    ScanProgress {
        percent: 100,
        message: NO_FILES_MESSAGE.to_string(),
        eta_secs: 0,
    }
}
