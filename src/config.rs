use std::time::Duration;

/// Shortest wait between pause checks; a zero wait would spin.
pub const MIN_PAUSE_POLL: Duration = Duration::from_millis(1);

/// Tuning for the emission phase of a scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanConfig {
    /// Delay between emitted files, keeps a live view readable (zero disables)
    pace: Duration,
    /// Upper bound on each wait while paused
    pause_poll: Duration,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            pace: Duration::from_millis(50),
            pause_poll: Duration::from_millis(100),
        }
    }
}

impl ScanConfig {
    /// No pacing delay.
    pub fn immediate() -> Self {
        Self::default().with_pace(Duration::ZERO)
    }

    pub fn pace(&self) -> Duration {
        self.pace
    }

    pub fn pause_poll(&self) -> Duration {
        self.pause_poll
    }

    pub fn with_pace(mut self, pace: Duration) -> Self {
        self.pace = pace;
        self
    }

    pub fn with_pause_poll(mut self, poll: Duration) -> Self {
        self.pause_poll = poll.max(MIN_PAUSE_POLL);
        self
    }
}
