//! Uniform skip-or-terminate policy for per-track failures.

/// Decision taken after a track-level failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryVerdict {
    /// Advance to the next scheduled track.
    Skip,
    /// Too many consecutive failures; end the channel.
    Terminate,
}

/// Tracks the run length of consecutive track failures for one channel.
///
/// Failure kinds are not distinguished — an open error and a mid-stream
/// error count the same; only the number of consecutive failures drives
/// escalation. Any successful track completion resets the count.
#[derive(Debug)]
pub struct FailureRecoveryPolicy {
    threshold: usize,
    consecutive_failures: usize,
}

impl FailureRecoveryPolicy {
    /// `threshold` is clamped to at least 1.
    pub fn new(threshold: usize) -> Self {
        Self {
            threshold: threshold.max(1),
            consecutive_failures: 0,
        }
    }

    /// Records one failed track and decides whether to keep going.
    pub fn on_failure(&mut self) -> RecoveryVerdict {
        self.consecutive_failures += 1;
        if self.consecutive_failures >= self.threshold {
            RecoveryVerdict::Terminate
        } else {
            RecoveryVerdict::Skip
        }
    }

    /// Records one successfully completed track.
    pub fn on_success(&mut self) {
        self.consecutive_failures = 0;
    }

    pub fn consecutive_failures(&self) -> usize {
        self.consecutive_failures
    }

    pub fn threshold(&self) -> usize {
        self.threshold
    }
}
