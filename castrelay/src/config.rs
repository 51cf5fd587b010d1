//! Per-channel relay tuning.

use crate::icy::DEFAULT_METAINT;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Tuning knobs for one channel's relay loop.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    /// Audio bytes between in-band metadata blocks; `None` disables
    /// metadata injection. Fixed for the channel's lifetime once the
    /// relay starts — changing it mid-stream desynchronizes any client
    /// that latched onto the declared value.
    pub metaint: Option<usize>,

    /// Upper bound on a single sink write before that sink is detached.
    pub write_timeout_ms: u64,

    /// Consecutive track failures tolerated before the channel
    /// terminates; `None` means the playlist length.
    pub failure_threshold: Option<usize>,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            metaint: Some(DEFAULT_METAINT),
            write_timeout_ms: 5_000,
            failure_threshold: None,
        }
    }
}

impl RelayConfig {
    pub fn write_timeout(&self) -> Duration {
        Duration::from_millis(self.write_timeout_ms)
    }

    /// Raw byte relay, no metadata blocks.
    pub fn without_metadata(mut self) -> Self {
        self.metaint = None;
        self
    }

    pub fn with_metaint(mut self, metaint: usize) -> Self {
        self.metaint = Some(metaint);
        self
    }

    pub fn with_failure_threshold(mut self, threshold: usize) -> Self {
        self.failure_threshold = Some(threshold);
        self
    }
}
