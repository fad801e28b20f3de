use crate::quality::QualityThresholds;
use serde::Deserialize;
use std::time::Duration;

/// Tunables for one enrollment session.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct EnrollSettings {
    /// Frames that must be stored before verification starts.
    pub target_enroll_frames: u32,
    /// Overall deadline for the enroll and verify loops.
    pub timeout_ms: u64,
    /// Wait before the first capture so the user and camera can settle.
    pub settle_delay_ms: u64,
    /// Pause after an iteration that did not advance.
    pub retry_backoff_ms: u64,
    /// Give up verifying after this many attempts. `None` verifies until
    /// success or cancellation.
    pub max_verify_attempts: Option<u32>,
    pub quality: QualityThresholds,
}

impl Default for EnrollSettings {
    fn default() -> Self {
        Self {
            target_enroll_frames: 5,
            timeout_ms: 30_000,
            settle_delay_ms: 500,
            retry_backoff_ms: 100,
            max_verify_attempts: None,
            quality: QualityThresholds::default(),
        }
    }
}

impl EnrollSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }
}
