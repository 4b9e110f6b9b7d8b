use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::shared::ValidationError;

/// Retry policy used by the scheduler that re-invokes verification.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Maximum number of verification attempts before giving up.
    pub max_attempts: u32,
    /// Initial delay, in milliseconds, before the second attempt.
    pub initial_delay_ms: u64,
    /// Maximum delay between attempts.
    pub max_delay_ms: u64,
    /// Exponential backoff multiplier applied to the delay after each attempt.
    pub backoff_factor: f32,
    /// Overall deadline, in milliseconds, measured from the first attempt.
    pub timeout_ms: u64,
}

impl RetryConfig {
    /// Returns the delay to wait after the given zero-based attempt failed.
    ///
    /// The delay grows by `backoff_factor` per attempt and is capped at `max_delay_ms`.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let factor = f64::from(self.backoff_factor).powi(attempt as i32);
        let delay_ms = (self.initial_delay_ms as f64 * factor).min(self.max_delay_ms as f64);

        Duration::from_millis(delay_ms as u64)
    }

    /// Returns the overall deadline as a [`Duration`].
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.max_attempts == 0 {
            return Err(ValidationError::MaxAttemptsZero);
        }

        if self.backoff_factor < 1.0 {
            return Err(ValidationError::BackoffFactorTooSmall(self.backoff_factor));
        }

        Ok(())
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_delay_ms: 500,
            max_delay_ms: 10_000,
            backoff_factor: 2.0,
            timeout_ms: 300_000,
        }
    }
}
