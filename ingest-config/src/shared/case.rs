use serde::{Deserialize, Serialize};

use crate::shared::{RetryConfig, ValidationError};

/// Configuration of the schema evolution verification case.
///
/// The fixture itself (records and golden schema) is fixed; this only tunes how much data is
/// pushed through the pipeline and how the scheduler polls for convergence.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaseConfig {
    /// Number of channels (topics) the records are sent through.
    pub channel_count: usize,
    /// Number of copies each channel emits of its assigned record.
    pub record_num: usize,
    /// Number of partitions behind each channel, used to name pipeline staging resources.
    pub partitions_per_channel: usize,
    /// Retry policy for the verification scheduler.
    pub retry: RetryConfig,
}

impl CaseConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.channel_count == 0 {
            return Err(ValidationError::ChannelCountZero);
        }

        if self.record_num == 0 {
            return Err(ValidationError::RecordNumZero);
        }

        if self.partitions_per_channel == 0 {
            return Err(ValidationError::PartitionsZero);
        }

        self.retry.validate()
    }
}

impl Default for CaseConfig {
    fn default() -> Self {
        Self {
            channel_count: 2,
            record_num: 100,
            partitions_per_channel: 1,
            retry: RetryConfig::default(),
        }
    }
}
