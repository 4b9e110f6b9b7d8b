use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    /// The case needs at least one channel to send records through.
    #[error("`channel_count` cannot be zero")]
    ChannelCountZero,
    /// Every channel must emit at least one copy of its record.
    #[error("`record_num` cannot be zero")]
    RecordNumZero,
    /// Each channel is backed by at least one partition.
    #[error("`partitions_per_channel` cannot be zero")]
    PartitionsZero,
    /// The scheduler must attempt verification at least once.
    #[error("`retry.max_attempts` cannot be zero")]
    MaxAttemptsZero,
    /// Backoff must not shrink the delay between attempts.
    #[error("`retry.backoff_factor` must be at least 1.0, got {0}")]
    BackoffFactorTooSmall(f32),
}
