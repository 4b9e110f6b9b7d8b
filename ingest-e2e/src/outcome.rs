use std::fmt;
use thiserror::Error;

use crate::error::IngestError;

/// Classification of a single verification attempt.
///
/// The verifier never loops nor sleeps: a driver keeps invoking it while the outcome is
/// [`VerificationOutcome::Retryable`] and stops on anything else.
#[derive(Debug, Clone, PartialEq)]
pub enum VerificationOutcome {
    /// Schema and row count match the expectations.
    Converged,
    /// The pipeline has not caught up yet.
    Retryable(RetryReason),
    /// The observed state can never converge.
    NonRetryable(Defect),
}

impl VerificationOutcome {
    pub fn is_converged(&self) -> bool {
        matches!(self, VerificationOutcome::Converged)
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, VerificationOutcome::Retryable(_))
    }

    pub fn is_non_retryable(&self) -> bool {
        matches!(self, VerificationOutcome::NonRetryable(_))
    }

    /// Returns the defect of a non-retryable outcome.
    pub fn defect(&self) -> Option<&Defect> {
        match self {
            VerificationOutcome::NonRetryable(defect) => Some(defect),
            _ => None,
        }
    }
}

impl fmt::Display for VerificationOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VerificationOutcome::Converged => f.write_str("converged"),
            VerificationOutcome::Retryable(reason) => write!(f, "retryable: {reason}"),
            VerificationOutcome::NonRetryable(defect) => write!(f, "non-retryable: {defect}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryReason {
    /// The table exists with the expected schema but holds no row.
    NoRowsYet,
}

impl fmt::Display for RetryReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RetryReason::NoRowsYet => f.write_str("table is still empty"),
        }
    }
}

/// A permanent discrepancy between the table and the expectations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Defect {
    #[error("column {column} has type {observed}, expected a type starting with {expected}")]
    ColumnTypeMismatch {
        column: String,
        observed: String,
        expected: String,
    },

    #[error("column {column} of type {observed} is not part of the expected schema")]
    UnexpectedColumn { column: String, observed: String },

    #[error("expected columns are missing from the table: {}", .0.join(", "))]
    MissingColumns(Vec<String>),

    #[error(
        "number of records in table is different from number of records sent, expected {expected}, observed {observed}"
    )]
    RowCountMismatch { expected: u64, observed: u64 },

    #[error("querying the table failed: {0}")]
    Query(#[source] IngestError),
}
