//! Macros for error handling.
//!
//! Provides convenience macros for creating and returning [`crate::error::IngestError`] instances
//! with reduced boilerplate.

/// Creates an [`crate::error::IngestError`] from error kind and description, with an optional
/// dynamic detail.
#[macro_export]
macro_rules! ingest_error {
    ($kind:expr, $desc:expr) => {
        $crate::error::IngestError::from(($kind, $desc))
    };
    ($kind:expr, $desc:expr, $detail:expr) => {
        $crate::error::IngestError::from(($kind, $desc, $detail.to_string()))
    };
}

/// Creates and returns an [`crate::error::IngestError`] from the current function.
#[macro_export]
macro_rules! bail {
    ($kind:expr, $desc:expr) => {
        return Err($crate::ingest_error!($kind, $desc))
    };
    ($kind:expr, $desc:expr, $detail:expr) => {
        return Err($crate::ingest_error!($kind, $desc, $detail))
    };
}
