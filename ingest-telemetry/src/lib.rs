//! Tracing setup for ingestion verification runs.
//!
//! Console output in development, rotated JSON files in production-like environments, and an
//! opt-in subscriber for tests.

mod tracing;

pub use crate::tracing::*;
