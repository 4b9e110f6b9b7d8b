//! Tabular store abstractions.
//!
//! Provides the [`Store`] trait through which the case issues DDL and queries, and an in-memory
//! implementation that understands the handful of statements the case issues.

mod base;
pub mod memory;

pub use base::Store;
