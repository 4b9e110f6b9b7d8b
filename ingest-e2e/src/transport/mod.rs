//! Message transport abstractions.
//!
//! Provides the [`Transport`] trait used to hand records to the ingestion pipeline and an
//! in-memory implementation that keeps every message it receives.

mod base;
pub mod memory;

pub use base::Transport;
