//! Utilities for exercising cases without external systems.
//!
//! The in-memory store and transport live next to their traits; this module adds the simulated
//! ingestion hop that moves records from one to the other.

pub mod pipeline;
