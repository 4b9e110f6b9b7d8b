//! Configuration management for ingestion verification cases.
//!
//! Provides environment detection, configuration loading from YAML files and
//! shared configuration types for the case and its retry scheduler.

mod environment;
mod load;
pub mod shared;

pub use environment::*;
pub use load::*;
