//! End-to-end verification of schema evolution in a streaming ingestion pipeline.
//!
//! A [`case::SchemaEvolutionCase`] creates a table with a single column, sends JSON records with
//! diverging field sets through a [`transport::Transport`], and polls a [`store::Store`] until the
//! table has been widened to the expected schema and holds every record. The
//! [`runner::CaseRunner`] drives a case with retries and always reclaims its resources.

pub mod case;
pub mod emitter;
pub mod error;
pub mod fixture;
mod macros;
pub mod outcome;
pub mod reclaimer;
pub mod runner;
pub mod store;
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
pub mod transport;
pub mod types;
pub mod verifier;
