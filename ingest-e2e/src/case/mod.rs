//! Verification cases driven by a [`crate::runner::CaseRunner`].
//!
//! A case owns its collaborators and exposes the four steps of a run: creating the fixture,
//! sending the records, verifying convergence and reclaiming resources.

mod base;
mod schema_evolution;

pub use base::Case;
pub use schema_evolution::SchemaEvolutionCase;
