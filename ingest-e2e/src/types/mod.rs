//! Common types used throughout the verification case.
//!
//! Scalar cells, fixture records, expected and observed schemas, and the result sets returned by
//! the store.

mod cell;
mod record;
mod result_set;
mod schema;

pub use cell::*;
pub use record::*;
pub use result_set::*;
pub use schema::*;
