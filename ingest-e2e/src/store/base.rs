use std::future::Future;

use crate::error::IngestResult;
use crate::types::ResultSet;

/// A SQL-like store holding the table that the pipeline writes into.
///
/// Every call is a single blocking round trip from the point of view of the case: it either
/// completes with a [`ResultSet`] or fails, it is never retried by the caller.
pub trait Store {
    fn execute(&self, statement: &str) -> impl Future<Output = IngestResult<ResultSet>> + Send;
}

impl<S> Store for &S
where
    S: Store + Sync + ?Sized,
{
    fn execute(&self, statement: &str) -> impl Future<Output = IngestResult<ResultSet>> + Send {
        (**self).execute(statement)
    }
}
