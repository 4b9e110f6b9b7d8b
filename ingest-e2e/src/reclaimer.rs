use tracing::{info, warn};

use crate::error::IngestError;
use crate::store::Store;

/// Prefix of every staging resource the ingestion connector creates.
const CONNECTOR_RESOURCE_PREFIX: &str = "SNOWFLAKE_KAFKA_CONNECTOR";

/// Drops the table of a case and the staging resources the pipeline created for it.
///
/// Every statement is guarded by `IF EXISTS`, so reclaiming is safe after a failed setup and can
/// be repeated.
#[derive(Debug, Clone)]
pub struct ResourceReclaimer {
    table: String,
    connector: String,
    partitions: usize,
}

impl ResourceReclaimer {
    /// Creates a reclaimer for a table whose connector is named after the table.
    pub fn new(table: impl Into<String>, partitions: usize) -> Self {
        let table = table.into();
        Self {
            connector: table.clone(),
            table,
            partitions,
        }
    }

    pub fn with_connector(mut self, connector: impl Into<String>) -> Self {
        self.connector = connector.into();
        self
    }

    pub fn stage_name(&self) -> String {
        format!(
            "{CONNECTOR_RESOURCE_PREFIX}_{}_STAGE_{}",
            self.connector, self.table
        )
    }

    pub fn pipe_name(&self, partition: usize) -> String {
        format!(
            "{CONNECTOR_RESOURCE_PREFIX}_{}_PIPE_{}_{partition}",
            self.connector, self.table
        )
    }

    /// Statements issued by [`ResourceReclaimer::reclaim`], in order.
    pub fn statements(&self) -> Vec<String> {
        let mut statements = vec![
            format!("DROP TABLE IF EXISTS {}", self.table),
            format!("DROP STAGE IF EXISTS {}", self.stage_name()),
        ];
        statements.extend(
            (0..self.partitions)
                .map(|partition| format!("DROP PIPE IF EXISTS {}", self.pipe_name(partition))),
        );

        statements
    }

    /// Issues every drop statement, logging failures without stopping.
    ///
    /// Returns the swallowed failures aggregated into one error, [`None`] if every statement
    /// succeeded.
    pub async fn reclaim<S: Store>(&self, store: &S) -> Option<IngestError> {
        let mut errors = Vec::new();

        for statement in self.statements() {
            if let Err(err) = store.execute(&statement).await {
                warn!(statement = %statement, error = %err, "failed to drop resource");
                errors.push(err);
            }
        }

        info!(
            table = %self.table,
            failures = errors.len(),
            "reclaimed case resources"
        );

        if errors.is_empty() {
            None
        } else {
            Some(IngestError::many(errors))
        }
    }
}
