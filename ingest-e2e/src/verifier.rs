//! Convergence verification of the target table.
//!
//! Every call to [`ConvergenceVerifier::verify`] is a single poll: it samples the live schema and
//! the row count once and classifies the result. Retrying is left to the caller.

use std::collections::HashSet;
use tracing::{error, info, warn};

use crate::error::{ErrorKind, IngestResult};
use crate::fixture::Fixture;
use crate::outcome::{Defect, RetryReason, VerificationOutcome};
use crate::store::Store;
use crate::types::{GoldenSchema, ObservedSchema, type_matches};
use crate::{bail, ingest_error};

#[derive(Debug, Clone)]
pub struct ConvergenceVerifier {
    table: String,
    golden_schema: GoldenSchema,
    expected_row_count: u64,
}

impl ConvergenceVerifier {
    pub fn new(
        table: impl Into<String>,
        golden_schema: GoldenSchema,
        expected_row_count: u64,
    ) -> Self {
        Self {
            table: table.into(),
            golden_schema,
            expected_row_count,
        }
    }

    pub fn for_fixture(fixture: &Fixture) -> Self {
        Self::new(
            fixture.table_name(),
            fixture.golden_schema().clone(),
            fixture.expected_row_count(),
        )
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn expected_row_count(&self) -> u64 {
        self.expected_row_count
    }

    /// Compares the observed schema with the golden schema.
    ///
    /// Observed columns are scanned once, the first unexpected column or type mismatch aborts the
    /// scan. Expected columns never observed are then reported together, in golden order. A
    /// column the store describes twice is accepted as long as each description has a matching
    /// type.
    pub fn check_schema(&self, observed: &ObservedSchema) -> Result<(), Defect> {
        let mut seen = HashSet::with_capacity(observed.columns.len());

        for column in &observed.columns {
            let Some(expected) = self.golden_schema.expected_type(&column.name) else {
                return Err(Defect::UnexpectedColumn {
                    column: column.name.clone(),
                    observed: column.declared_type.clone(),
                });
            };

            if !type_matches(&column.declared_type, expected) {
                return Err(Defect::ColumnTypeMismatch {
                    column: column.name.clone(),
                    observed: column.declared_type.clone(),
                    expected: expected.to_string(),
                });
            }

            seen.insert(column.name.as_str());
        }

        let missing = self.golden_schema.missing_columns(&seen);
        if !missing.is_empty() {
            return Err(Defect::MissingColumns(missing));
        }

        Ok(())
    }

    /// Classifies the row count of a table whose schema already matched.
    pub fn classify_row_count(&self, row_count: u64) -> VerificationOutcome {
        if row_count == 0 {
            VerificationOutcome::Retryable(RetryReason::NoRowsYet)
        } else if row_count != self.expected_row_count {
            VerificationOutcome::NonRetryable(Defect::RowCountMismatch {
                expected: self.expected_row_count,
                observed: row_count,
            })
        } else {
            VerificationOutcome::Converged
        }
    }

    /// Runs one verification attempt against the store.
    ///
    /// The row count is only queried once the schema matched. Store failures are classified as
    /// [`Defect::Query`].
    pub async fn verify<S: Store>(&self, store: &S, attempt: u32) -> VerificationOutcome {
        let outcome = match self.observe_schema(store).await {
            Ok(observed) => match self.check_schema(&observed) {
                Ok(()) => match self.observe_row_count(store).await {
                    Ok(row_count) => self.classify_row_count(row_count),
                    Err(err) => VerificationOutcome::NonRetryable(Defect::Query(err)),
                },
                Err(defect) => VerificationOutcome::NonRetryable(defect),
            },
            Err(err) => VerificationOutcome::NonRetryable(Defect::Query(err)),
        };

        match &outcome {
            VerificationOutcome::Converged => {
                info!(table = %self.table, attempt, "table converged");
            }
            VerificationOutcome::Retryable(reason) => {
                warn!(table = %self.table, attempt, %reason, "table has not converged yet");
            }
            VerificationOutcome::NonRetryable(defect) => {
                error!(table = %self.table, attempt, %defect, "table can not converge");
            }
        }

        outcome
    }

    async fn observe_schema<S: Store>(&self, store: &S) -> IngestResult<ObservedSchema> {
        let description = store.execute(&format!("DESC TABLE {}", self.table)).await?;

        ObservedSchema::from_result_set(&description)
    }

    async fn observe_row_count<S: Store>(&self, store: &S) -> IngestResult<u64> {
        let result = store
            .execute(&format!("SELECT COUNT(*) FROM {}", self.table))
            .await?;

        let Some(row) = result.fetch_one() else {
            bail!(
                ErrorKind::StoreResultInvalid,
                "Row count query returned no row",
                format!("table: {}", self.table)
            );
        };

        row.get(0)
            .ok_or_else(|| {
                ingest_error!(
                    ErrorKind::StoreResultInvalid,
                    "Row count query returned an empty row",
                    format!("table: {}", self.table)
                )
            })?
            .to_count()
    }
}
