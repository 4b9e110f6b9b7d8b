use std::collections::HashSet;

use crate::bail;
use crate::error::{ErrorKind, IngestResult};
use crate::types::ResultSet;

/// Column injected by the pipeline with the lineage of every ingested record.
pub const RECORD_METADATA_COLUMN: &str = "RECORD_METADATA";

/// Expected type of [`RECORD_METADATA_COLUMN`].
pub const RECORD_METADATA_TYPE: &str = "VARIANT";

/// Returns `true` if a declared column type satisfies an expected type prefix.
///
/// Stores decorate types with precision and length, so `NUMBER(38,0)` satisfies `NUMBER`.
pub fn type_matches(observed: &str, expected: &str) -> bool {
    observed.starts_with(expected)
}

/// The columns a table must contain once ingestion converged, each with its expected type
/// prefix.
///
/// The metadata column is always part of the schema and is appended last unless the caller
/// already listed it.
#[derive(Debug, Clone, PartialEq)]
pub struct GoldenSchema {
    columns: Vec<(String, String)>,
}

impl GoldenSchema {
    pub fn new<N, T>(columns: impl IntoIterator<Item = (N, T)>) -> Self
    where
        N: Into<String>,
        T: Into<String>,
    {
        let mut golden: Vec<(String, String)> = Vec::new();
        for (name, expected_type) in columns {
            let name = name.into();
            let expected_type = expected_type.into();
            match golden.iter_mut().find(|(existing, _)| *existing == name) {
                Some((_, existing_type)) => *existing_type = expected_type,
                None => golden.push((name, expected_type)),
            }
        }

        if !golden
            .iter()
            .any(|(name, _)| name == RECORD_METADATA_COLUMN)
        {
            golden.push((
                RECORD_METADATA_COLUMN.to_string(),
                RECORD_METADATA_TYPE.to_string(),
            ));
        }

        Self { columns: golden }
    }

    /// Returns the expected type prefix of a column, [`None`] if the column is not expected.
    pub fn expected_type(&self, column: &str) -> Option<&str> {
        self.columns
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, expected_type)| expected_type.as_str())
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|(name, _)| name.as_str())
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Returns the expected columns absent from `seen`, in schema order.
    pub fn missing_columns(&self, seen: &HashSet<&str>) -> Vec<String> {
        self.column_names()
            .filter(|name| !seen.contains(name))
            .map(str::to_string)
            .collect()
    }
}

/// A column as described by the store.
#[derive(Debug, Clone, PartialEq)]
pub struct ObservedColumn {
    pub name: String,
    pub declared_type: String,
}

/// The live schema of a table, sampled once per verification attempt.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ObservedSchema {
    pub columns: Vec<ObservedColumn>,
}

impl ObservedSchema {
    /// Builds the schema from the result of a table description.
    ///
    /// Every row must carry the column name at position 0 and its declared type at position 1,
    /// any further positions are ignored.
    pub fn from_result_set(result_set: &ResultSet) -> IngestResult<Self> {
        let mut columns = Vec::with_capacity(result_set.fetch_all().len());
        for row in result_set.fetch_all() {
            let (Some(name), Some(declared_type)) = (
                row.get(0).and_then(|cell| cell.as_str()),
                row.get(1).and_then(|cell| cell.as_str()),
            ) else {
                bail!(
                    ErrorKind::StoreResultInvalid,
                    "Table description row has no name and type",
                    format!("row: {:?}", row.values)
                );
            };

            columns.push(ObservedColumn {
                name: name.to_string(),
                declared_type: declared_type.to_string(),
            });
        }

        Ok(Self { columns })
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|column| column.name.as_str())
    }
}
