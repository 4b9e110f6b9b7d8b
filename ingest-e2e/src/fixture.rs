//! Fixture construction for the schema evolution case.
//!
//! A fixture is the target table, the pool of records with diverging field sets, and the golden
//! schema the table must converge to. Building it creates the table with a single baseline column
//! so that the pipeline is forced to widen it.

use std::collections::BTreeSet;
use tracing::info;
use uuid::Uuid;

use crate::bail;
use crate::error::{ErrorKind, IngestResult};
use crate::store::Store;
use crate::types::{GoldenSchema, RECORD_METADATA_COLUMN, Record};

/// Base name shared by the case's table and its declarative connector configuration.
pub const SCHEMA_EVOLUTION_FILE_NAME: &str = "travis_correct_schema_evolution_json";

/// Returns a fresh salt making table and channel names unique across concurrent runs.
pub fn random_name_salt() -> String {
    format!("_{}", Uuid::new_v4().simple())
}

/// The immutable data a case runs against.
#[derive(Debug, Clone, PartialEq)]
pub struct Fixture {
    file_name: String,
    table_name: String,
    channels: Vec<String>,
    records: Vec<Record>,
    golden_schema: GoldenSchema,
    record_num: usize,
    expected_row_count: u64,
    baseline_column: (String, String),
}

impl Fixture {
    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    pub fn channels(&self) -> &[String] {
        &self.channels
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn golden_schema(&self) -> &GoldenSchema {
        &self.golden_schema
    }

    pub fn record_num(&self) -> usize {
        self.record_num
    }

    /// Name of the declarative configuration describing the transport topology of this case.
    pub fn config_file_name(&self) -> String {
        format!("{}.json", self.file_name)
    }

    /// Returns the record replayed by the channel at `channel_index`.
    ///
    /// Channels cycle through the record pool.
    pub fn record_for_channel(&self, channel_index: usize) -> &Record {
        &self.records[channel_index % self.records.len()]
    }

    /// Number of rows the table holds once every emitted record landed.
    pub fn expected_row_count(&self) -> u64 {
        self.expected_row_count
    }

    /// Creates (or replaces) the table with the baseline column only.
    ///
    /// A failing DDL statement is returned as is, it is not retried.
    pub async fn create_table<S: Store>(&self, store: &S) -> IngestResult<()> {
        let (column, declared_type) = &self.baseline_column;
        let statement = format!(
            "CREATE OR REPLACE TABLE {} ({column} {declared_type})",
            self.table_name
        );
        store.execute(&statement).await?;

        info!(
            table = %self.table_name,
            channels = self.channels.len(),
            records = self.records.len(),
            "created fixture table"
        );

        Ok(())
    }
}

/// Builder for a [`Fixture`].
///
/// [`FixtureBuilder::schema_evolution`] returns the records and golden schema of the schema
/// evolution case; [`FixtureBuilder::new`] starts from an empty pool for custom scenarios.
#[derive(Debug, Clone)]
pub struct FixtureBuilder {
    file_name: String,
    name_salt: String,
    channel_count: usize,
    record_num: usize,
    baseline_column: (String, String),
    records: Vec<Record>,
    golden_schema: Option<GoldenSchema>,
}

impl FixtureBuilder {
    pub fn new(file_name: impl Into<String>, name_salt: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
            name_salt: name_salt.into(),
            channel_count: 1,
            record_num: 1,
            baseline_column: ("PERFORMANCE_STRING".to_string(), "STRING".to_string()),
            records: Vec::new(),
            golden_schema: None,
        }
    }

    /// Two JSON records sharing only `PERFORMANCE_STRING`, sent through two channels.
    pub fn schema_evolution(name_salt: impl Into<String>) -> Self {
        Self::new(SCHEMA_EVOLUTION_FILE_NAME, name_salt)
            .channel_count(2)
            .record_num(100)
            .record(
                Record::new()
                    .with("PERFORMANCE_STRING", "Excellent")
                    .with("PERFORMANCE_CHAR", "A")
                    .with("RATING_INT", 100_i64),
            )
            .record(
                Record::new()
                    .with("PERFORMANCE_STRING", "Excellent")
                    .with("RATING_DOUBLE", 0.99_f64)
                    .with("APPROVAL", true),
            )
            .golden_schema(GoldenSchema::new([
                ("PERFORMANCE_STRING", "VARCHAR"),
                ("PERFORMANCE_CHAR", "VARCHAR"),
                ("RATING_INT", "NUMBER"),
                ("RATING_DOUBLE", "FLOAT"),
                ("APPROVAL", "BOOLEAN"),
            ]))
    }

    pub fn channel_count(mut self, channel_count: usize) -> Self {
        self.channel_count = channel_count;
        self
    }

    pub fn record_num(mut self, record_num: usize) -> Self {
        self.record_num = record_num;
        self
    }

    /// Sets the only column the table is created with.
    pub fn baseline_column(
        mut self,
        name: impl Into<String>,
        declared_type: impl Into<String>,
    ) -> Self {
        self.baseline_column = (name.into(), declared_type.into());
        self
    }

    pub fn record(mut self, record: Record) -> Self {
        self.records.push(record);
        self
    }

    pub fn golden_schema(mut self, golden_schema: GoldenSchema) -> Self {
        self.golden_schema = Some(golden_schema);
        self
    }

    /// Name of the table the fixture creates.
    pub fn table_name(&self) -> String {
        format!("{}{}", self.file_name, self.name_salt)
    }

    /// Builds the fixture without touching the store.
    ///
    /// Fails if some record would never be sent, or if the union of the record fields plus the
    /// metadata column is not exactly the key set of the golden schema.
    pub fn assemble(self) -> IngestResult<Fixture> {
        if self.channel_count == 0 {
            bail!(ErrorKind::ConfigError, "A fixture needs at least one channel");
        }

        if self.record_num == 0 {
            bail!(
                ErrorKind::ConfigError,
                "A fixture needs at least one copy per channel"
            );
        }

        if self.records.is_empty() {
            bail!(ErrorKind::InvalidState, "A fixture needs at least one record");
        }

        // Channel `i` sends record `i mod |records|`, so records past the last channel are never
        // sent and their fields could not reach the table.
        if self.channel_count < self.records.len() {
            bail!(
                ErrorKind::ConfigError,
                "Every record needs a channel",
                format!(
                    "channels: {}, records: {}",
                    self.channel_count,
                    self.records.len()
                )
            );
        }

        let Some(expected_row_count) = (self.channel_count as u64).checked_mul(self.record_num as u64)
        else {
            bail!(
                ErrorKind::ConfigError,
                "Expected row count overflows",
                format!(
                    "channels: {}, copies per channel: {}",
                    self.channel_count, self.record_num
                )
            );
        };

        let Some(golden_schema) = self.golden_schema.clone() else {
            bail!(ErrorKind::InvalidState, "A fixture needs a golden schema");
        };

        let mut record_columns: BTreeSet<&str> = self
            .records
            .iter()
            .flat_map(|record| record.field_names())
            .collect();
        record_columns.insert(RECORD_METADATA_COLUMN);
        let golden_columns: BTreeSet<&str> = golden_schema.column_names().collect();

        if record_columns != golden_columns {
            let unexpected: Vec<&str> = record_columns.difference(&golden_columns).copied().collect();
            let unreachable: Vec<&str> = golden_columns.difference(&record_columns).copied().collect();
            bail!(
                ErrorKind::InvalidState,
                "Record fields do not match the golden schema",
                format!(
                    "not in golden schema: [{}], never produced by a record: [{}]",
                    unexpected.join(", "),
                    unreachable.join(", ")
                )
            );
        }

        let table_name = self.table_name();
        let channels = (0..self.channel_count)
            .map(|index| format!("{table_name}{index}"))
            .collect();

        Ok(Fixture {
            file_name: self.file_name,
            table_name,
            channels,
            records: self.records,
            golden_schema,
            record_num: self.record_num,
            expected_row_count,
            baseline_column: self.baseline_column,
        })
    }

    /// Assembles the fixture and creates its table, see [`Fixture::create_table`].
    pub async fn build<S: Store>(self, store: &S) -> IngestResult<Fixture> {
        let fixture = self.assemble()?;
        fixture.create_table(store).await?;

        Ok(fixture)
    }
}
