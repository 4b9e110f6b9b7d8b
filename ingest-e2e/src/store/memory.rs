use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;

use crate::bail;
use crate::error::{ErrorKind, IngestResult};
use crate::store::base::Store;
use crate::types::{Cell, ResultSet, Row};

/// Statements understood by [`MemoryStore`].
#[derive(Debug, Clone, PartialEq)]
enum Statement {
    CreateOrReplaceTable {
        table: String,
        columns: Vec<(String, String)>,
    },
    DescribeTable {
        table: String,
    },
    CountRows {
        table: String,
    },
    DropTable {
        table: String,
    },
    DropStage {
        name: String,
    },
    DropPipe {
        name: String,
    },
}

impl Statement {
    fn parse(sql: &str) -> IngestResult<Self> {
        let sql = sql.trim().trim_end_matches(';').trim();

        if let Some(rest) = strip_keywords(sql, "CREATE OR REPLACE TABLE") {
            let Some((table, columns)) = rest.split_once('(') else {
                bail!(
                    ErrorKind::StoreQueryFailed,
                    "Table definition has no column list",
                    sql
                );
            };
            let Some(columns) = columns.trim_end().strip_suffix(')') else {
                bail!(
                    ErrorKind::StoreQueryFailed,
                    "Table definition is not closed",
                    sql
                );
            };

            let mut definitions = Vec::new();
            for definition in split_top_level(columns) {
                let mut parts = definition.split_whitespace();
                let (Some(name), Some(declared_type)) = (parts.next(), parts.next()) else {
                    bail!(
                        ErrorKind::StoreQueryFailed,
                        "Column definition needs a name and a type",
                        definition
                    );
                };
                definitions.push((identifier(name), normalize_type(declared_type)));
            }

            return Ok(Statement::CreateOrReplaceTable {
                table: identifier(table),
                columns: definitions,
            });
        }

        if let Some(table) =
            strip_keywords(sql, "DESC TABLE").or_else(|| strip_keywords(sql, "DESCRIBE TABLE"))
        {
            return Ok(Statement::DescribeTable {
                table: identifier(table),
            });
        }

        if let Some(table) = strip_keywords(sql, "SELECT COUNT(*) FROM") {
            return Ok(Statement::CountRows {
                table: identifier(table),
            });
        }

        if let Some(table) = strip_keywords(sql, "DROP TABLE IF EXISTS") {
            return Ok(Statement::DropTable {
                table: identifier(table),
            });
        }

        if let Some(name) = strip_keywords(sql, "DROP STAGE IF EXISTS") {
            return Ok(Statement::DropStage {
                name: identifier(name),
            });
        }

        if let Some(name) = strip_keywords(sql, "DROP PIPE IF EXISTS") {
            return Ok(Statement::DropPipe {
                name: identifier(name),
            });
        }

        bail!(ErrorKind::StoreQueryFailed, "Unsupported statement", sql)
    }
}

/// Strips a leading keyword sequence, ignoring ASCII case.
fn strip_keywords<'a>(sql: &'a str, keywords: &str) -> Option<&'a str> {
    let head = sql.get(..keywords.len())?;
    if !head.eq_ignore_ascii_case(keywords) {
        return None;
    }

    let rest = &sql[keywords.len()..];
    if !rest.starts_with(char::is_whitespace) {
        return None;
    }

    Some(rest.trim())
}

/// Splits a column list on commas that are not nested in parentheses.
fn split_top_level(columns: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;

    for (i, c) in columns.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                parts.push(columns[start..i].trim());
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(columns[start..].trim());

    parts.into_iter().filter(|part| !part.is_empty()).collect()
}

/// Unquoted identifiers are case-insensitive and stored upper-cased.
fn identifier(name: &str) -> String {
    name.trim().to_uppercase()
}

/// Maps type aliases to the fully qualified types the store reports back.
pub fn normalize_type(declared_type: &str) -> String {
    let declared_type = declared_type.trim().to_uppercase();
    match declared_type.as_str() {
        "STRING" | "TEXT" | "VARCHAR" => "VARCHAR(16777216)".to_string(),
        "INT" | "INTEGER" | "BIGINT" | "NUMBER" => "NUMBER(38,0)".to_string(),
        "DOUBLE" | "REAL" | "FLOAT" => "FLOAT".to_string(),
        _ => declared_type,
    }
}

#[derive(Debug, Default)]
struct MemoryTable {
    columns: Vec<(String, String)>,
    row_count: u64,
}

#[derive(Debug, Default)]
struct Inner {
    tables: HashMap<String, MemoryTable>,
    stages: HashSet<String>,
    pipes: HashSet<String>,
    executed_statements: Vec<String>,
    failing_prefixes: Vec<String>,
}

impl Inner {
    fn table_mut(&mut self, table: &str) -> IngestResult<&mut MemoryTable> {
        let table = identifier(table);
        match self.tables.get_mut(&table) {
            Some(memory_table) => Ok(memory_table),
            None => bail!(
                ErrorKind::StoreQueryFailed,
                "Table does not exist",
                format!("table: {table}")
            ),
        }
    }

    fn apply(&mut self, statement: Statement) -> IngestResult<ResultSet> {
        match statement {
            Statement::CreateOrReplaceTable { table, columns } => {
                self.tables.insert(
                    table,
                    MemoryTable {
                        columns,
                        row_count: 0,
                    },
                );

                Ok(ResultSet::empty())
            }
            Statement::DescribeTable { table } => {
                let memory_table = self.table_mut(&table)?;
                let rows = memory_table
                    .columns
                    .iter()
                    .map(|(name, declared_type)| {
                        Row::new(vec![
                            Cell::from(name.as_str()),
                            Cell::from(declared_type.as_str()),
                            Cell::from("COLUMN"),
                        ])
                    })
                    .collect();

                Ok(ResultSet::new(rows))
            }
            Statement::CountRows { table } => {
                let memory_table = self.table_mut(&table)?;
                let count = Cell::I64(memory_table.row_count as i64);

                Ok(ResultSet::new(vec![Row::new(vec![count])]))
            }
            Statement::DropTable { table } => {
                self.tables.remove(&table);
                Ok(ResultSet::empty())
            }
            Statement::DropStage { name } => {
                self.stages.remove(&name);
                Ok(ResultSet::empty())
            }
            Statement::DropPipe { name } => {
                self.pipes.remove(&name);
                Ok(ResultSet::empty())
            }
        }
    }
}

/// In-memory [`Store`] emulating a warehouse with automatic type widening.
///
/// Cloning the store shares its state, so a test can keep a handle to inspect or mutate the
/// tables while the case owns another.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every later statement starting with `prefix` (ignoring case) fail.
    pub async fn fail_statements_starting_with(&self, prefix: &str) {
        let mut inner = self.inner.lock().await;
        inner.failing_prefixes.push(prefix.to_uppercase());
    }

    /// Returns all statements received so far, including the failed ones.
    pub async fn executed_statements(&self) -> Vec<String> {
        let inner = self.inner.lock().await;
        inner.executed_statements.clone()
    }

    pub async fn table_exists(&self, table: &str) -> bool {
        let inner = self.inner.lock().await;
        inner.tables.contains_key(&identifier(table))
    }

    pub async fn table_columns(&self, table: &str) -> Option<Vec<(String, String)>> {
        let inner = self.inner.lock().await;
        inner
            .tables
            .get(&identifier(table))
            .map(|memory_table| memory_table.columns.clone())
    }

    pub async fn row_count(&self, table: &str) -> Option<u64> {
        let inner = self.inner.lock().await;
        inner
            .tables
            .get(&identifier(table))
            .map(|memory_table| memory_table.row_count)
    }

    /// Adds a column unless it already exists. Returns whether the column was added.
    pub async fn add_column(
        &self,
        table: &str,
        column: &str,
        declared_type: &str,
    ) -> IngestResult<bool> {
        let mut inner = self.inner.lock().await;
        let memory_table = inner.table_mut(table)?;

        let column = identifier(column);
        if memory_table.columns.iter().any(|(name, _)| *name == column) {
            return Ok(false);
        }

        info!(table, column = %column, declared_type, "adding column");
        memory_table
            .columns
            .push((column, normalize_type(declared_type)));

        Ok(true)
    }

    /// Overrides the declared type of an existing column.
    pub async fn set_column_type(
        &self,
        table: &str,
        column: &str,
        declared_type: &str,
    ) -> IngestResult<()> {
        let mut inner = self.inner.lock().await;
        let memory_table = inner.table_mut(table)?;

        let column = identifier(column);
        match memory_table
            .columns
            .iter_mut()
            .find(|(name, _)| *name == column)
        {
            Some((_, existing_type)) => *existing_type = normalize_type(declared_type),
            None => bail!(
                ErrorKind::StoreQueryFailed,
                "Column does not exist",
                format!("column: {column}")
            ),
        }

        Ok(())
    }

    pub async fn insert_rows(&self, table: &str, count: u64) -> IngestResult<()> {
        let mut inner = self.inner.lock().await;
        let memory_table = inner.table_mut(table)?;
        memory_table.row_count += count;

        Ok(())
    }

    pub async fn set_row_count(&self, table: &str, count: u64) -> IngestResult<()> {
        let mut inner = self.inner.lock().await;
        let memory_table = inner.table_mut(table)?;
        memory_table.row_count = count;

        Ok(())
    }

    pub async fn create_stage(&self, name: &str) {
        let mut inner = self.inner.lock().await;
        inner.stages.insert(identifier(name));
    }

    pub async fn stage_exists(&self, name: &str) -> bool {
        let inner = self.inner.lock().await;
        inner.stages.contains(&identifier(name))
    }

    pub async fn create_pipe(&self, name: &str) {
        let mut inner = self.inner.lock().await;
        inner.pipes.insert(identifier(name));
    }

    pub async fn pipe_exists(&self, name: &str) -> bool {
        let inner = self.inner.lock().await;
        inner.pipes.contains(&identifier(name))
    }
}

impl Store for MemoryStore {
    async fn execute(&self, statement: &str) -> IngestResult<ResultSet> {
        let mut inner = self.inner.lock().await;
        info!(statement, "executing statement");
        inner.executed_statements.push(statement.to_string());

        let upper = statement.trim().to_uppercase();
        if inner
            .failing_prefixes
            .iter()
            .any(|prefix| upper.starts_with(prefix.as_str()))
        {
            bail!(
                ErrorKind::StoreQueryFailed,
                "Statement execution failed",
                format!("injected failure for: {statement}")
            );
        }

        let parsed = Statement::parse(statement)?;
        inner.apply(parsed)
    }
}
