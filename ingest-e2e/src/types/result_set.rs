use std::ops::Index;

use crate::types::Cell;

/// A single row returned by the store, indexable by column position.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    pub values: Vec<Cell>,
}

impl Row {
    pub fn new(values: Vec<Cell>) -> Self {
        Self { values }
    }

    pub fn get(&self, position: usize) -> Option<&Cell> {
        self.values.get(position)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl Index<usize> for Row {
    type Output = Cell;

    fn index(&self, position: usize) -> &Self::Output {
        &self.values[position]
    }
}

/// The rows produced by executing one statement against the store.
///
/// DDL statements produce an empty [`ResultSet`].
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ResultSet {
    rows: Vec<Row>,
}

impl ResultSet {
    pub fn new(rows: Vec<Row>) -> Self {
        Self { rows }
    }

    pub fn empty() -> Self {
        Self { rows: Vec::new() }
    }

    pub fn fetch_all(&self) -> &[Row] {
        &self.rows
    }

    /// Returns the first row, [`None`] when the statement produced no rows.
    pub fn fetch_one(&self) -> Option<&Row> {
        self.rows.first()
    }
}
