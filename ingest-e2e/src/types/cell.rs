use serde::{Serialize, Serializer};
use std::fmt;

use crate::bail;
use crate::error::{ErrorKind, IngestResult};

/// A single scalar value, either a field of a fixture record or a value of a store row.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Null,
    Bool(bool),
    String(String),
    I64(i64),
    F64(f64),
}

impl Cell {
    /// Returns the string content of a [`Cell::String`], [`None`] for every other variant.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Cell::String(value) => Some(value),
            _ => None,
        }
    }

    /// Interprets the cell as a non-negative count.
    ///
    /// Stores report aggregates either as integers or as their textual representation, both
    /// are accepted.
    pub fn to_count(&self) -> IngestResult<u64> {
        match self {
            Cell::I64(value) if *value >= 0 => Ok(*value as u64),
            Cell::String(value) => Ok(value.trim().parse::<u64>()?),
            other => bail!(
                ErrorKind::ConversionError,
                "Cell cannot be interpreted as a count",
                format!("got: {other:?}")
            ),
        }
    }
}

impl Serialize for Cell {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Cell::Null => serializer.serialize_unit(),
            Cell::Bool(value) => serializer.serialize_bool(*value),
            Cell::String(value) => serializer.serialize_str(value),
            Cell::I64(value) => serializer.serialize_i64(*value),
            Cell::F64(value) => serializer.serialize_f64(*value),
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Null => write!(f, "NULL"),
            Cell::Bool(value) => write!(f, "{value}"),
            Cell::String(value) => write!(f, "{value}"),
            Cell::I64(value) => write!(f, "{value}"),
            Cell::F64(value) => write!(f, "{value}"),
        }
    }
}

impl From<&str> for Cell {
    fn from(value: &str) -> Self {
        Cell::String(value.to_string())
    }
}

impl From<String> for Cell {
    fn from(value: String) -> Self {
        Cell::String(value)
    }
}

impl From<i64> for Cell {
    fn from(value: i64) -> Self {
        Cell::I64(value)
    }
}

impl From<f64> for Cell {
    fn from(value: f64) -> Self {
        Cell::F64(value)
    }
}

impl From<bool> for Cell {
    fn from(value: bool) -> Self {
        Cell::Bool(value)
    }
}
