use bytes::Bytes;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

use crate::error::{ErrorKind, IngestResult};
use crate::ingest_error;
use crate::types::Cell;

/// A semi-structured record sent through the pipeline.
///
/// Fields keep the order in which they were added, so the serialized payload is stable. A
/// [`Record`] is assembled with [`Record::with`] and cannot be modified afterwards.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Record {
    fields: Vec<(String, Cell)>,
}

impl Record {
    pub fn new() -> Self {
        Self { fields: Vec::new() }
    }

    /// Returns the record extended with the given field.
    ///
    /// Adding a field name twice replaces the earlier value in place.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Cell>) -> Self {
        let name = name.into();
        let value = value.into();

        match self.fields.iter_mut().find(|(existing, _)| *existing == name) {
            Some((_, existing_value)) => *existing_value = value,
            None => self.fields.push((name, value)),
        }

        self
    }

    pub fn get(&self, name: &str) -> Option<&Cell> {
        self.fields
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, value)| value)
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(name, _)| name.as_str())
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Encodes the record as a JSON object payload.
    pub fn to_payload(&self) -> IngestResult<Bytes> {
        let payload = serde_json::to_vec(self).map_err(|err| {
            ingest_error!(
                ErrorKind::SerializationError,
                "Record serialization failed",
                err
            )
        })?;

        Ok(Bytes::from(payload))
    }
}

impl Serialize for Record {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (name, value) in &self.fields {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_keeps_field_order() {
        let record = Record::new()
            .with("PERFORMANCE_STRING", "Excellent")
            .with("RATING_DOUBLE", 0.99_f64)
            .with("APPROVAL", true);

        let payload = record.to_payload().unwrap();

        assert_eq!(
            payload.as_ref(),
            br#"{"PERFORMANCE_STRING":"Excellent","RATING_DOUBLE":0.99,"APPROVAL":true}"#
        );
    }

    #[test]
    fn test_repeated_field_replaces_value() {
        let record = Record::new()
            .with("RATING_INT", 1_i64)
            .with("PERFORMANCE_CHAR", "A")
            .with("RATING_INT", 100_i64);

        assert_eq!(record.len(), 2);
        assert_eq!(record.get("RATING_INT"), Some(&Cell::I64(100)));
        assert_eq!(
            record.field_names().collect::<Vec<_>>(),
            vec!["RATING_INT", "PERFORMANCE_CHAR"]
        );
    }
}
