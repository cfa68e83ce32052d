//! Base implementation of records.
use std::collections::HashMap;
use thiserror::Error;

/// Errors when reading a value from a [`Record`].
#[derive(Error, Debug, PartialEq)]
pub enum RecordError {
    /// Record key error.
    #[error("Record key error: {0}")]
    RecordKeyError(String),
}

/// Represents possible types of values that can be stored in a [`Record`].
#[derive(Debug, Clone, PartialEq)]
pub enum RecordValue {
    /// A single floating-point value.
    Scalar(f32),
}

/// A container for storing key-value pairs emitted by environments.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record(HashMap<String, RecordValue>);

impl Record {
    /// Creates an empty record.
    pub fn empty() -> Self {
        Self(HashMap::new())
    }

    /// Inserts a key-value pair into the record.
    pub fn insert(&mut self, k: impl Into<String>, v: RecordValue) {
        self.0.insert(k.into(), v);
    }

    /// Merges two records, consuming both.
    ///
    /// If both records contain the same key, the value from the second record
    /// overwrites the value from the first record.
    pub fn merge(self, record: Record) -> Self {
        Record(self.0.into_iter().chain(record.0).collect())
    }

    /// Gets a scalar value from the record.
    pub fn get_scalar(&self, k: &str) -> Result<f32, RecordError> {
        match self.0.get(k) {
            Some(RecordValue::Scalar(v)) => Ok(*v),
            None => Err(RecordError::RecordKeyError(k.to_string())),
        }
    }

    /// Checks if the record is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_merge_overwrites() {
        let mut r1 = Record::empty();
        r1.insert("reward", RecordValue::Scalar(1.0));
        r1.insert("steps", RecordValue::Scalar(3.0));
        let mut r2 = Record::empty();
        r2.insert("reward", RecordValue::Scalar(2.0));
        let r = r1.merge(r2);

        assert_eq!(r.get_scalar("reward").unwrap(), 2.0);
        assert_eq!(r.get_scalar("steps").unwrap(), 3.0);
    }

    #[test]
    fn test_missing_key() {
        let r = Record::empty();
        assert!(r.is_empty());
        assert_eq!(
            r.get_scalar("missing"),
            Err(RecordError::RecordKeyError("missing".to_string()))
        );
    }
}
