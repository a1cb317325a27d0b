//! Attribute storage for one row
//!
//! A `Record` is what every model wraps: the column values plus the lifecycle
//! state (`New` until inserted or loaded, `Persisted` afterwards, `Detached`
//! once the backing row has been deleted).

use serde::{Serialize, Serializer};

use crate::backends::{Attributes, DatabaseValue, Row};

/// Lifecycle of a model instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RecordState {
    /// Not yet stored; `save()` inserts
    #[default]
    New,
    /// Backed by a row; `save()` updates
    Persisted,
    /// Row deleted; no further writes are accepted
    Detached,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    attributes: Attributes,
    state: RecordState,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record loaded from storage
    pub fn from_row(row: Row) -> Self {
        Self {
            attributes: row.into_map(),
            state: RecordState::Persisted,
        }
    }

    /// Unsaved record with the given attributes, bypassing the fillable list
    pub fn from_attributes(attributes: Attributes) -> Self {
        Self {
            attributes,
            state: RecordState::New,
        }
    }

    pub fn state(&self) -> RecordState {
        self.state
    }

    /// True once the row has been inserted or loaded, until it is deleted
    pub fn exists(&self) -> bool {
        self.state == RecordState::Persisted
    }

    pub fn is_detached(&self) -> bool {
        self.state == RecordState::Detached
    }

    pub(crate) fn mark_persisted(&mut self) {
        self.state = RecordState::Persisted;
    }

    pub(crate) fn mark_detached(&mut self) {
        self.state = RecordState::Detached;
    }

    pub fn get(&self, key: &str) -> Option<&DatabaseValue> {
        self.attributes.get(key)
    }

    /// Unrestricted assignment; mass assignment goes through [`Record::fill`]
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<DatabaseValue>) {
        self.attributes.insert(key.into(), value.into());
    }

    pub fn remove(&mut self, key: &str) -> Option<DatabaseValue> {
        self.attributes.remove(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.attributes.contains_key(key)
    }

    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    pub(crate) fn replace_attributes(&mut self, attributes: Attributes) {
        self.attributes = attributes;
    }

    /// Mass assignment: keep keys listed in `fillable` or equal to
    /// `primary_key`, drop the rest. Returns the dropped keys.
    pub fn fill<I, K, V>(&mut self, attributes: I, fillable: &[&str], primary_key: &str) -> Vec<String>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<DatabaseValue>,
    {
        let mut dropped = Vec::new();
        for (key, value) in attributes {
            let key = key.into();
            if key == primary_key || fillable.contains(&key.as_str()) {
                self.attributes.insert(key, value.into());
            } else {
                dropped.push(key);
            }
        }
        dropped
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.attributes.serialize(serializer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fill_drops_unlisted_keys() {
        let mut record = Record::new();
        let dropped = record.fill(
            [
                ("name", DatabaseValue::from("x")),
                ("email", DatabaseValue::from("y")),
                ("is_admin", DatabaseValue::Bool(true)),
                ("id", DatabaseValue::Int64(9)),
            ],
            &["name", "email"],
            "id",
        );

        assert_eq!(dropped, vec!["is_admin".to_string()]);
        assert_eq!(record.get("name"), Some(&DatabaseValue::from("x")));
        assert_eq!(record.get("id"), Some(&DatabaseValue::Int64(9)));
        assert!(!record.contains("is_admin"));
    }

    #[test]
    fn test_row_records_are_persisted() {
        let row = Row::new(vec!["id".into()], vec![DatabaseValue::Int64(1)]);
        let record = Record::from_row(row);
        assert!(record.exists());
        assert_eq!(record.state(), RecordState::Persisted);
        assert!(!Record::new().exists());
    }
}
