//! Core Model Trait - Base definition for database entities
//!
//! Defines the Model trait with table metadata, primary key handling,
//! mass-assignment whitelist, casts and timestamp configuration. Row data lives
//! in a [`Record`] owned by each model.

use crate::backends::DatabaseValue;

use super::casts::CastType;
use super::record::Record;

/// Core trait for database models
pub trait Model: Sized + Send + Sync {
    /// Table name for this model
    fn table_name() -> &'static str;

    /// Type name used to derive foreign keys (`CreditTransaction` -> `credit_transaction_id`)
    fn model_name() -> &'static str {
        let full = std::any::type_name::<Self>();
        full.rsplit("::").next().unwrap_or(full)
    }

    /// Primary key field name
    fn primary_key_name() -> &'static str {
        "id"
    }

    /// Attributes accepted by mass assignment. The primary key is always accepted.
    fn fillable() -> &'static [&'static str] {
        &[]
    }

    /// Casts applied when attributes are read
    fn casts() -> &'static [(&'static str, CastType)] {
        &[]
    }

    /// Check if this model uses timestamps (created_at, updated_at)
    fn uses_timestamps() -> bool {
        true
    }

    /// Computed attribute consulted when `key` is not stored
    fn accessor(&self, _key: &str) -> Option<DatabaseValue> {
        None
    }

    /// Wrap a record loaded from or destined for the database
    fn from_record(record: Record) -> Self;

    fn record(&self) -> &Record;

    fn record_mut(&mut self) -> &mut Record;

    /// Cast configured for `key`, if any
    fn cast_for(key: &str) -> Option<CastType> {
        Self::casts()
            .iter()
            .find(|(column, _)| *column == key)
            .map(|(_, cast)| *cast)
    }
}
