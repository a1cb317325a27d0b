//! Driver seam
//!
//! Defines the driver seam the rest of the crate talks to: a
//! pool that runs positional-parameter statements, transactions checked out
//! of that pool, owned result rows and the scalar values bound into and read
//! out of statements.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};
use serde_json::Value as JsonValue;

use crate::error::{ModelError, OrmResult};

/// Outcome of a statement that does not return rows
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExecuteResult {
    pub rows_affected: u64,
    /// Row id generated by the statement, when the driver reports one
    pub last_insert_id: Option<i64>,
}

/// Open transaction on a single checked-out connection
#[async_trait]
pub trait DatabaseTransaction: Send {
    /// Run a statement that returns no rows
    async fn execute(&mut self, sql: &str, params: &[DatabaseValue]) -> OrmResult<ExecuteResult>;

    /// Run a query and decode every row
    async fn fetch_all(&mut self, sql: &str, params: &[DatabaseValue]) -> OrmResult<Vec<Row>>;

    /// Run a query and decode the first row, if any
    async fn fetch_optional(&mut self, sql: &str, params: &[DatabaseValue]) -> OrmResult<Option<Row>>;

    async fn commit(self: Box<Self>) -> OrmResult<()>;

    /// Discard the transaction's writes
    async fn rollback(self: Box<Self>) -> OrmResult<()>;
}

/// Shared pool of connections for one database URL
#[async_trait]
pub trait DatabasePool: Send + Sync {
    /// Check a connection out of the pool and open a transaction on it
    async fn begin_transaction(&self) -> OrmResult<Box<dyn DatabaseTransaction>>;

    /// Run a statement on any idle connection
    async fn execute(&self, sql: &str, params: &[DatabaseValue]) -> OrmResult<ExecuteResult>;

    /// Run a query on any idle connection and decode every row
    async fn fetch_all(&self, sql: &str, params: &[DatabaseValue]) -> OrmResult<Vec<Row>>;

    /// First decoded row of a query, if any
    async fn fetch_optional(&self, sql: &str, params: &[DatabaseValue]) -> OrmResult<Option<Row>>;

    /// Wait for checked-out connections and shut the pool down
    async fn close(&self) -> OrmResult<()>;

    /// Snapshot of connection counts
    fn stats(&self) -> DatabasePoolStats;

    /// Round-trip a trivial query and report how long it took
    async fn health_check(&self) -> OrmResult<std::time::Duration>;

    /// SQL dialect spoken by this pool
    fn dialect(&self) -> SqlDialect;
}

/// Connection counts reported by a pool
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DatabasePoolStats {
    pub total_connections: u32,
    pub idle_connections: u32,
    pub active_connections: u32,
}

/// Factory for the pools of one database engine
#[async_trait]
pub trait DatabaseBackend: Send + Sync {
    /// Connect lazily to `database_url`
    async fn create_pool(&self, database_url: &str, config: &DatabasePoolConfig) -> OrmResult<Arc<dyn DatabasePool>>;

    fn sql_dialect(&self) -> SqlDialect;

    fn backend_type(&self) -> crate::backends::DatabaseBackendType;
}

/// Sizing and timeouts applied when a pool is built
#[derive(Debug, Clone, PartialEq)]
pub struct DatabasePoolConfig {
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout_seconds: u64,
    pub idle_timeout_seconds: Option<u64>,
    pub max_lifetime_seconds: Option<u64>,
    pub test_before_acquire: bool,
}

impl Default for DatabasePoolConfig {
    fn default() -> Self {
        Self {
            max_connections: 10,
            min_connections: 1,
            acquire_timeout_seconds: 30,
            idle_timeout_seconds: Some(10 * 60),
            max_lifetime_seconds: Some(30 * 60),
            test_before_acquire: true,
        }
    }
}

/// Scalar value bound to a placeholder or read from a result column
#[derive(Debug, Clone, PartialEq)]
pub enum DatabaseValue {
    Null,
    Bool(bool),
    Int64(i64),
    Float64(f64),
    String(String),
    Bytes(Vec<u8>),
    DateTime(DateTime<Utc>),
    Json(JsonValue),
}

impl DatabaseValue {
    pub fn is_null(&self) -> bool {
        matches!(self, DatabaseValue::Null)
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            DatabaseValue::Int64(i) => Some(*i),
            DatabaseValue::Bool(b) => Some(i64::from(*b)),
            DatabaseValue::Float64(f) if f.fract() == 0.0 => Some(*f as i64),
            DatabaseValue::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            DatabaseValue::Float64(f) => Some(*f),
            DatabaseValue::Int64(i) => Some(*i as f64),
            DatabaseValue::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            DatabaseValue::String(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// JSON form used by `to_json()` on models and rows; bytes become an array
    pub fn to_json(&self) -> JsonValue {
        match self {
            DatabaseValue::Null => JsonValue::Null,
            DatabaseValue::Bool(b) => JsonValue::Bool(*b),
            DatabaseValue::Int64(i) => JsonValue::Number(serde_json::Number::from(*i)),
            DatabaseValue::Float64(f) => serde_json::Number::from_f64(*f)
                .map(JsonValue::Number)
                .unwrap_or(JsonValue::Null),
            DatabaseValue::String(s) => JsonValue::String(s.clone()),
            DatabaseValue::Bytes(b) => JsonValue::Array(
                b.iter().map(|&x| JsonValue::Number(serde_json::Number::from(x))).collect(),
            ),
            DatabaseValue::DateTime(dt) => JsonValue::String(dt.to_rfc3339()),
            DatabaseValue::Json(j) => j.clone(),
        }
    }

    /// Inverse of [`DatabaseValue::to_json`] for scalars; objects and arrays stay JSON
    pub fn from_json(json: JsonValue) -> Self {
        match json {
            JsonValue::Null => DatabaseValue::Null,
            JsonValue::Bool(b) => DatabaseValue::Bool(b),
            JsonValue::Number(n) => {
                if let Some(i) = n.as_i64() {
                    DatabaseValue::Int64(i)
                } else if let Some(f) = n.as_f64() {
                    DatabaseValue::Float64(f)
                } else {
                    DatabaseValue::Null
                }
            }
            JsonValue::String(s) => DatabaseValue::String(s),
            JsonValue::Array(_) | JsonValue::Object(_) => DatabaseValue::Json(json),
        }
    }
}

impl Serialize for DatabaseValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

macro_rules! value_from {
    (@convert $value:ident) => {
        $value
    };
    (@convert $value:ident $convert:path) => {
        $convert($value)
    };
    ($($source:ty => $variant:ident $(via $convert:path)?),* $(,)?) => {
        $(
            impl From<$source> for DatabaseValue {
                fn from(value: $source) -> Self {
                    DatabaseValue::$variant(value_from!(@convert value $($convert)?))
                }
            }
        )*
    };
}

value_from! {
    bool => Bool,
    i32 => Int64 via i64::from,
    u32 => Int64 via i64::from,
    i64 => Int64,
    f64 => Float64,
    String => String,
    &str => String via str::to_owned,
    Vec<u8> => Bytes,
    DateTime<Utc> => DateTime,
    JsonValue => Json,
}

impl From<&String> for DatabaseValue {
    fn from(value: &String) -> Self {
        DatabaseValue::String(value.clone())
    }
}

impl From<&DatabaseValue> for DatabaseValue {
    fn from(value: &DatabaseValue) -> Self {
        value.clone()
    }
}

impl<T> From<Option<T>> for DatabaseValue
where
    T: Into<DatabaseValue>,
{
    fn from(value: Option<T>) -> Self {
        match value {
            Some(v) => v.into(),
            None => DatabaseValue::Null,
        }
    }
}

/// Column name -> value map used for attribute sets and write payloads
pub type Attributes = BTreeMap<String, DatabaseValue>;

/// One fetched result row, decoded into owned values in column order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    columns: Vec<String>,
    values: Vec<DatabaseValue>,
}

impl Row {
    pub fn new(columns: Vec<String>, values: Vec<DatabaseValue>) -> Self {
        debug_assert_eq!(columns.len(), values.len());
        Self { columns, values }
    }

    /// Value of the first column called `name`
    pub fn get(&self, name: &str) -> Option<&DatabaseValue> {
        self.columns
            .iter()
            .position(|c| c == name)
            .and_then(|i| self.values.get(i))
    }

    pub fn get_by_index(&self, index: usize) -> Option<&DatabaseValue> {
        self.values.get(index)
    }

    /// Like [`Row::get`] but failing when the column is absent
    pub fn try_get(&self, name: &str) -> OrmResult<&DatabaseValue> {
        self.get(name)
            .ok_or_else(|| ModelError::Query(format!("Column '{}' not found", name)))
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn column_names(&self) -> &[String] {
        &self.columns
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn to_json(&self) -> JsonValue {
        let map = self
            .columns
            .iter()
            .zip(&self.values)
            .map(|(c, v)| (c.clone(), v.to_json()))
            .collect();
        JsonValue::Object(map)
    }

    /// Consume the row into a column -> value map
    pub fn into_map(self) -> Attributes {
        self.columns.into_iter().zip(self.values).collect()
    }
}

/// Placeholder and quoting rules of a backend
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SqlDialect {
    PostgreSQL,
    SQLite,
}

impl SqlDialect {
    /// Marker for the zero-based parameter `index`
    pub fn parameter_placeholder(&self, index: usize) -> String {
        match self {
            SqlDialect::PostgreSQL => format!("${}", index + 1),
            SqlDialect::SQLite => "?".to_string(),
        }
    }

    /// Whether `?` markers must be rewritten into numbered parameters
    pub fn numbered_parameters(&self) -> bool {
        matches!(self, SqlDialect::PostgreSQL)
    }

    /// Both supported engines quote identifiers with double quotes
    pub fn identifier_quote(&self) -> char {
        '"'
    }

    /// Clause appended to an INSERT so the generated key comes back as a row
    pub fn returning_clause(&self, primary_key: &str) -> Option<String> {
        match self {
            SqlDialect::PostgreSQL => Some(format!(" RETURNING {}", primary_key)),
            SqlDialect::SQLite => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_json_keeps_structures_as_json() {
        assert_eq!(DatabaseValue::from_json(json!(5)), DatabaseValue::Int64(5));
        assert_eq!(DatabaseValue::from_json(json!("x")), DatabaseValue::String("x".into()));
        assert_eq!(
            DatabaseValue::from_json(json!({"a": 1})),
            DatabaseValue::Json(json!({"a": 1}))
        );
    }

    #[test]
    fn test_row_lookup_and_json() {
        let row = Row::new(
            vec!["id".into(), "name".into()],
            vec![DatabaseValue::Int64(7), DatabaseValue::from("Ada")],
        );
        assert_eq!(row.get("name"), Some(&DatabaseValue::from("Ada")));
        assert_eq!(row.get_by_index(0), Some(&DatabaseValue::Int64(7)));
        assert!(row.try_get("missing").is_err());
        assert_eq!(row.to_json(), json!({"id": 7, "name": "Ada"}));
    }

    #[test]
    fn test_numeric_coercions() {
        assert_eq!(DatabaseValue::from("42").as_i64(), Some(42));
        assert_eq!(DatabaseValue::Bool(true).as_i64(), Some(1));
        assert_eq!(DatabaseValue::Int64(3).as_f64(), Some(3.0));
        assert_eq!(DatabaseValue::Null.as_i64(), None);
    }

    #[test]
    fn test_postgres_returning_clause() {
        assert_eq!(
            SqlDialect::PostgreSQL.returning_clause("id").as_deref(),
            Some(" RETURNING id")
        );
        assert_eq!(SqlDialect::SQLite.returning_clause("id"), None);
    }
}
