//! SQLite Backend Implementation
//!
//! SQLite-specific implementation of the backend traits on top of sqlx. The
//! builder's `?` markers are native here, and generated keys come from
//! `last_insert_rowid()`.

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use sqlx::sqlite::{SqliteArguments, SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{Column, Pool, Row as SqlxRow, Sqlite, TypeInfo, ValueRef};

use super::core::*;
use super::driver_error;
use crate::error::{OrmError, OrmResult};

/// Text layout used for timestamps, matching SQLite's `CURRENT_TIMESTAMP`
pub const SQLITE_DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

type SqliteQuery<'q> = sqlx::query::Query<'q, Sqlite, SqliteArguments<'q>>;

/// SQLite database backend implementation
#[derive(Debug, Default)]
pub struct SqliteBackend;

impl SqliteBackend {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl DatabaseBackend for SqliteBackend {
    async fn create_pool(&self, database_url: &str, config: &DatabasePoolConfig) -> OrmResult<Arc<dyn DatabasePool>> {
        let connect_options = SqliteConnectOptions::from_str(database_url)
            .map_err(|e| OrmError::Connection(format!("Invalid SQLite URL: {}", e)))?
            .create_if_missing(true);

        let options = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(Duration::from_secs(config.acquire_timeout_seconds))
            .idle_timeout(config.idle_timeout_seconds.map(Duration::from_secs))
            .max_lifetime(config.max_lifetime_seconds.map(Duration::from_secs))
            .test_before_acquire(config.test_before_acquire);

        let pool = options
            .connect_with(connect_options)
            .await
            .map_err(|e| OrmError::Connection(format!("Failed to open SQLite database: {}", e)))?;

        tracing::debug!("SQLite pool opened (max_connections: {})", config.max_connections);
        Ok(Arc::new(SqlitePool::new(pool)))
    }

    fn sql_dialect(&self) -> SqlDialect {
        SqlDialect::SQLite
    }

    fn backend_type(&self) -> crate::backends::DatabaseBackendType {
        crate::backends::DatabaseBackendType::SQLite
    }
}

/// SQLite connection pool implementation
pub struct SqlitePool {
    pool: Pool<Sqlite>,
}

impl SqlitePool {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DatabasePool for SqlitePool {
    async fn begin_transaction(&self) -> OrmResult<Box<dyn DatabaseTransaction>> {
        let tx = self
            .pool
            .begin()
            .await
            .map_err(|e| driver_error("Failed to begin transaction", e))?;
        Ok(Box::new(SqliteTransaction { tx: Some(tx) }))
    }

    async fn execute(&self, sql: &str, params: &[DatabaseValue]) -> OrmResult<ExecuteResult> {
        let result = build_query(sql, params)
            .execute(&self.pool)
            .await
            .map_err(|e| driver_error("Query execution failed", e))?;
        Ok(execute_result(sql, &result))
    }

    async fn fetch_all(&self, sql: &str, params: &[DatabaseValue]) -> OrmResult<Vec<Row>> {
        let rows = build_query(sql, params)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| driver_error("Query fetch failed", e))?;
        rows.iter().map(decode_row).collect()
    }

    async fn fetch_optional(&self, sql: &str, params: &[DatabaseValue]) -> OrmResult<Option<Row>> {
        let row = build_query(sql, params)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| driver_error("Query fetch failed", e))?;
        row.as_ref().map(decode_row).transpose()
    }

    async fn close(&self) -> OrmResult<()> {
        self.pool.close().await;
        Ok(())
    }

    fn stats(&self) -> DatabasePoolStats {
        let total = self.pool.size();
        let idle = self.pool.num_idle() as u32;
        DatabasePoolStats {
            total_connections: total,
            idle_connections: idle,
            active_connections: total.saturating_sub(idle),
        }
    }

    async fn health_check(&self) -> OrmResult<Duration> {
        let start = std::time::Instant::now();
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| OrmError::Connection(format!("Health check failed: {}", e)))?;
        Ok(start.elapsed())
    }

    fn dialect(&self) -> SqlDialect {
        SqlDialect::SQLite
    }
}

/// SQLite transaction implementation
pub struct SqliteTransaction {
    tx: Option<sqlx::Transaction<'static, Sqlite>>,
}

impl SqliteTransaction {
    fn active(&mut self) -> OrmResult<&mut sqlx::Transaction<'static, Sqlite>> {
        self.tx
            .as_mut()
            .ok_or_else(|| OrmError::Transaction("Transaction already completed".to_string()))
    }
}

#[async_trait]
impl DatabaseTransaction for SqliteTransaction {
    async fn execute(&mut self, sql: &str, params: &[DatabaseValue]) -> OrmResult<ExecuteResult> {
        let tx = self.active()?;
        let result = build_query(sql, params)
            .execute(&mut **tx)
            .await
            .map_err(|e| driver_error("Query execution failed", e))?;
        Ok(execute_result(sql, &result))
    }

    async fn fetch_all(&mut self, sql: &str, params: &[DatabaseValue]) -> OrmResult<Vec<Row>> {
        let tx = self.active()?;
        let rows = build_query(sql, params)
            .fetch_all(&mut **tx)
            .await
            .map_err(|e| driver_error("Query fetch failed", e))?;
        rows.iter().map(decode_row).collect()
    }

    async fn fetch_optional(&mut self, sql: &str, params: &[DatabaseValue]) -> OrmResult<Option<Row>> {
        let tx = self.active()?;
        let row = build_query(sql, params)
            .fetch_optional(&mut **tx)
            .await
            .map_err(|e| driver_error("Query fetch failed", e))?;
        row.as_ref().map(decode_row).transpose()
    }

    async fn commit(mut self: Box<Self>) -> OrmResult<()> {
        let tx = self
            .tx
            .take()
            .ok_or_else(|| OrmError::Transaction("Transaction already completed".to_string()))?;
        tx.commit()
            .await
            .map_err(|e| OrmError::Transaction(format!("Transaction commit failed: {}", e)))
    }

    async fn rollback(mut self: Box<Self>) -> OrmResult<()> {
        let tx = self
            .tx
            .take()
            .ok_or_else(|| OrmError::Transaction("Transaction already completed".to_string()))?;
        tx.rollback()
            .await
            .map_err(|e| OrmError::Transaction(format!("Transaction rollback failed: {}", e)))
    }
}

fn execute_result(sql: &str, result: &sqlx::sqlite::SqliteQueryResult) -> ExecuteResult {
    let is_insert = sql
        .trim_start()
        .get(..6)
        .map_or(false, |head| head.eq_ignore_ascii_case("insert"));

    ExecuteResult {
        rows_affected: result.rows_affected(),
        last_insert_id: if is_insert && result.rows_affected() > 0 {
            Some(result.last_insert_rowid())
        } else {
            None
        },
    }
}

/// Prepare `sql` and bind every parameter in order
fn build_query<'q>(sql: &'q str, params: &[DatabaseValue]) -> SqliteQuery<'q> {
    params
        .iter()
        .fold(sqlx::query(sql), |query, value| bind_database_value(query, value))
}

/// Bind a DatabaseValue to a sqlx query
fn bind_database_value<'q>(query: SqliteQuery<'q>, value: &DatabaseValue) -> SqliteQuery<'q> {
    match value {
        DatabaseValue::Null => query.bind(Option::<String>::None),
        DatabaseValue::Bool(b) => query.bind(*b),
        DatabaseValue::Int64(i) => query.bind(*i),
        DatabaseValue::Float64(f) => query.bind(*f),
        DatabaseValue::String(s) => query.bind(s.clone()),
        DatabaseValue::Bytes(b) => query.bind(b.clone()),
        DatabaseValue::DateTime(dt) => query.bind(dt.format(SQLITE_DATETIME_FORMAT).to_string()),
        DatabaseValue::Json(j) => query.bind(j.to_string()),
    }
}

fn decode_row(row: &SqliteRow) -> OrmResult<Row> {
    let mut columns = Vec::with_capacity(row.len());
    let mut values = Vec::with_capacity(row.len());

    for (index, column) in row.columns().iter().enumerate() {
        columns.push(column.name().to_string());
        values.push(sqlite_value_to_database_value(row, index)?);
    }

    Ok(Row::new(columns, values))
}

/// Convert a SQLite column value to DatabaseValue by its storage class
fn sqlite_value_to_database_value(row: &SqliteRow, index: usize) -> OrmResult<DatabaseValue> {
    let raw = row
        .try_get_raw(index)
        .map_err(|e| OrmError::Query(format!("Failed to read column {}: {}", index, e)))?;

    if raw.is_null() {
        return Ok(DatabaseValue::Null);
    }

    let type_name = raw.type_info().name().to_string();
    let decoded = match type_name.as_str() {
        "INTEGER" | "BOOLEAN" => row.try_get::<i64, _>(index).map(DatabaseValue::Int64),
        "REAL" | "NUMERIC" => row.try_get::<f64, _>(index).map(DatabaseValue::Float64),
        "BLOB" => row.try_get::<Vec<u8>, _>(index).map(DatabaseValue::Bytes),
        _ => row.try_get::<String, _>(index).map(DatabaseValue::String),
    };

    decoded.map_err(|e| {
        OrmError::Query(format!(
            "Failed to decode {} value in column {}: {}",
            type_name, index, e
        ))
    })
}
