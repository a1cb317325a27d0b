//! PostgreSQL Backend Implementation
//!
//! This module provides the PostgreSQL-specific implementation of the database
//! backend traits using sqlx as the underlying database driver. Statements
//! arrive with positional `?` markers and are renumbered to `$n` here.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value as JsonValue;
use sqlx::postgres::{PgArguments, PgPoolOptions, PgRow};
use sqlx::{Column, Pool, Postgres, Row as SqlxRow, TypeInfo, ValueRef};

use super::core::*;
use super::driver_error;
use crate::error::{OrmError, OrmResult};
use crate::sql::{redact_url, rewrite_placeholders};

type PgQuery<'q> = sqlx::query::Query<'q, Postgres, PgArguments>;

/// PostgreSQL database backend implementation
#[derive(Debug, Default)]
pub struct PostgresBackend;

impl PostgresBackend {
    /// Create a new PostgreSQL backend instance
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl DatabaseBackend for PostgresBackend {
    async fn create_pool(&self, database_url: &str, config: &DatabasePoolConfig) -> OrmResult<Arc<dyn DatabasePool>> {
        let options = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(Duration::from_secs(config.acquire_timeout_seconds))
            .idle_timeout(config.idle_timeout_seconds.map(Duration::from_secs))
            .max_lifetime(config.max_lifetime_seconds.map(Duration::from_secs))
            .test_before_acquire(config.test_before_acquire);

        let pool = options.connect(database_url).await.map_err(|e| {
            OrmError::Connection(format!(
                "Failed to create PostgreSQL pool for {}: {}",
                redact_url(database_url),
                e
            ))
        })?;

        tracing::debug!(
            "PostgreSQL pool opened for {} (max_connections: {})",
            redact_url(database_url),
            config.max_connections
        );
        Ok(Arc::new(PostgresPool::new(pool)))
    }

    fn sql_dialect(&self) -> SqlDialect {
        SqlDialect::PostgreSQL
    }

    fn backend_type(&self) -> crate::backends::DatabaseBackendType {
        crate::backends::DatabaseBackendType::PostgreSQL
    }
}

/// PostgreSQL connection pool implementation
pub struct PostgresPool {
    pool: Pool<Postgres>,
}

impl PostgresPool {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DatabasePool for PostgresPool {
    async fn begin_transaction(&self) -> OrmResult<Box<dyn DatabaseTransaction>> {
        let tx = self
            .pool
            .begin()
            .await
            .map_err(|e| driver_error("Failed to begin transaction", e))?;
        Ok(Box::new(PostgresTransaction { tx: Some(tx) }))
    }

    async fn execute(&self, sql: &str, params: &[DatabaseValue]) -> OrmResult<ExecuteResult> {
        let sql = rewrite_placeholders(sql, &SqlDialect::PostgreSQL);
        let result = build_query(&sql, params)?
            .execute(&self.pool)
            .await
            .map_err(|e| driver_error("Query execution failed", e))?;

        Ok(ExecuteResult {
            rows_affected: result.rows_affected(),
            last_insert_id: None,
        })
    }

    async fn fetch_all(&self, sql: &str, params: &[DatabaseValue]) -> OrmResult<Vec<Row>> {
        let sql = rewrite_placeholders(sql, &SqlDialect::PostgreSQL);
        let rows = build_query(&sql, params)?
            .fetch_all(&self.pool)
            .await
            .map_err(|e| driver_error("Query fetch failed", e))?;
        rows.iter().map(decode_row).collect()
    }

    async fn fetch_optional(&self, sql: &str, params: &[DatabaseValue]) -> OrmResult<Option<Row>> {
        let sql = rewrite_placeholders(sql, &SqlDialect::PostgreSQL);
        let row = build_query(&sql, params)?
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
        SqlDialect::PostgreSQL
    }
}

/// PostgreSQL transaction implementation
pub struct PostgresTransaction {
    tx: Option<sqlx::Transaction<'static, Postgres>>,
}

impl PostgresTransaction {
    fn active(&mut self) -> OrmResult<&mut sqlx::Transaction<'static, Postgres>> {
        self.tx
            .as_mut()
            .ok_or_else(|| OrmError::Transaction("Transaction already completed".to_string()))
    }
}

#[async_trait]
impl DatabaseTransaction for PostgresTransaction {
    async fn execute(&mut self, sql: &str, params: &[DatabaseValue]) -> OrmResult<ExecuteResult> {
        let sql = rewrite_placeholders(sql, &SqlDialect::PostgreSQL);
        let tx = self.active()?;
        let result = build_query(&sql, params)?
            .execute(&mut **tx)
            .await
            .map_err(|e| driver_error("Query execution failed", e))?;

        Ok(ExecuteResult {
            rows_affected: result.rows_affected(),
            last_insert_id: None,
        })
    }

    async fn fetch_all(&mut self, sql: &str, params: &[DatabaseValue]) -> OrmResult<Vec<Row>> {
        let sql = rewrite_placeholders(sql, &SqlDialect::PostgreSQL);
        let tx = self.active()?;
        let rows = build_query(&sql, params)?
            .fetch_all(&mut **tx)
            .await
            .map_err(|e| driver_error("Query fetch failed", e))?;
        rows.iter().map(decode_row).collect()
    }

    async fn fetch_optional(&mut self, sql: &str, params: &[DatabaseValue]) -> OrmResult<Option<Row>> {
        let sql = rewrite_placeholders(sql, &SqlDialect::PostgreSQL);
        let tx = self.active()?;
        let row = build_query(&sql, params)?
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

fn build_query<'q>(sql: &'q str, params: &[DatabaseValue]) -> OrmResult<PgQuery<'q>> {
    let mut query = sqlx::query(sql);
    for param in params {
        query = bind_database_value(query, param);
    }
    Ok(query)
}

/// Bind a DatabaseValue to a sqlx query
fn bind_database_value<'q>(query: PgQuery<'q>, value: &DatabaseValue) -> PgQuery<'q> {
    match value {
        DatabaseValue::Null => query.bind(Option::<String>::None),
        DatabaseValue::Bool(b) => query.bind(*b),
        DatabaseValue::Int64(i) => query.bind(*i),
        DatabaseValue::Float64(f) => query.bind(*f),
        DatabaseValue::String(s) => query.bind(s.clone()),
        DatabaseValue::Bytes(b) => query.bind(b.clone()),
        DatabaseValue::DateTime(dt) => query.bind(*dt),
        DatabaseValue::Json(j) => query.bind(sqlx::types::Json(j.clone())),
    }
}

fn decode_row(row: &PgRow) -> OrmResult<Row> {
    let mut columns = Vec::with_capacity(row.len());
    let mut values = Vec::with_capacity(row.len());

    for (index, column) in row.columns().iter().enumerate() {
        columns.push(column.name().to_string());
        values.push(postgres_value_to_database_value(row, index)?);
    }

    Ok(Row::new(columns, values))
}

/// Convert a PostgreSQL column value to DatabaseValue
fn postgres_value_to_database_value(row: &PgRow, index: usize) -> OrmResult<DatabaseValue> {
    let raw = row
        .try_get_raw(index)
        .map_err(|e| OrmError::Query(format!("Failed to read column {}: {}", index, e)))?;
    if raw.is_null() {
        return Ok(DatabaseValue::Null);
    }

    let type_name = row.columns()[index].type_info().name().to_string();
    let decoded = match type_name.as_str() {
        "BOOL" => row.try_get::<bool, _>(index).map(DatabaseValue::Bool),
        "INT2" => row.try_get::<i16, _>(index).map(|v| DatabaseValue::Int64(i64::from(v))),
        "INT4" => row.try_get::<i32, _>(index).map(|v| DatabaseValue::Int64(i64::from(v))),
        "INT8" => row.try_get::<i64, _>(index).map(DatabaseValue::Int64),
        "FLOAT4" => row.try_get::<f32, _>(index).map(|v| DatabaseValue::Float64(f64::from(v))),
        "FLOAT8" => row.try_get::<f64, _>(index).map(DatabaseValue::Float64),
        "BYTEA" => row.try_get::<Vec<u8>, _>(index).map(DatabaseValue::Bytes),
        "TIMESTAMPTZ" => row
            .try_get::<chrono::DateTime<chrono::Utc>, _>(index)
            .map(DatabaseValue::DateTime),
        "TIMESTAMP" => row
            .try_get::<chrono::NaiveDateTime, _>(index)
            .map(|v| DatabaseValue::DateTime(v.and_utc())),
        "DATE" => row
            .try_get::<chrono::NaiveDate, _>(index)
            .map(|v| DatabaseValue::String(v.to_string())),
        "JSON" | "JSONB" => row.try_get::<JsonValue, _>(index).map(DatabaseValue::Json),
        _ => row.try_get::<String, _>(index).map(DatabaseValue::String),
    };

    decoded.map_err(|e| {
        OrmError::Query(format!(
            "Failed to decode {} value in column {}: {}",
            type_name, index, e
        ))
    })
}
