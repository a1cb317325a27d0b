//! Connection Manager
//!
//! `Database` owns one lazily opened connection pool, runs positional-parameter
//! statements on it, and offers manager-level transaction control. While a
//! transaction is active every statement issued through the manager runs on
//! the transaction's connection.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, OnceCell};
use tracing::{debug, error, warn};

use crate::backends::{
    Attributes, DatabaseBackend, DatabasePool, DatabasePoolStats, DatabaseTransaction, DatabaseValue,
    ExecuteResult, Row, SqlDialect,
};
use crate::config::DatabaseConfig;
use crate::error::{ModelError, ModelResult, QueryError};
use crate::sql::{count_placeholders, escape_identifier, redact_url};

static GLOBAL: once_cell::sync::OnceCell<Database> = once_cell::sync::OnceCell::new();

/// Install the process-wide database handle. Only the first call succeeds.
pub fn set_global(database: Database) -> ModelResult<&'static Database> {
    GLOBAL.try_insert(database).map_err(|_| {
        ModelError::Configuration("Global database handle is already installed".to_string())
    })
}

/// Process-wide database handle installed with [`set_global`]
pub fn global() -> ModelResult<&'static Database> {
    GLOBAL
        .get()
        .ok_or_else(|| ModelError::Configuration("Global database handle has not been installed".to_string()))
}

/// Connection manager
pub struct Database {
    config: DatabaseConfig,
    backend: Arc<dyn DatabaseBackend>,
    pool: OnceCell<Arc<dyn DatabasePool>>,
    transaction: Mutex<Option<Box<dyn DatabaseTransaction>>>,
    closed: AtomicBool,
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("url", &redact_url(&self.config.url))
            .field("backend", &self.backend.backend_type())
            .field("connected", &self.is_connected())
            .finish()
    }
}

impl Database {
    /// Create a manager; the pool is opened on first use
    pub fn new(config: DatabaseConfig) -> ModelResult<Self> {
        config.validate()?;
        let backend = config.backend_type()?.backend();

        Ok(Self {
            config,
            backend,
            pool: OnceCell::new(),
            transaction: Mutex::new(None),
            closed: AtomicBool::new(false),
        })
    }

    /// Create a manager and open its pool immediately
    pub async fn connect(config: DatabaseConfig) -> ModelResult<Self> {
        let database = Self::new(config)?;
        database.pool().await?;
        Ok(database)
    }

    /// Create a lazily connecting manager from `DATABASE_URL` and friends
    pub fn from_env() -> ModelResult<Self> {
        Self::new(DatabaseConfig::from_env()?)
    }

    pub fn config(&self) -> &DatabaseConfig {
        &self.config
    }

    /// SQL dialect of the configured backend
    pub fn dialect(&self) -> SqlDialect {
        self.backend.sql_dialect()
    }

    /// Shared pool, opened on the first call
    async fn pool(&self) -> ModelResult<Arc<dyn DatabasePool>> {
        if self.closed.load(Ordering::Acquire) {
            return Err(ModelError::Connection("Database has been closed".to_string()));
        }

        let pool = self
            .pool
            .get_or_try_init(|| async {
                debug!(
                    "Opening {} connection pool for {}",
                    self.backend.backend_type(),
                    redact_url(&self.config.url)
                );
                self.backend
                    .create_pool(&self.config.url, &self.config.pool)
                    .await
                    .map_err(|e| {
                        error!("Database connection failed: {}", e);
                        e
                    })
            })
            .await?;

        Ok(Arc::clone(pool))
    }

    /// Whether the pool has been opened and not closed
    pub fn is_connected(&self) -> bool {
        self.pool.initialized() && !self.closed.load(Ordering::Acquire)
    }

    /// Pool statistics, if the pool is open
    pub fn stats(&self) -> Option<DatabasePoolStats> {
        self.pool.get().map(|pool| pool.stats())
    }

    /// Run a trivial query and report the round-trip time
    pub async fn health_check(&self) -> ModelResult<Duration> {
        let mut guard = self.transaction.lock().await;
        if let Some(tx) = guard.as_mut() {
            let start = std::time::Instant::now();
            tx.fetch_optional("SELECT 1", &[]).await?;
            return Ok(start.elapsed());
        }
        drop(guard);

        let elapsed = self.pool().await?.health_check().await?;
        debug!("Database health check passed in {:?}", elapsed);
        Ok(elapsed)
    }

    /// Close the pool. An active transaction is rolled back first.
    pub async fn close(&self) -> ModelResult<()> {
        if let Some(tx) = self.transaction.lock().await.take() {
            warn!("Closing database with an active transaction; rolling back");
            tx.rollback().await?;
        }

        self.closed.store(true, Ordering::Release);
        if let Some(pool) = self.pool.get() {
            pool.close().await?;
            debug!("Database pool closed");
        }
        Ok(())
    }

    /// Execute a statement that returns no rows
    pub async fn execute(&self, sql: &str, params: &[DatabaseValue]) -> ModelResult<ExecuteResult> {
        debug!("Executing SQL: {} ({} bindings)", sql, params.len());

        let mut guard = self.transaction.lock().await;
        if let Some(tx) = guard.as_mut() {
            return tx.execute(sql, params).await.map_err(|e| log_failure(sql, e));
        }
        drop(guard);

        self.pool()
            .await?
            .execute(sql, params)
            .await
            .map_err(|e| log_failure(sql, e))
    }

    /// Run a query and return every row
    pub async fn all(&self, sql: &str, params: &[DatabaseValue]) -> ModelResult<Vec<Row>> {
        debug!("Fetching SQL: {} ({} bindings)", sql, params.len());

        let mut guard = self.transaction.lock().await;
        if let Some(tx) = guard.as_mut() {
            return tx.fetch_all(sql, params).await.map_err(|e| log_failure(sql, e));
        }
        drop(guard);

        self.pool()
            .await?
            .fetch_all(sql, params)
            .await
            .map_err(|e| log_failure(sql, e))
    }

    /// Run a query and return its first row, if any
    pub async fn first(&self, sql: &str, params: &[DatabaseValue]) -> ModelResult<Option<Row>> {
        debug!("Fetching SQL: {} ({} bindings)", sql, params.len());

        let mut guard = self.transaction.lock().await;
        if let Some(tx) = guard.as_mut() {
            return tx.fetch_optional(sql, params).await.map_err(|e| log_failure(sql, e));
        }
        drop(guard);

        self.pool()
            .await?
            .fetch_optional(sql, params)
            .await
            .map_err(|e| log_failure(sql, e))
    }

    /// Start building a prepared statement
    pub fn prepare(&self, sql: impl Into<String>) -> Statement<'_> {
        Statement {
            database: self,
            sql: sql.into(),
            bindings: Vec::new(),
        }
    }

    /// Insert one row and return the generated `id`
    pub async fn insert(&self, table: &str, data: &Attributes) -> ModelResult<Option<i64>> {
        self.insert_with_key(table, data, "id").await
    }

    /// Insert one row and return the generated value of `primary_key`
    pub async fn insert_with_key(
        &self,
        table: &str,
        data: &Attributes,
        primary_key: &str,
    ) -> ModelResult<Option<i64>> {
        let dialect = self.dialect();
        let (sql, params) = build_insert(table, data, primary_key, &dialect);

        if dialect.returning_clause(primary_key).is_some() {
            let row = self.first(&sql, &params).await?;
            return Ok(row.and_then(|row| row.get(primary_key).and_then(DatabaseValue::as_i64)));
        }

        Ok(self.execute(&sql, &params).await?.last_insert_id)
    }

    /// Update rows matching `where_clause` and return the affected count
    pub async fn update(
        &self,
        table: &str,
        data: &Attributes,
        where_clause: &str,
        where_params: &[DatabaseValue],
    ) -> ModelResult<u64> {
        let (sql, params) = build_update(table, data, where_clause, where_params, &self.dialect())?;
        Ok(self.execute(&sql, &params).await?.rows_affected)
    }

    /// Delete rows matching `where_clause` and return the affected count
    pub async fn delete(&self, table: &str, where_clause: &str, where_params: &[DatabaseValue]) -> ModelResult<u64> {
        let mut sql = format!("DELETE FROM {}", escape_identifier(table, &self.dialect()));
        if !where_clause.trim().is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(where_clause);
        }
        Ok(self.execute(&sql, where_params).await?.rows_affected)
    }

    /// Whether a manager-level transaction is open
    pub async fn in_transaction(&self) -> bool {
        self.transaction.lock().await.is_some()
    }

    /// Open a manager-level transaction. Nesting is rejected.
    pub async fn begin_transaction(&self) -> ModelResult<()> {
        let mut guard = self.transaction.lock().await;
        if guard.is_some() {
            return Err(ModelError::Transaction(
                "A transaction is already active; nested transactions are not supported".to_string(),
            ));
        }

        let tx = self.pool().await?.begin_transaction().await.map_err(|e| {
            error!("Failed to begin transaction: {}", e);
            e
        })?;
        *guard = Some(tx);
        debug!("Transaction started");
        Ok(())
    }

    /// Commit the active transaction
    pub async fn commit(&self) -> ModelResult<()> {
        let tx = self
            .transaction
            .lock()
            .await
            .take()
            .ok_or_else(|| ModelError::Transaction("No active transaction to commit".to_string()))?;

        tx.commit().await?;
        debug!("Transaction committed");
        Ok(())
    }

    /// Roll back the active transaction
    pub async fn roll_back(&self) -> ModelResult<()> {
        let tx = self
            .transaction
            .lock()
            .await
            .take()
            .ok_or_else(|| ModelError::Transaction("No active transaction to roll back".to_string()))?;

        tx.rollback().await?;
        debug!("Transaction rolled back");
        Ok(())
    }

    /// Run `f` inside a transaction: commit on `Ok`, roll back on `Err`
    pub async fn transaction<'a, F, Fut, R>(&'a self, f: F) -> ModelResult<R>
    where
        F: FnOnce(&'a Database) -> Fut,
        Fut: Future<Output = ModelResult<R>> + 'a,
    {
        self.begin_transaction().await?;

        match f(self).await {
            Ok(value) => {
                self.commit().await?;
                Ok(value)
            }
            Err(err) => {
                if let Err(rollback_err) = self.roll_back().await {
                    warn!("Rollback after failed transaction also failed: {}", rollback_err);
                }
                Err(err)
            }
        }
    }
}

fn log_failure(sql: &str, err: ModelError) -> ModelError {
    error!("Statement failed: {} [{}]", err, sql);
    err
}

fn build_insert(
    table: &str,
    data: &Attributes,
    primary_key: &str,
    dialect: &SqlDialect,
) -> (String, Vec<DatabaseValue>) {
    let mut sql = if data.is_empty() {
        format!("INSERT INTO {} DEFAULT VALUES", escape_identifier(table, dialect))
    } else {
        let columns: Vec<String> = data.keys().map(|c| escape_identifier(c, dialect)).collect();
        let markers = vec!["?"; data.len()].join(", ");
        format!(
            "INSERT INTO {} ({}) VALUES ({})",
            escape_identifier(table, dialect),
            columns.join(", "),
            markers
        )
    };

    if let Some(returning) = dialect.returning_clause(&escape_identifier(primary_key, dialect)) {
        sql.push_str(&returning);
    }

    (sql, data.values().cloned().collect())
}

fn build_update(
    table: &str,
    data: &Attributes,
    where_clause: &str,
    where_params: &[DatabaseValue],
    dialect: &SqlDialect,
) -> ModelResult<(String, Vec<DatabaseValue>)> {
    if data.is_empty() {
        return Err(ModelError::Validation(format!(
            "Update on '{}' has no columns to set",
            table
        )));
    }

    let assignments: Vec<String> = data
        .keys()
        .map(|c| format!("{} = ?", escape_identifier(c, dialect)))
        .collect();
    let mut sql = format!(
        "UPDATE {} SET {}",
        escape_identifier(table, dialect),
        assignments.join(", ")
    );
    if !where_clause.trim().is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(where_clause);
    }

    let mut params: Vec<DatabaseValue> = data.values().cloned().collect();
    params.extend_from_slice(where_params);
    Ok((sql, params))
}

/// Prepared statement with positional bindings
pub struct Statement<'db> {
    database: &'db Database,
    sql: String,
    bindings: Vec<DatabaseValue>,
}

impl<'db> Statement<'db> {
    /// Bind the next positional parameter
    pub fn bind(mut self, value: impl Into<DatabaseValue>) -> Self {
        self.bindings.push(value.into());
        self
    }

    /// Bind the parameter at a 1-based position, replacing any earlier value.
    /// Skipped positions are bound to NULL.
    pub fn bind_at(mut self, position: usize, value: impl Into<DatabaseValue>) -> ModelResult<Self> {
        if position == 0 {
            return Err(QueryError::InvalidParameter("parameter positions start at 1".to_string()).into());
        }
        if self.bindings.len() < position {
            self.bindings.resize(position, DatabaseValue::Null);
        }
        self.bindings[position - 1] = value.into();
        Ok(self)
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn bindings(&self) -> &[DatabaseValue] {
        &self.bindings
    }

    fn check_bindings(&self) -> ModelResult<()> {
        let placeholders = count_placeholders(&self.sql);
        if placeholders != self.bindings.len() {
            return Err(QueryError::ParameterMismatch {
                placeholders,
                bindings: self.bindings.len(),
            }
            .into());
        }
        Ok(())
    }

    pub async fn execute(&self) -> ModelResult<ExecuteResult> {
        self.check_bindings()?;
        self.database.execute(&self.sql, &self.bindings).await
    }

    pub async fn fetch_all(&self) -> ModelResult<Vec<Row>> {
        self.check_bindings()?;
        self.database.all(&self.sql, &self.bindings).await
    }

    pub async fn fetch_one(&self) -> ModelResult<Option<Row>> {
        self.check_bindings()?;
        self.database.first(&self.sql, &self.bindings).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attrs(pairs: &[(&str, DatabaseValue)]) -> Attributes {
        pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
    }

    async fn memory() -> Database {
        let db = Database::connect(DatabaseConfig::in_memory()).await.unwrap();
        db.execute(
            "CREATE TABLE notes (id INTEGER PRIMARY KEY AUTOINCREMENT, body TEXT, pinned INTEGER DEFAULT 0)",
            &[],
        )
        .await
        .unwrap();
        db
    }

    #[test]
    fn test_insert_sql_per_dialect() {
        let data = attrs(&[("body", "hi".into()), ("pinned", 1.into())]);

        let (sql, params) = build_insert("notes", &data, "id", &SqlDialect::SQLite);
        assert_eq!(sql, "INSERT INTO \"notes\" (\"body\", \"pinned\") VALUES (?, ?)");
        assert_eq!(params.len(), 2);

        let (sql, _) = build_insert("notes", &data, "id", &SqlDialect::PostgreSQL);
        assert!(sql.ends_with(" RETURNING \"id\""));

        let (sql, params) = build_insert("notes", &Attributes::new(), "id", &SqlDialect::SQLite);
        assert_eq!(sql, "INSERT INTO \"notes\" DEFAULT VALUES");
        assert!(params.is_empty());
    }

    #[test]
    fn test_update_sql_appends_where_params_after_data() {
        let data = attrs(&[("body", "x".into())]);
        let (sql, params) =
            build_update("notes", &data, "id = ?", &[DatabaseValue::Int64(4)], &SqlDialect::SQLite).unwrap();
        assert_eq!(sql, "UPDATE \"notes\" SET \"body\" = ? WHERE id = ?");
        assert_eq!(params, vec![DatabaseValue::from("x"), DatabaseValue::Int64(4)]);

        let err = build_update("notes", &Attributes::new(), "id = ?", &[], &SqlDialect::SQLite).unwrap_err();
        assert!(matches!(err, ModelError::Validation(_)));
    }

    #[test]
    fn test_new_does_not_connect() {
        let db = Database::new(DatabaseConfig::in_memory()).unwrap();
        assert!(!db.is_connected());
        assert!(db.stats().is_none());
        assert_eq!(db.dialect(), SqlDialect::SQLite);
    }

    #[test]
    fn test_unknown_scheme_is_rejected() {
        let err = Database::new(DatabaseConfig::new("mysql://localhost/app")).unwrap_err();
        assert!(matches!(err, ModelError::Configuration(_)));
    }

    #[tokio::test]
    async fn test_insert_update_delete_helpers() {
        let db = memory().await;
        assert!(db.is_connected());

        let id = db
            .insert("notes", &attrs(&[("body", "first".into())]))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(id, 1);

        let changed = db
            .update("notes", &attrs(&[("pinned", 1.into())]), "id = ?", &[id.into()])
            .await
            .unwrap();
        assert_eq!(changed, 1);

        let row = db.first("SELECT pinned FROM notes WHERE id = ?", &[id.into()]).await.unwrap().unwrap();
        assert_eq!(row.get("pinned"), Some(&DatabaseValue::Int64(1)));

        assert_eq!(db.delete("notes", "id = ?", &[id.into()]).await.unwrap(), 1);
        assert!(db.all("SELECT * FROM notes", &[]).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_statement_binding_checks() {
        let db = memory().await;
        db.insert("notes", &attrs(&[("body", "a".into())])).await.unwrap();

        let rows = db
            .prepare("SELECT body FROM notes WHERE id = ? AND body = ?")
            .bind_at(2, "a")
            .unwrap()
            .bind_at(1, 1)
            .unwrap()
            .fetch_all()
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);

        let err = db.prepare("SELECT * FROM notes WHERE id = ?").fetch_one().await.unwrap_err();
        assert!(matches!(err, ModelError::Query(_)));
        assert!(db.prepare("SELECT 1").bind_at(0, 1).is_err());
    }

    #[tokio::test]
    async fn test_driver_errors_propagate() {
        let db = memory().await;
        let err = db
            .insert("missing_table", &attrs(&[("body", "x".into())]))
            .await
            .unwrap_err();
        assert!(matches!(err, ModelError::Database(_)));
    }

    #[tokio::test]
    async fn test_nested_begin_is_rejected() {
        let db = memory().await;
        db.begin_transaction().await.unwrap();
        assert!(db.in_transaction().await);

        let err = db.begin_transaction().await.unwrap_err();
        assert!(matches!(err, ModelError::Transaction(_)));

        db.roll_back().await.unwrap();
        assert!(!db.in_transaction().await);
        assert!(db.commit().await.is_err());
    }

    #[tokio::test]
    async fn test_close_disconnects() {
        let db = memory().await;
        db.health_check().await.unwrap();
        db.close().await.unwrap();
        assert!(!db.is_connected());
        assert!(matches!(
            db.all("SELECT 1", &[]).await.unwrap_err(),
            ModelError::Connection(_)
        ));
    }
}
