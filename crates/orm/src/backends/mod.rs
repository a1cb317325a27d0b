//! Database Backend Abstractions
//!
//! SQLite and PostgreSQL implement the same pool and transaction traits, so
//! the connection manager never branches on the engine.

pub mod core;
pub mod postgres;
pub mod sqlite;

use std::sync::Arc;

use crate::error::ModelError;

pub use self::core::*;
pub use postgres::PostgresBackend;
pub use sqlite::SqliteBackend;

/// Engines a [`Database`](crate::Database) can drive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DatabaseBackendType {
    PostgreSQL,
    SQLite,
}

impl DatabaseBackendType {
    /// Backend named by the URL scheme (`sqlite:`, `postgres://`, `postgresql://`)
    pub fn from_url(url: &str) -> Option<Self> {
        let (scheme, _) = url.split_once(':')?;
        scheme.parse().ok()
    }

    pub fn name(&self) -> &'static str {
        match self {
            DatabaseBackendType::PostgreSQL => "postgresql",
            DatabaseBackendType::SQLite => "sqlite",
        }
    }

    pub fn backend(&self) -> Arc<dyn DatabaseBackend> {
        match self {
            DatabaseBackendType::PostgreSQL => Arc::new(PostgresBackend::new()),
            DatabaseBackendType::SQLite => Arc::new(SqliteBackend::new()),
        }
    }
}

impl std::fmt::Display for DatabaseBackendType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for DatabaseBackendType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("sqlite") {
            Ok(DatabaseBackendType::SQLite)
        } else if s.eq_ignore_ascii_case("postgresql") || s.eq_ignore_ascii_case("postgres") {
            Ok(DatabaseBackendType::PostgreSQL)
        } else {
            Err(format!("Unsupported database backend: {}", s))
        }
    }
}

/// Attach context to a driver error, keeping connection failures distinct
pub(crate) fn driver_error(context: &str, err: sqlx::Error) -> ModelError {
    match ModelError::from(err) {
        ModelError::Database(msg) => ModelError::Database(format!("{}: {}", context, msg)),
        ModelError::Connection(msg) => ModelError::Connection(format!("{}: {}", context, msg)),
        other => other,
    }
}
