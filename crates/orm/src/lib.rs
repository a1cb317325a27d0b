//! # tessera-orm: data-access core
//!
//! Fluent SQL query builder, active-record models, a connection manager
//! over sqlx pools and a repository layer for named domain queries.
//!
//! ```no_run
//! use tessera_orm::{CrudOperations, Database, DatabaseConfig, ModelResult};
//! use tessera_orm::models::Plan;
//!
//! # async fn run() -> ModelResult<()> {
//! let db = Database::connect(DatabaseConfig::new("sqlite://app.db")).await?;
//! let plans = Plan::query()
//!     .where_eq("is_active", 1)
//!     .order_by_asc("sort_order")
//!     .get(&db)
//!     .await?;
//! # let _ = plans;
//! # Ok(())
//! # }
//! ```

pub mod backends;
pub mod config;
pub mod database;
pub mod error;
pub mod model;
pub mod models;
pub mod query;
pub mod relationships;
pub mod repositories;
pub mod repository;
pub mod sql;

// Re-export core traits and types
pub use backends::{Attributes, DatabaseBackendType, DatabaseValue, Row, SqlDialect};
pub use config::{ConfigError, DatabaseConfig};
pub use database::{global, set_global, Database, Statement};
pub use error::*;
pub use model::{CastType, CrudOperations, Model, Record, RecordState};
pub use query::{CompiledQuery, LogicalOperator, OrderDirection, Predicate, QueryBuilder, QueryOperator};
pub use relationships::Relationships;
pub use repository::{Page, Repository};
