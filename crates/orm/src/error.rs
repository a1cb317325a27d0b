//! Error types for the ORM system
//!
//! Every fallible operation in the crate returns [`ModelResult`]. Builder
//! compilation failures are raised as [`QueryError`] and folded into
//! [`ModelError::Query`] at the execution boundary.

use thiserror::Error;

use crate::config::ConfigError;

pub type ModelResult<T> = Result<T, ModelError>;

/// Alias used by the driver layer
pub type OrmError = ModelError;

pub type OrmResult<T> = ModelResult<T>;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ModelError {
    /// Driver-level failure while running a statement (syntax, constraint, ...)
    #[error("Database error: {0}")]
    Database(String),

    #[error("Record not found: {0}")]
    NotFound(String),

    /// Input rejected before reaching the database
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Primary key is missing or invalid")]
    MissingPrimaryKey,

    #[error("Relationship error: {0}")]
    Relationship(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Pool could not be opened, timed out or was closed
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Transaction error: {0}")]
    Transaction(String),

    #[error("Query error: {0}")]
    Query(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Carries the table name of a model that was never saved or loaded
    #[error("Model from table '{0}' has not been persisted")]
    NotPersisted(String),

    /// Carries the table name of a model whose row was deleted
    #[error("Model from table '{0}' was deleted and is detached")]
    Detached(String),
}

impl ModelError {
    /// Whether this error means "no matching row"
    pub fn is_not_found(&self) -> bool {
        matches!(self, ModelError::NotFound(_))
    }
}

impl From<sqlx::Error> for ModelError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                ModelError::Connection(err.to_string())
            }
            sqlx::Error::RowNotFound => ModelError::NotFound(err.to_string()),
            other => ModelError::Database(other.to_string()),
        }
    }
}

impl From<serde_json::Error> for ModelError {
    fn from(err: serde_json::Error) -> Self {
        ModelError::Serialization(err.to_string())
    }
}

impl From<ConfigError> for ModelError {
    fn from(err: ConfigError) -> Self {
        ModelError::Configuration(err.to_string())
    }
}

/// Failures detected while compiling a builder into SQL
#[derive(Debug, Clone, PartialEq, Error)]
pub enum QueryError {
    #[error("Empty value list for IN predicate on column '{0}'")]
    EmptyInList(String),

    #[error("Unsupported operator: {0}")]
    UnsupportedOperator(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// `where<Column>` style method name that cannot be decomposed
    #[error("Invalid dynamic method: {0}")]
    InvalidDynamicMethod(String),

    #[error("Parameter mismatch: {placeholders} placeholders but {bindings} bindings")]
    ParameterMismatch { placeholders: usize, bindings: usize },
}

impl From<QueryError> for ModelError {
    fn from(err: QueryError) -> Self {
        ModelError::Query(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_error_converts_to_model_error() {
        let err: ModelError = QueryError::EmptyInList("id".to_string()).into();
        assert_eq!(
            err,
            ModelError::Query("Empty value list for IN predicate on column 'id'".to_string())
        );
    }

    #[test]
    fn test_row_not_found_maps_to_not_found() {
        let err: ModelError = sqlx::Error::RowNotFound.into();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_display_messages() {
        assert_eq!(
            ModelError::Detached("users".to_string()).to_string(),
            "Model from table 'users' was deleted and is detached"
        );
        assert_eq!(
            QueryError::ParameterMismatch { placeholders: 2, bindings: 1 }.to_string(),
            "Parameter mismatch: 2 placeholders but 1 bindings"
        );
    }
}
