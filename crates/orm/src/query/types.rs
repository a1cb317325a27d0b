//! Query Builder Types
//!
//! Operators, directions and join kinds each render as the SQL keyword
//! they stand for.

use std::fmt;
use std::str::FromStr;

use crate::backends::DatabaseValue;
use crate::error::QueryError;

/// Comparison operators for basic predicates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryOperator {
    Equal,
    NotEqual,
    GreaterThan,
    GreaterThanOrEqual,
    LessThan,
    LessThanOrEqual,
    Like,
    NotLike,
}

impl QueryOperator {
    /// SQL spelling; `!=` is emitted for inequality
    pub fn keyword(&self) -> &'static str {
        match self {
            QueryOperator::Equal => "=",
            QueryOperator::NotEqual => "!=",
            QueryOperator::GreaterThan => ">",
            QueryOperator::GreaterThanOrEqual => ">=",
            QueryOperator::LessThan => "<",
            QueryOperator::LessThanOrEqual => "<=",
            QueryOperator::Like => "LIKE",
            QueryOperator::NotLike => "NOT LIKE",
        }
    }
}

impl fmt::Display for QueryOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

impl FromStr for QueryOperator {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.split_whitespace().collect::<Vec<_>>().join(" ").to_uppercase();
        match normalized.as_str() {
            "=" => Ok(QueryOperator::Equal),
            "!=" | "<>" => Ok(QueryOperator::NotEqual),
            ">" => Ok(QueryOperator::GreaterThan),
            ">=" => Ok(QueryOperator::GreaterThanOrEqual),
            "<" => Ok(QueryOperator::LessThan),
            "<=" => Ok(QueryOperator::LessThanOrEqual),
            "LIKE" => Ok(QueryOperator::Like),
            "NOT LIKE" => Ok(QueryOperator::NotLike),
            _ => Err(QueryError::UnsupportedOperator(s.to_string())),
        }
    }
}

/// Keyword joining a predicate to the one before it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogicalOperator {
    #[default]
    And,
    Or,
}

impl LogicalOperator {
    pub fn keyword(&self) -> &'static str {
        match self {
            LogicalOperator::And => "AND",
            LogicalOperator::Or => "OR",
        }
    }
}

impl fmt::Display for LogicalOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

/// Sort direction of an ORDER BY term
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderDirection {
    Asc,
    Desc,
}

impl OrderDirection {
    /// `asc` in any case is ascending; every other input is descending
    pub fn from_str_lossy(direction: &str) -> Self {
        if direction.trim().eq_ignore_ascii_case("asc") {
            OrderDirection::Asc
        } else {
            OrderDirection::Desc
        }
    }
}

impl OrderDirection {
    pub fn keyword(&self) -> &'static str {
        match self {
            OrderDirection::Asc => "ASC",
            OrderDirection::Desc => "DESC",
        }
    }
}

impl fmt::Display for OrderDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinType {
    Inner,
    Left,
}

impl JoinType {
    pub fn keyword(&self) -> &'static str {
        match self {
            JoinType::Inner => "INNER JOIN",
            JoinType::Left => "LEFT JOIN",
        }
    }
}

impl fmt::Display for JoinType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

/// `<kind> <table> ON <left> = <right>`
#[derive(Debug, Clone, PartialEq)]
pub struct JoinClause {
    pub join_type: JoinType,
    pub table: String,
    pub left_column: String,
    pub right_column: String,
}

/// SQL text plus its positional bindings, in placeholder order
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledQuery {
    pub sql: String,
    pub bindings: Vec<DatabaseValue>,
}

impl CompiledQuery {
    pub fn placeholders(&self) -> usize {
        crate::sql::count_placeholders(&self.sql)
    }
}
