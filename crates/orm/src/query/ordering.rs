//! Query Builder ORDER BY, GROUP BY, HAVING operations

use crate::backends::DatabaseValue;

use super::builder::QueryBuilder;
use super::predicate::Predicate;
use super::types::*;

impl<M> QueryBuilder<M> {
    /// Add ORDER BY clause; any direction other than `asc` sorts descending
    pub fn order_by(mut self, column: &str, direction: &str) -> Self {
        self.orders
            .push((column.to_string(), OrderDirection::from_str_lossy(direction)));
        self
    }

    /// Add ORDER BY clause (ascending)
    pub fn order_by_asc(mut self, column: &str) -> Self {
        self.orders.push((column.to_string(), OrderDirection::Asc));
        self
    }

    /// Add ORDER BY clause (descending)
    pub fn order_by_desc(mut self, column: &str) -> Self {
        self.orders.push((column.to_string(), OrderDirection::Desc));
        self
    }

    /// Add GROUP BY clause
    pub fn group_by(mut self, column: &str) -> Self {
        self.groups.push(column.to_string());
        self
    }

    /// Add HAVING condition; its bindings follow every WHERE binding
    pub fn having<T: Into<DatabaseValue>>(mut self, column: &str, operator: QueryOperator, value: T) -> Self {
        self.havings.push(Predicate::op(column, operator, value));
        self
    }

    /// Add raw HAVING fragment with its own bindings
    pub fn having_raw(mut self, sql: &str, bindings: Vec<DatabaseValue>) -> Self {
        self.havings.push(Predicate::raw(sql, bindings));
        self
    }
}
