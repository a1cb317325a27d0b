//! Query Builder WHERE clause operations
//!
//! Every `where_*` method appends one predicate joined with AND; the
//! `or_where_*` twin appends the same predicate joined with OR.

use crate::backends::DatabaseValue;

use super::builder::QueryBuilder;
use super::predicate::Predicate;
use super::types::*;

impl<M> QueryBuilder<M> {
    /// Append a predicate as-is
    pub fn filter(mut self, predicate: Predicate) -> Self {
        self.wheres.push(predicate);
        self
    }

    /// Append several predicates in order
    pub fn filters<I>(mut self, predicates: I) -> Self
    where
        I: IntoIterator<Item = Predicate>,
    {
        self.wheres.extend(predicates);
        self
    }

    /// Add WHERE condition with an explicit operator
    pub fn where_op<T: Into<DatabaseValue>>(self, column: &str, operator: QueryOperator, value: T) -> Self {
        self.filter(Predicate::op(column, operator, value))
    }

    /// Add WHERE condition with an operator given as text (`"="`, `"<>"`, `"like"`, ...).
    /// An unknown operator is reported by `compile()`.
    pub fn where_condition<T: Into<DatabaseValue>>(mut self, column: &str, operator: &str, value: T) -> Self {
        match operator.parse::<QueryOperator>() {
            Ok(op) => self.where_op(column, op, value),
            Err(err) => {
                self.record_error(err);
                self
            }
        }
    }

    /// Add WHERE condition with equality; a NULL value compiles to `IS NULL`
    pub fn where_eq<T: Into<DatabaseValue>>(self, column: &str, value: T) -> Self {
        self.where_op(column, QueryOperator::Equal, value)
    }

    /// Add WHERE condition with not equal; a NULL value compiles to `IS NOT NULL`
    pub fn where_ne<T: Into<DatabaseValue>>(self, column: &str, value: T) -> Self {
        self.where_op(column, QueryOperator::NotEqual, value)
    }

    pub fn where_gt<T: Into<DatabaseValue>>(self, column: &str, value: T) -> Self {
        self.where_op(column, QueryOperator::GreaterThan, value)
    }

    pub fn where_gte<T: Into<DatabaseValue>>(self, column: &str, value: T) -> Self {
        self.where_op(column, QueryOperator::GreaterThanOrEqual, value)
    }

    pub fn where_lt<T: Into<DatabaseValue>>(self, column: &str, value: T) -> Self {
        self.where_op(column, QueryOperator::LessThan, value)
    }

    pub fn where_lte<T: Into<DatabaseValue>>(self, column: &str, value: T) -> Self {
        self.where_op(column, QueryOperator::LessThanOrEqual, value)
    }

    pub fn where_like<T: Into<DatabaseValue>>(self, column: &str, pattern: T) -> Self {
        self.where_op(column, QueryOperator::Like, pattern)
    }

    pub fn where_not_like<T: Into<DatabaseValue>>(self, column: &str, pattern: T) -> Self {
        self.where_op(column, QueryOperator::NotLike, pattern)
    }

    /// Expand a column -> value mapping into equality predicates joined with AND
    pub fn where_map<I, K, V>(self, pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<DatabaseValue>,
    {
        let predicates: Vec<Predicate> = pairs.into_iter().map(|(k, v)| Predicate::eq(k, v)).collect();
        self.filters(predicates)
    }

    /// Add WHERE condition with IN
    pub fn where_in<I, V>(self, column: &str, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<DatabaseValue>,
    {
        self.filter(Predicate::is_in(column, values))
    }

    /// Add WHERE condition with NOT IN
    pub fn where_not_in<I, V>(self, column: &str, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<DatabaseValue>,
    {
        self.filter(Predicate::not_in(column, values))
    }

    /// Add WHERE condition with IS NULL
    pub fn where_null(self, column: &str) -> Self {
        self.filter(Predicate::null(column))
    }

    /// Add WHERE condition with IS NOT NULL
    pub fn where_not_null(self, column: &str) -> Self {
        self.filter(Predicate::not_null(column))
    }

    /// Add WHERE condition with BETWEEN; binds `low` then `high`
    pub fn where_between<L, H>(self, column: &str, low: L, high: H) -> Self
    where
        L: Into<DatabaseValue>,
        H: Into<DatabaseValue>,
    {
        self.filter(Predicate::between(column, low, high))
    }

    pub fn where_not_between<L, H>(self, column: &str, low: L, high: H) -> Self
    where
        L: Into<DatabaseValue>,
        H: Into<DatabaseValue>,
    {
        self.filter(Predicate::not_between(column, low, high))
    }

    /// Add raw WHERE fragment for complex cases; `bindings` fill its `?` markers
    pub fn where_raw(self, sql: &str, bindings: Vec<DatabaseValue>) -> Self {
        self.filter(Predicate::raw(sql, bindings))
    }

    pub fn or_where_op<T: Into<DatabaseValue>>(self, column: &str, operator: QueryOperator, value: T) -> Self {
        self.filter(Predicate::op(column, operator, value).or())
    }

    pub fn or_where_condition<T: Into<DatabaseValue>>(mut self, column: &str, operator: &str, value: T) -> Self {
        match operator.parse::<QueryOperator>() {
            Ok(op) => self.or_where_op(column, op, value),
            Err(err) => {
                self.record_error(err);
                self
            }
        }
    }

    pub fn or_where_eq<T: Into<DatabaseValue>>(self, column: &str, value: T) -> Self {
        self.or_where_op(column, QueryOperator::Equal, value)
    }

    pub fn or_where_ne<T: Into<DatabaseValue>>(self, column: &str, value: T) -> Self {
        self.or_where_op(column, QueryOperator::NotEqual, value)
    }

    pub fn or_where_gt<T: Into<DatabaseValue>>(self, column: &str, value: T) -> Self {
        self.or_where_op(column, QueryOperator::GreaterThan, value)
    }

    pub fn or_where_gte<T: Into<DatabaseValue>>(self, column: &str, value: T) -> Self {
        self.or_where_op(column, QueryOperator::GreaterThanOrEqual, value)
    }

    pub fn or_where_lt<T: Into<DatabaseValue>>(self, column: &str, value: T) -> Self {
        self.or_where_op(column, QueryOperator::LessThan, value)
    }

    pub fn or_where_lte<T: Into<DatabaseValue>>(self, column: &str, value: T) -> Self {
        self.or_where_op(column, QueryOperator::LessThanOrEqual, value)
    }

    pub fn or_where_like<T: Into<DatabaseValue>>(self, column: &str, pattern: T) -> Self {
        self.or_where_op(column, QueryOperator::Like, pattern)
    }

    pub fn or_where_not_like<T: Into<DatabaseValue>>(self, column: &str, pattern: T) -> Self {
        self.or_where_op(column, QueryOperator::NotLike, pattern)
    }

    /// OR a parenthesized conjunction of equalities: `... OR (a = ? AND b = ?)`
    pub fn or_where_map<I, K, V>(self, pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<DatabaseValue>,
    {
        let predicates = pairs.into_iter().map(|(k, v)| Predicate::eq(k, v)).collect();
        self.filter(Predicate::group(predicates).or())
    }

    pub fn or_where_in<I, V>(self, column: &str, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<DatabaseValue>,
    {
        self.filter(Predicate::is_in(column, values).or())
    }

    pub fn or_where_not_in<I, V>(self, column: &str, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<DatabaseValue>,
    {
        self.filter(Predicate::not_in(column, values).or())
    }

    pub fn or_where_null(self, column: &str) -> Self {
        self.filter(Predicate::null(column).or())
    }

    pub fn or_where_not_null(self, column: &str) -> Self {
        self.filter(Predicate::not_null(column).or())
    }

    pub fn or_where_between<L, H>(self, column: &str, low: L, high: H) -> Self
    where
        L: Into<DatabaseValue>,
        H: Into<DatabaseValue>,
    {
        self.filter(Predicate::between(column, low, high).or())
    }

    pub fn or_where_not_between<L, H>(self, column: &str, low: L, high: H) -> Self
    where
        L: Into<DatabaseValue>,
        H: Into<DatabaseValue>,
    {
        self.filter(Predicate::not_between(column, low, high).or())
    }

    pub fn or_where_raw(self, sql: &str, bindings: Vec<DatabaseValue>) -> Self {
        self.filter(Predicate::raw(sql, bindings).or())
    }
}
