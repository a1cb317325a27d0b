//! Predicate nodes
//!
//! One node per WHERE/HAVING condition. Nodes render themselves and push their
//! bindings in the same pass, so placeholder order and binding order cannot
//! drift apart.

use crate::backends::DatabaseValue;
use crate::error::QueryError;

use super::types::{LogicalOperator, QueryOperator};

/// A single WHERE/HAVING condition
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    Basic {
        column: String,
        operator: QueryOperator,
        value: DatabaseValue,
        boolean: LogicalOperator,
    },
    In {
        column: String,
        values: Vec<DatabaseValue>,
        boolean: LogicalOperator,
        negated: bool,
    },
    Null {
        column: String,
        boolean: LogicalOperator,
        negated: bool,
    },
    Between {
        column: String,
        low: DatabaseValue,
        high: DatabaseValue,
        boolean: LogicalOperator,
        negated: bool,
    },
    /// Caller-written SQL fragment with its own `?` bindings
    Raw {
        sql: String,
        bindings: Vec<DatabaseValue>,
        boolean: LogicalOperator,
    },
    /// Parenthesized conjunction/disjunction of nested predicates
    Group {
        predicates: Vec<Predicate>,
        boolean: LogicalOperator,
    },
}

impl Predicate {
    pub fn op(column: impl Into<String>, operator: QueryOperator, value: impl Into<DatabaseValue>) -> Self {
        Predicate::Basic {
            column: column.into(),
            operator,
            value: value.into(),
            boolean: LogicalOperator::And,
        }
    }

    pub fn eq(column: impl Into<String>, value: impl Into<DatabaseValue>) -> Self {
        Self::op(column, QueryOperator::Equal, value)
    }

    pub fn ne(column: impl Into<String>, value: impl Into<DatabaseValue>) -> Self {
        Self::op(column, QueryOperator::NotEqual, value)
    }

    pub fn like(column: impl Into<String>, pattern: impl Into<DatabaseValue>) -> Self {
        Self::op(column, QueryOperator::Like, pattern)
    }

    pub fn is_in<I, V>(column: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<DatabaseValue>,
    {
        Predicate::In {
            column: column.into(),
            values: values.into_iter().map(Into::into).collect(),
            boolean: LogicalOperator::And,
            negated: false,
        }
    }

    pub fn not_in<I, V>(column: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<DatabaseValue>,
    {
        Self::is_in(column, values).negate()
    }

    pub fn null(column: impl Into<String>) -> Self {
        Predicate::Null {
            column: column.into(),
            boolean: LogicalOperator::And,
            negated: false,
        }
    }

    pub fn not_null(column: impl Into<String>) -> Self {
        Self::null(column).negate()
    }

    pub fn between(
        column: impl Into<String>,
        low: impl Into<DatabaseValue>,
        high: impl Into<DatabaseValue>,
    ) -> Self {
        Predicate::Between {
            column: column.into(),
            low: low.into(),
            high: high.into(),
            boolean: LogicalOperator::And,
            negated: false,
        }
    }

    pub fn not_between(
        column: impl Into<String>,
        low: impl Into<DatabaseValue>,
        high: impl Into<DatabaseValue>,
    ) -> Self {
        Self::between(column, low, high).negate()
    }

    pub fn raw(sql: impl Into<String>, bindings: Vec<DatabaseValue>) -> Self {
        Predicate::Raw {
            sql: sql.into(),
            bindings,
            boolean: LogicalOperator::And,
        }
    }

    pub fn group(predicates: Vec<Predicate>) -> Self {
        Predicate::Group {
            predicates,
            boolean: LogicalOperator::And,
        }
    }

    /// Join this predicate to the previous one with OR
    pub fn or(self) -> Self {
        self.with_boolean(LogicalOperator::Or)
    }

    pub fn with_boolean(mut self, new_boolean: LogicalOperator) -> Self {
        match &mut self {
            Predicate::Basic { boolean, .. }
            | Predicate::In { boolean, .. }
            | Predicate::Null { boolean, .. }
            | Predicate::Between { boolean, .. }
            | Predicate::Raw { boolean, .. }
            | Predicate::Group { boolean, .. } => *boolean = new_boolean,
        }
        self
    }

    pub fn boolean(&self) -> LogicalOperator {
        match self {
            Predicate::Basic { boolean, .. }
            | Predicate::In { boolean, .. }
            | Predicate::Null { boolean, .. }
            | Predicate::Between { boolean, .. }
            | Predicate::Raw { boolean, .. }
            | Predicate::Group { boolean, .. } => *boolean,
        }
    }

    /// Flip `IN`, `NULL` and `BETWEEN` nodes to their negated forms.
    /// Basic nodes negate their operator where one exists.
    pub fn negate(mut self) -> Self {
        match &mut self {
            Predicate::In { negated, .. }
            | Predicate::Null { negated, .. }
            | Predicate::Between { negated, .. } => *negated = !*negated,
            Predicate::Basic { operator, .. } => {
                *operator = match *operator {
                    QueryOperator::Equal => QueryOperator::NotEqual,
                    QueryOperator::NotEqual => QueryOperator::Equal,
                    QueryOperator::Like => QueryOperator::NotLike,
                    QueryOperator::NotLike => QueryOperator::Like,
                    QueryOperator::GreaterThan => QueryOperator::LessThanOrEqual,
                    QueryOperator::GreaterThanOrEqual => QueryOperator::LessThan,
                    QueryOperator::LessThan => QueryOperator::GreaterThanOrEqual,
                    QueryOperator::LessThanOrEqual => QueryOperator::GreaterThan,
                }
            }
            Predicate::Raw { .. } | Predicate::Group { .. } => {}
        }
        self
    }

    /// Reject nodes that can only produce invalid SQL
    pub(crate) fn validate(&self) -> Result<(), QueryError> {
        match self {
            Predicate::In { column, values, .. } if values.is_empty() => {
                Err(QueryError::EmptyInList(column.clone()))
            }
            Predicate::Group { predicates, .. } => {
                if predicates.is_empty() {
                    return Err(QueryError::InvalidParameter("empty predicate group".to_string()));
                }
                predicates.iter().try_for_each(Predicate::validate)
            }
            _ => Ok(()),
        }
    }

    /// Append this node's SQL to `sql` and its values to `bindings`
    pub(crate) fn render(&self, sql: &mut String, bindings: &mut Vec<DatabaseValue>) {
        match self {
            Predicate::Basic {
                column,
                operator,
                value,
                ..
            } => match (operator, value) {
                (QueryOperator::Equal, DatabaseValue::Null) => {
                    sql.push_str(&format!("{} IS NULL", column));
                }
                (QueryOperator::NotEqual, DatabaseValue::Null) => {
                    sql.push_str(&format!("{} IS NOT NULL", column));
                }
                _ => {
                    sql.push_str(&format!("{} {} ?", column, operator));
                    bindings.push(value.clone());
                }
            },
            Predicate::In {
                column,
                values,
                negated,
                ..
            } => {
                let markers = vec!["?"; values.len()].join(", ");
                let keyword = if *negated { "NOT IN" } else { "IN" };
                sql.push_str(&format!("{} {} ({})", column, keyword, markers));
                bindings.extend(values.iter().cloned());
            }
            Predicate::Null { column, negated, .. } => {
                let keyword = if *negated { "IS NOT NULL" } else { "IS NULL" };
                sql.push_str(&format!("{} {}", column, keyword));
            }
            Predicate::Between {
                column,
                low,
                high,
                negated,
                ..
            } => {
                let keyword = if *negated { "NOT BETWEEN" } else { "BETWEEN" };
                sql.push_str(&format!("{} {} ? AND ?", column, keyword));
                bindings.push(low.clone());
                bindings.push(high.clone());
            }
            Predicate::Raw {
                sql: fragment,
                bindings: values,
                ..
            } => {
                // Parenthesized so an inner OR cannot bind to neighbouring predicates
                sql.push('(');
                sql.push_str(fragment);
                sql.push(')');
                bindings.extend(values.iter().cloned());
            }
            Predicate::Group { predicates, .. } => {
                sql.push('(');
                render_predicates(predicates, sql, bindings);
                sql.push(')');
            }
        }
    }
}

/// Render a predicate list; the first node's boolean keyword is never emitted
pub(crate) fn render_predicates(predicates: &[Predicate], sql: &mut String, bindings: &mut Vec<DatabaseValue>) {
    for (i, predicate) in predicates.iter().enumerate() {
        if i > 0 {
            sql.push(' ');
            sql.push_str(&predicate.boolean().to_string());
            sql.push(' ');
        }
        predicate.render(sql, bindings);
    }
}
