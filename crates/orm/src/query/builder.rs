//! Query Builder - Core builder implementation

use std::marker::PhantomData;

use crate::error::QueryError;

use super::predicate::Predicate;
use super::types::*;

/// Query builder for constructing database queries.
///
/// `M` is the model rows are mapped into; `()` builds untyped queries whose
/// results come back as raw rows.
#[derive(Debug)]
pub struct QueryBuilder<M = ()> {
    pub(crate) table: String,
    pub(crate) columns: Vec<String>,
    pub(crate) distinct: bool,
    pub(crate) joins: Vec<JoinClause>,
    pub(crate) wheres: Vec<Predicate>,
    pub(crate) groups: Vec<String>,
    pub(crate) havings: Vec<Predicate>,
    pub(crate) orders: Vec<(String, OrderDirection)>,
    pub(crate) limit: Option<u64>,
    pub(crate) offset: Option<u64>,
    /// First construction error, reported by `compile()`
    pub(crate) error: Option<QueryError>,
    _phantom: PhantomData<M>,
}

impl<M> Clone for QueryBuilder<M> {
    fn clone(&self) -> Self {
        Self {
            table: self.table.clone(),
            columns: self.columns.clone(),
            distinct: self.distinct,
            joins: self.joins.clone(),
            wheres: self.wheres.clone(),
            groups: self.groups.clone(),
            havings: self.havings.clone(),
            orders: self.orders.clone(),
            limit: self.limit,
            offset: self.offset,
            error: self.error.clone(),
            _phantom: PhantomData,
        }
    }
}

impl QueryBuilder<()> {
    /// Untyped query against `table`
    pub fn table(table: impl Into<String>) -> Self {
        Self::new(table)
    }
}

impl<M> QueryBuilder<M> {
    /// Create a new query builder
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            columns: Vec::new(),
            distinct: false,
            joins: Vec::new(),
            wheres: Vec::new(),
            groups: Vec::new(),
            havings: Vec::new(),
            orders: Vec::new(),
            limit: None,
            offset: None,
            error: None,
            _phantom: PhantomData,
        }
    }

    pub fn table_name(&self) -> &str {
        &self.table
    }

    /// WHERE predicates accumulated so far
    pub fn predicates(&self) -> &[Predicate] {
        &self.wheres
    }

    /// Reinterpret the builder for another row type, keeping the query
    pub fn cast<T>(self) -> QueryBuilder<T> {
        QueryBuilder {
            table: self.table,
            columns: self.columns,
            distinct: self.distinct,
            joins: self.joins,
            wheres: self.wheres,
            groups: self.groups,
            havings: self.havings,
            orders: self.orders,
            limit: self.limit,
            offset: self.offset,
            error: self.error,
            _phantom: PhantomData,
        }
    }

    pub(crate) fn record_error(&mut self, err: QueryError) {
        if self.error.is_none() {
            self.error = Some(err);
        }
    }
}
