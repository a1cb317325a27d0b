//! Query Builder Module - Fluent SQL construction with positional bindings

pub mod builder;
pub mod dml;
pub mod dynamic;
pub mod execution;
pub mod joins;
pub mod ordering;
pub mod pagination;
pub mod predicate;
pub mod select;
pub mod sql_generation;
pub mod types;
pub mod where_clause;

pub use builder::QueryBuilder;
pub use dynamic::{DynamicOperator, DynamicWhere};
pub use predicate::Predicate;
pub use types::{CompiledQuery, JoinClause, JoinType, LogicalOperator, OrderDirection, QueryOperator};
