//! Query Builder JOIN operations

use super::builder::QueryBuilder;
use super::types::{JoinClause, JoinType};

impl<M> QueryBuilder<M> {
    /// `INNER JOIN table ON left = right`
    pub fn join(self, table: &str, left: &str, right: &str) -> Self {
        self.push_join(JoinType::Inner, table, left, right)
    }

    /// `LEFT JOIN table ON left = right`
    pub fn left_join(self, table: &str, left: &str, right: &str) -> Self {
        self.push_join(JoinType::Left, table, left, right)
    }

    fn push_join(mut self, join_type: JoinType, table: &str, left: &str, right: &str) -> Self {
        self.joins.push(JoinClause {
            join_type,
            table: table.to_owned(),
            left_column: left.to_owned(),
            right_column: right.to_owned(),
        });
        self
    }
}
