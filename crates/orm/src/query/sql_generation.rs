//! Query Builder SQL generation
//!
//! Every statement uses the positional `?` marker. Bindings are collected in
//! the same pass that writes the markers: WHERE first, then HAVING.

use crate::backends::DatabaseValue;
use crate::error::QueryError;

use super::builder::QueryBuilder;
use super::predicate::{render_predicates, Predicate};
use super::types::*;

impl<M> QueryBuilder<M> {
    /// SELECT statement text. Never fails; use `compile()` to validate.
    pub fn to_sql(&self) -> String {
        self.build_select_sql().0
    }

    /// Bindings for `to_sql()`, in placeholder order
    pub fn bindings(&self) -> Vec<DatabaseValue> {
        self.build_select_sql().1
    }

    /// Validate the query and produce SQL plus bindings
    pub fn compile(&self) -> Result<CompiledQuery, QueryError> {
        self.validate()?;
        let (sql, bindings) = self.build_select_sql();
        checked(sql, bindings)
    }

    /// `SELECT COUNT(*)` over the same FROM/JOIN/WHERE, ignoring order and limits
    pub fn compile_count(&self) -> Result<CompiledQuery, QueryError> {
        self.validate()?;

        if self.groups.is_empty() && self.havings.is_empty() && !self.distinct {
            let mut sql = format!("SELECT COUNT(*) AS aggregate FROM {}", self.table);
            let mut bindings = Vec::new();
            self.build_joins(&mut sql);
            self.build_where_clause(&mut sql, &mut bindings);
            return checked(sql, bindings);
        }

        let mut inner = self.clone();
        inner.orders.clear();
        inner.limit = None;
        inner.offset = None;
        let (inner_sql, bindings) = inner.build_select_sql();
        checked(
            format!("SELECT COUNT(*) AS aggregate FROM ({}) AS counted", inner_sql),
            bindings,
        )
    }

    /// `SELECT <function>(<column>) AS aggregate` over the same filters
    pub fn compile_aggregate(&self, function: &str, column: &str) -> Result<CompiledQuery, QueryError> {
        self.validate()?;

        let mut sql = format!("SELECT {}({}) AS aggregate FROM {}", function, column, self.table);
        let mut bindings = Vec::new();
        self.build_joins(&mut sql);
        self.build_where_clause(&mut sql, &mut bindings);
        checked(sql, bindings)
    }

    pub(crate) fn validate(&self) -> Result<(), QueryError> {
        if let Some(err) = &self.error {
            return Err(err.clone());
        }
        self.wheres
            .iter()
            .chain(&self.havings)
            .try_for_each(Predicate::validate)
    }

    /// Build SELECT SQL with parameters
    fn build_select_sql(&self) -> (String, Vec<DatabaseValue>) {
        let mut sql = String::new();
        let mut bindings = Vec::new();

        if self.distinct {
            sql.push_str("SELECT DISTINCT ");
        } else {
            sql.push_str("SELECT ");
        }

        if self.columns.is_empty() {
            sql.push('*');
        } else {
            sql.push_str(&self.columns.join(", "));
        }

        sql.push_str(" FROM ");
        sql.push_str(&self.table);

        self.build_joins(&mut sql);
        self.build_where_clause(&mut sql, &mut bindings);

        if !self.groups.is_empty() {
            sql.push_str(" GROUP BY ");
            sql.push_str(&self.groups.join(", "));
        }

        if !self.havings.is_empty() {
            sql.push_str(" HAVING ");
            render_predicates(&self.havings, &mut sql, &mut bindings);
        }

        self.build_order_limit_clause(&mut sql);

        (sql, bindings)
    }

    fn build_joins(&self, sql: &mut String) {
        for join in &self.joins {
            sql.push_str(&format!(
                " {} {} ON {} = {}",
                join.join_type, join.table, join.left_column, join.right_column
            ));
        }
    }

    /// Helper method to build WHERE clauses
    pub(crate) fn build_where_clause(&self, sql: &mut String, bindings: &mut Vec<DatabaseValue>) {
        if !self.wheres.is_empty() {
            sql.push_str(" WHERE ");
            render_predicates(&self.wheres, sql, bindings);
        }
    }

    /// Helper method to build ORDER BY and LIMIT clauses
    fn build_order_limit_clause(&self, sql: &mut String) {
        if !self.orders.is_empty() {
            let orders: Vec<String> = self
                .orders
                .iter()
                .map(|(column, direction)| format!("{} {}", column, direction))
                .collect();
            sql.push_str(" ORDER BY ");
            sql.push_str(&orders.join(", "));
        }

        if let Some(limit) = self.limit {
            sql.push_str(&format!(" LIMIT {}", limit));
            if let Some(offset) = self.offset {
                sql.push_str(&format!(" OFFSET {}", offset));
            }
        }
    }
}

/// Enforce the placeholder/binding count invariant
pub(crate) fn checked(sql: String, bindings: Vec<DatabaseValue>) -> Result<CompiledQuery, QueryError> {
    let placeholders = crate::sql::count_placeholders(&sql);
    if placeholders != bindings.len() {
        return Err(QueryError::ParameterMismatch {
            placeholders,
            bindings: bindings.len(),
        });
    }
    Ok(CompiledQuery { sql, bindings })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::QueryBuilder;

    #[test]
    fn test_select_all() {
        assert_eq!(QueryBuilder::table("users").to_sql(), "SELECT * FROM users");
    }

    #[test]
    fn test_or_where_has_no_leading_boolean() {
        let query = QueryBuilder::table("users").where_eq("a", 1).or_where_eq("b", 2);
        assert_eq!(query.to_sql(), "SELECT * FROM users WHERE a = ? OR b = ?");

        let query = QueryBuilder::table("users").or_where_eq("a", 1);
        assert_eq!(query.to_sql(), "SELECT * FROM users WHERE a = ?");
    }

    #[test]
    fn test_where_in_and_not_in() {
        let query = QueryBuilder::table("users").where_in("id", [1, 2, 3]);
        assert_eq!(query.to_sql(), "SELECT * FROM users WHERE id IN (?, ?, ?)");
        assert_eq!(
            query.bindings(),
            vec![DatabaseValue::Int64(1), DatabaseValue::Int64(2), DatabaseValue::Int64(3)]
        );

        let query = QueryBuilder::table("users").where_not_in("id", [1, 2, 3]);
        assert_eq!(query.to_sql(), "SELECT * FROM users WHERE id NOT IN (?, ?, ?)");
    }

    #[test]
    fn test_binding_order_matches_placeholders() {
        let query = QueryBuilder::table("credit_transactions")
            .select("type, SUM(amount) AS total")
            .where_eq("user_id", 7)
            .where_in("type", ["purchase", "gift"])
            .where_between("amount", 10, 500)
            .or_where_null("note")
            .group_by("type")
            .having("SUM(amount)", QueryOperator::GreaterThan, 100)
            .order_by("total", "desc")
            .limit(5);

        let compiled = query.compile().unwrap();
        assert_eq!(
            compiled.sql,
            "SELECT type, SUM(amount) AS total FROM credit_transactions \
             WHERE user_id = ? AND type IN (?, ?) AND amount BETWEEN ? AND ? OR note IS NULL \
             GROUP BY type HAVING SUM(amount) > ? ORDER BY total DESC LIMIT 5"
        );
        assert_eq!(compiled.placeholders(), compiled.bindings.len());
        assert_eq!(
            compiled.bindings,
            vec![
                DatabaseValue::Int64(7),
                DatabaseValue::from("purchase"),
                DatabaseValue::from("gift"),
                DatabaseValue::Int64(10),
                DatabaseValue::Int64(500),
                DatabaseValue::Int64(100),
            ]
        );
    }

    #[test]
    fn test_compile_rejects_empty_in_list() {
        let none: Vec<i64> = Vec::new();
        let query = QueryBuilder::table("users").where_in("id", none);
        assert_eq!(query.to_sql(), "SELECT * FROM users WHERE id IN ()");
        assert_eq!(query.compile(), Err(QueryError::EmptyInList("id".to_string())));
    }

    #[test]
    fn test_compile_rejects_unknown_operator() {
        let query = QueryBuilder::table("users").where_condition("age", "~~", 3);
        assert_eq!(query.to_sql(), "SELECT * FROM users");
        assert_eq!(
            query.compile(),
            Err(QueryError::UnsupportedOperator("~~".to_string()))
        );
    }

    #[test]
    fn test_compile_rejects_raw_binding_mismatch() {
        let query = QueryBuilder::table("users").where_raw("age > ? AND age < ?", vec![18.into()]);
        assert_eq!(
            query.compile(),
            Err(QueryError::ParameterMismatch {
                placeholders: 2,
                bindings: 1
            })
        );
    }

    #[test]
    fn test_joins_and_distinct() {
        let sql = QueryBuilder::table("users")
            .select("users.email")
            .distinct()
            .join("credit_transactions", "credit_transactions.user_id", "users.id")
            .left_join("plans", "plans.id", "users.plan_id")
            .to_sql();
        assert_eq!(
            sql,
            "SELECT DISTINCT users.email FROM users \
             INNER JOIN credit_transactions ON credit_transactions.user_id = users.id \
             LEFT JOIN plans ON plans.id = users.plan_id"
        );
    }

    #[test]
    fn test_count_keeps_filters_but_drops_paging() {
        let query = QueryBuilder::table("users")
            .where_eq("role", "admin")
            .order_by_desc("id")
            .for_page(2, 10);
        let compiled = query.compile_count().unwrap();
        assert_eq!(compiled.sql, "SELECT COUNT(*) AS aggregate FROM users WHERE role = ?");
        assert_eq!(compiled.bindings, vec![DatabaseValue::from("admin")]);

        let grouped = QueryBuilder::table("credit_transactions").select("type").group_by("type");
        assert_eq!(
            grouped.compile_count().unwrap().sql,
            "SELECT COUNT(*) AS aggregate FROM (SELECT type FROM credit_transactions GROUP BY type) AS counted"
        );
    }

    #[test]
    fn test_count_with_having_counts_filtered_rows() {
        let query = QueryBuilder::table("credit_transactions")
            .select("user_id")
            .having("COUNT(*)", QueryOperator::GreaterThan, 2);
        let compiled = query.compile_count().unwrap();
        assert_eq!(
            compiled.sql,
            "SELECT COUNT(*) AS aggregate FROM \
             (SELECT user_id FROM credit_transactions HAVING COUNT(*) > ?) AS counted"
        );
        assert_eq!(compiled.bindings, vec![DatabaseValue::Int64(2)]);
    }

    #[test]
    fn test_raw_fragment_is_parenthesized() {
        let query = QueryBuilder::table("users")
            .where_eq("active", 1)
            .where_raw("role = ? OR email LIKE ?", vec!["admin".into(), "%@ops.io".into()]);
        assert_eq!(
            query.to_sql(),
            "SELECT * FROM users WHERE active = ? AND (role = ? OR email LIKE ?)"
        );
        assert_eq!(query.compile().unwrap().placeholders(), 3);
    }

    #[test]
    fn test_select_replaces_columns() {
        let sql = QueryBuilder::table("users")
            .select("id")
            .select("email, name")
            .add_select("role")
            .to_sql();
        assert_eq!(sql, "SELECT email, name, role FROM users");
    }
}
