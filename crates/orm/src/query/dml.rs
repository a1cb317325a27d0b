//! Query Builder DML operations (UPDATE, DELETE)
//!
//! Set-based writes reuse the builder's WHERE predicates. Joins, ordering and
//! limits are not part of these statements.

use crate::backends::{Attributes, DatabaseValue};
use crate::error::QueryError;

use super::builder::QueryBuilder;
use super::sql_generation::checked;
use super::types::CompiledQuery;

impl<M> QueryBuilder<M> {
    /// `UPDATE <table> SET ... WHERE ...`; SET bindings precede WHERE bindings
    pub fn compile_update(&self, data: &Attributes) -> Result<CompiledQuery, QueryError> {
        self.validate()?;
        if data.is_empty() {
            return Err(QueryError::InvalidParameter(format!(
                "update on '{}' has no columns to set",
                self.table
            )));
        }

        let assignments: Vec<String> = data.keys().map(|column| format!("{} = ?", column)).collect();
        let mut sql = format!("UPDATE {} SET {}", self.table, assignments.join(", "));
        let mut bindings: Vec<DatabaseValue> = data.values().cloned().collect();
        self.build_where_clause(&mut sql, &mut bindings);
        checked(sql, bindings)
    }

    /// `DELETE FROM <table> WHERE ...`
    pub fn compile_delete(&self) -> Result<CompiledQuery, QueryError> {
        self.validate()?;

        let mut sql = format!("DELETE FROM {}", self.table);
        let mut bindings = Vec::new();
        self.build_where_clause(&mut sql, &mut bindings);
        checked(sql, bindings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::QueryBuilder;

    #[test]
    fn test_update_binds_set_values_first() {
        let mut data = Attributes::new();
        data.insert("is_active".to_string(), DatabaseValue::Int64(0));

        let compiled = QueryBuilder::table("plans")
            .where_in("id", [4, 5])
            .compile_update(&data)
            .unwrap();
        assert_eq!(compiled.sql, "UPDATE plans SET is_active = ? WHERE id IN (?, ?)");
        assert_eq!(
            compiled.bindings,
            vec![DatabaseValue::Int64(0), DatabaseValue::Int64(4), DatabaseValue::Int64(5)]
        );
    }

    #[test]
    fn test_update_requires_columns() {
        let err = QueryBuilder::table("plans").compile_update(&Attributes::new()).unwrap_err();
        assert!(matches!(err, QueryError::InvalidParameter(_)));
    }

    #[test]
    fn test_delete_uses_predicates() {
        let compiled = QueryBuilder::table("sessions")
            .where_lt("expires_at", "2024-01-01 00:00:00")
            .compile_delete()
            .unwrap();
        assert_eq!(compiled.sql, "DELETE FROM sessions WHERE expires_at < ?");
        assert_eq!(compiled.bindings.len(), 1);
    }
}
