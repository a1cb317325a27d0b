//! Query Builder SELECT operations

use super::builder::QueryBuilder;

impl<M> QueryBuilder<M> {
    /// Replace the selected columns. `"a, b"` is split on commas.
    pub fn select(mut self, fields: &str) -> Self {
        self.columns.clear();
        self.add_select(fields)
    }

    /// Append columns to the current selection
    pub fn add_select(mut self, fields: &str) -> Self {
        self.columns.extend(
            fields
                .split(',')
                .map(|f| f.trim())
                .filter(|f| !f.is_empty())
                .map(str::to_string),
        );
        self
    }

    /// Add custom SELECT expression, kept verbatim
    pub fn select_raw(mut self, expression: &str) -> Self {
        self.columns.push(expression.to_string());
        self
    }

    /// Add SELECT DISTINCT to the query
    pub fn distinct(mut self) -> Self {
        self.distinct = true;
        self
    }
}
