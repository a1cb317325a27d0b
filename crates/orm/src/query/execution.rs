//! Query Builder execution
//!
//! Raw-row methods work for any builder; hydrating methods need `M: Model`.
//! Every method compiles first, so deferred builder errors surface here
//! before any SQL reaches the database.

use tracing::debug;

use crate::backends::{Attributes, DatabaseValue, Row};
use crate::database::Database;
use crate::error::{ModelError, ModelResult};
use crate::model::{Model, Record};
use crate::repository::Page;

use super::builder::QueryBuilder;
use super::pagination::page_offset;
use super::types::CompiledQuery;

impl<M> QueryBuilder<M> {
    /// Execute the SELECT and return raw rows
    pub async fn get_rows(&self, db: &Database) -> ModelResult<Vec<Row>> {
        let compiled = self.compile()?;
        debug!("Executing query: {}", compiled.sql);
        db.all(&compiled.sql, &compiled.bindings).await
    }

    /// First raw row, fetched with `LIMIT 1`
    pub async fn first_row(&self, db: &Database) -> ModelResult<Option<Row>> {
        let compiled = self.clone().limit(1).compile()?;
        debug!("Executing query: {}", compiled.sql);
        db.first(&compiled.sql, &compiled.bindings).await
    }

    /// Single column of the first row
    pub async fn value(&self, db: &Database, column: &str) -> ModelResult<Option<DatabaseValue>> {
        let row = self.clone().select(column).first_row(db).await?;
        Ok(row.and_then(|row| row.get_by_index(0).cloned()))
    }

    /// One column from every row
    pub async fn pluck(&self, db: &Database, column: &str) -> ModelResult<Vec<DatabaseValue>> {
        let rows = self.clone().select(column).get_rows(db).await?;
        Ok(rows
            .into_iter()
            .map(|row| row.get_by_index(0).cloned().unwrap_or(DatabaseValue::Null))
            .collect())
    }

    /// Number of matching rows, ignoring ORDER BY and LIMIT
    pub async fn count(&self, db: &Database) -> ModelResult<u64> {
        let compiled = self.compile_count()?;
        let value = scalar(db, &compiled).await?;
        let count = value.as_i64().unwrap_or(0);
        Ok(u64::try_from(count).unwrap_or(0))
    }

    pub async fn exists(&self, db: &Database) -> ModelResult<bool> {
        Ok(self.count(db).await? > 0)
    }

    /// `SUM(column)`; an empty set sums to zero
    pub async fn sum(&self, db: &Database, column: &str) -> ModelResult<f64> {
        let compiled = self.compile_aggregate("CAST", &float_of("SUM", column))?;
        Ok(scalar(db, &compiled).await?.as_f64().unwrap_or(0.0))
    }

    /// `AVG(column)`; `None` for an empty set
    pub async fn avg(&self, db: &Database, column: &str) -> ModelResult<Option<f64>> {
        let compiled = self.compile_aggregate("CAST", &float_of("AVG", column))?;
        Ok(scalar(db, &compiled).await?.as_f64())
    }

    pub async fn min(&self, db: &Database, column: &str) -> ModelResult<Option<DatabaseValue>> {
        let compiled = self.compile_aggregate("MIN", column)?;
        Ok(non_null(scalar(db, &compiled).await?))
    }

    pub async fn max(&self, db: &Database, column: &str) -> ModelResult<Option<DatabaseValue>> {
        let compiled = self.compile_aggregate("MAX", column)?;
        Ok(non_null(scalar(db, &compiled).await?))
    }

    /// `UPDATE` every matching row; returns the affected count
    pub async fn update(&self, db: &Database, data: &Attributes) -> ModelResult<u64> {
        let compiled = self.compile_update(data)?;
        debug!("Executing update: {}", compiled.sql);
        Ok(db.execute(&compiled.sql, &compiled.bindings).await?.rows_affected)
    }

    /// `DELETE` every matching row; returns the affected count
    pub async fn delete(&self, db: &Database) -> ModelResult<u64> {
        let compiled = self.compile_delete()?;
        debug!("Executing delete: {}", compiled.sql);
        Ok(db.execute(&compiled.sql, &compiled.bindings).await?.rows_affected)
    }
}

// Implement specialized methods for Model-typed query builders
impl<M: Model> QueryBuilder<M> {
    /// Execute query and return models
    pub async fn get(&self, db: &Database) -> ModelResult<Vec<M>> {
        let rows = self.get_rows(db).await?;
        Ok(rows.into_iter().map(|row| M::from_record(Record::from_row(row))).collect())
    }

    /// Execute query and return first model
    pub async fn first(&self, db: &Database) -> ModelResult<Option<M>> {
        let row = self.first_row(db).await?;
        Ok(row.map(|row| M::from_record(Record::from_row(row))))
    }

    /// Execute query and return first model or error
    pub async fn first_or_fail(&self, db: &Database) -> ModelResult<M> {
        self.first(db)
            .await?
            .ok_or_else(|| ModelError::NotFound(M::table_name().to_string()))
    }

    /// One page of models plus the total count of the unpaged query
    pub async fn paginate(&self, db: &Database, page: u64, per_page: u64) -> ModelResult<Page<M>> {
        if per_page == 0 {
            return Err(ModelError::Validation("per_page must be greater than zero".to_string()));
        }
        let page = page.max(1);
        if page_offset(page, per_page).is_none() {
            return Err(ModelError::Validation(format!(
                "page {} with {} rows per page is out of range",
                page, per_page
            )));
        }

        let total = self.count(db).await?;
        let items = self.clone().for_page(page, per_page).get(db).await?;

        debug!(
            "Paginated {}: page {} of {} rows",
            M::table_name(),
            page,
            total
        );
        Ok(Page::new(items, total, page, per_page))
    }

    /// Execute query with chunking for large datasets
    pub async fn chunk<F>(&self, db: &Database, chunk_size: u64, mut callback: F) -> ModelResult<()>
    where
        F: FnMut(Vec<M>) -> ModelResult<()>,
    {
        if chunk_size == 0 {
            return Err(ModelError::Validation("chunk size must be greater than zero".to_string()));
        }

        let mut offset = 0;
        loop {
            let chunk = self.clone().limit(chunk_size).offset(offset).get(db).await?;
            let len = chunk.len() as u64;
            if len == 0 {
                break;
            }

            callback(chunk)?;
            if len < chunk_size {
                break;
            }
            offset += chunk_size;
        }

        Ok(())
    }
}

async fn scalar(db: &Database, compiled: &CompiledQuery) -> ModelResult<DatabaseValue> {
    debug!("Executing aggregate: {}", compiled.sql);
    let row = db.first(&compiled.sql, &compiled.bindings).await?;
    Ok(row
        .and_then(|row| row.get_by_index(0).cloned())
        .unwrap_or(DatabaseValue::Null))
}

// Postgres returns NUMERIC for SUM/AVG over integers; read it back as a float.
fn float_of(function: &str, column: &str) -> String {
    format!("{}({}) AS DOUBLE PRECISION", function, column)
}

fn non_null(value: DatabaseValue) -> Option<DatabaseValue> {
    if value.is_null() {
        None
    } else {
        Some(value)
    }
}
