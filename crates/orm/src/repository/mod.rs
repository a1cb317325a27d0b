//! Repository layer - named, typed query operations for one entity
//!
//! A repository owns a `&Database` (or anything that derefs to one) and
//! exposes finders that never leak SQL to callers. Entity-specific
//! repositories add their own finders on top of the defaults here.

pub mod page;

pub use page::Page;

use tracing::debug;

use crate::backends::DatabaseValue;
use crate::database::Database;
use crate::error::{ModelError, ModelResult};
use crate::model::{CrudOperations, Model};
use crate::query::{Predicate, QueryBuilder};

/// Generic async repository for one model type
pub trait Repository: Send + Sync {
    type Entity: Model;

    fn database(&self) -> &Database;

    /// Typed query against the entity table
    fn query(&self) -> QueryBuilder<Self::Entity> {
        Self::Entity::query()
    }

    async fn find(&self, id: impl Into<DatabaseValue>) -> ModelResult<Option<Self::Entity>> {
        Self::Entity::find(self.database(), id).await
    }

    async fn find_or_fail(&self, id: impl Into<DatabaseValue>) -> ModelResult<Self::Entity> {
        Self::Entity::find_or_fail(self.database(), id).await
    }

    /// First entity whose `column` equals `value`
    async fn find_by(&self, column: &str, value: impl Into<DatabaseValue>) -> ModelResult<Option<Self::Entity>> {
        self.query().where_eq(column, value).first(self.database()).await
    }

    /// Every entity whose `column` equals `value`, in primary key order
    async fn find_all_by(&self, column: &str, value: impl Into<DatabaseValue>) -> ModelResult<Vec<Self::Entity>> {
        self.query()
            .where_eq(column, value)
            .order_by_asc(Self::Entity::primary_key_name())
            .get(self.database())
            .await
    }

    async fn all(&self) -> ModelResult<Vec<Self::Entity>> {
        Self::Entity::all(self.database()).await
    }

    async fn count(&self) -> ModelResult<u64> {
        self.query().count(self.database()).await
    }

    /// Page of entities matching `filters`; the total is counted with the
    /// same filters
    async fn paginate(&self, page: u64, per_page: u64, filters: &[Predicate]) -> ModelResult<Page<Self::Entity>> {
        debug!(
            "Paginating {} (page {}, per_page {}, {} filter(s))",
            Self::Entity::table_name(),
            page,
            per_page,
            filters.len()
        );
        self.query()
            .filters(filters.iter().cloned())
            .order_by_asc(Self::Entity::primary_key_name())
            .paginate(self.database(), page, per_page)
            .await
    }

    async fn create<I, K, V>(&self, attributes: I) -> ModelResult<Self::Entity>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<DatabaseValue>,
    {
        Self::Entity::create(self.database(), attributes).await
    }

    /// Mass-assign `attributes` onto the entity with primary key `id` and save it
    async fn update<I, K, V>(&self, id: impl Into<DatabaseValue>, attributes: I) -> ModelResult<Self::Entity>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<DatabaseValue>,
    {
        let mut entity = self.find_or_fail(id).await?;
        entity.update_attributes(self.database(), attributes).await?;
        Ok(entity)
    }

    /// Delete by primary key; `false` when no such row exists
    async fn delete(&self, id: impl Into<DatabaseValue>) -> ModelResult<bool> {
        match self.find(id).await? {
            Some(mut entity) => {
                entity.delete(self.database()).await?;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

/// Reject non-positive limits before they reach SQL
pub(crate) fn positive(name: &str, value: u64) -> ModelResult<u64> {
    if value == 0 {
        Err(ModelError::Validation(format!("{} must be greater than zero", name)))
    } else {
        Ok(value)
    }
}
