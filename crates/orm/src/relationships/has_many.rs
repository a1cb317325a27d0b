//! HasMany Relationship - child rows hold this row's key

use std::marker::PhantomData;

use tracing::debug;

use crate::database::Database;
use crate::error::{ModelError, ModelResult};
use crate::model::Model;
use crate::query::QueryBuilder;

use super::{key_value, RelationshipMeta};

/// HasMany relationship - parent model has many related models
#[derive(Debug, Clone)]
pub struct HasMany<Related: Model> {
    meta: RelationshipMeta,
    _related: PhantomData<Related>,
}

impl<Related: Model> HasMany<Related> {
    pub fn new(foreign_key: &str, local_key: &str) -> Self {
        Self {
            meta: RelationshipMeta {
                foreign_key: foreign_key.to_string(),
                local_key: local_key.to_string(),
                related_table: Related::table_name().to_string(),
            },
            _related: PhantomData,
        }
    }

    pub fn meta(&self) -> &RelationshipMeta {
        &self.meta
    }

    /// Query for the children; the parent must carry its local key
    pub fn query<Parent: Model>(&self, parent: &Parent) -> ModelResult<QueryBuilder<Related>> {
        let value = key_value(parent, &self.meta.local_key)
            .map_err(|_| ModelError::MissingPrimaryKey)?
            .ok_or(ModelError::MissingPrimaryKey)?;
        Ok(QueryBuilder::new(self.meta.related_table.as_str()).where_eq(&self.meta.foreign_key, value))
    }

    pub async fn resolve<Parent: Model>(&self, parent: &Parent, db: &Database) -> ModelResult<Vec<Related>> {
        let query = self.query(parent)?;
        debug!(
            "Resolving {}.{} <- {}.{}",
            Parent::table_name(),
            self.meta.local_key,
            self.meta.related_table,
            self.meta.foreign_key
        );
        query.get(db).await
    }
}
