//! BelongsTo Relationship - child row holds the parent's key

use std::marker::PhantomData;

use tracing::debug;

use crate::database::Database;
use crate::error::ModelResult;
use crate::model::Model;
use crate::query::QueryBuilder;

use super::{foreign_key_for, key_value, RelationshipMeta};

/// BelongsTo relationship - child model belongs to a parent model
#[derive(Debug, Clone)]
pub struct BelongsTo<Parent: Model> {
    meta: RelationshipMeta,
    _parent: PhantomData<Parent>,
}

impl<Parent: Model> BelongsTo<Parent> {
    pub fn new(foreign_key: &str, owner_key: &str) -> Self {
        Self {
            meta: RelationshipMeta {
                foreign_key: foreign_key.to_string(),
                local_key: owner_key.to_string(),
                related_table: Parent::table_name().to_string(),
            },
            _parent: PhantomData,
        }
    }

    /// `<parent>_id` referencing the parent's primary key
    pub fn conventional() -> Self {
        Self::new(&foreign_key_for::<Parent>(), Parent::primary_key_name())
    }

    pub fn meta(&self) -> &RelationshipMeta {
        &self.meta
    }

    /// Query for the parent, or `None` when the child's foreign key is NULL
    pub fn query<Child: Model>(&self, child: &Child) -> ModelResult<Option<QueryBuilder<Parent>>> {
        let Some(value) = key_value(child, &self.meta.foreign_key)? else {
            return Ok(None);
        };
        Ok(Some(
            QueryBuilder::new(self.meta.related_table.as_str()).where_eq(&self.meta.local_key, value),
        ))
    }

    pub async fn resolve<Child: Model>(&self, child: &Child, db: &Database) -> ModelResult<Option<Parent>> {
        match self.query(child)? {
            Some(query) => {
                debug!(
                    "Resolving {}.{} -> {}.{}",
                    Child::table_name(),
                    self.meta.foreign_key,
                    self.meta.related_table,
                    self.meta.local_key
                );
                query.first(db).await
            }
            None => Ok(None),
        }
    }
}
