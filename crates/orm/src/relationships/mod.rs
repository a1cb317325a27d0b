//! Relationships Module - belongs-to and has-many resolution by key convention

pub mod belongs_to;
pub mod has_many;

pub use belongs_to::BelongsTo;
pub use has_many::HasMany;

use crate::backends::DatabaseValue;
use crate::database::Database;
use crate::error::{ModelError, ModelResult};
use crate::model::Model;
use crate::sql::to_snake_case;

/// Relationship metadata
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationshipMeta {
    pub foreign_key: String,
    pub local_key: String,
    pub related_table: String,
}

/// `snake_case(model_name) + "_id"`, e.g. `CreditTransaction` -> `credit_transaction_id`
pub fn foreign_key_for<M: Model>() -> String {
    format!("{}_id", to_snake_case(M::model_name()))
}

/// Relation helpers available on every model
pub trait Relationships: Model {
    /// Parent row referenced by `<related>_id` on this record.
    ///
    /// The foreign key is named after the parent type `R`, not after this
    /// model: `CreditTransaction::belongs_to::<User>` reads `user_id`. Use
    /// [`Relationships::belongs_to_with`] for any other column.
    async fn belongs_to<R: Model>(&self, db: &Database) -> ModelResult<Option<R>> {
        BelongsTo::<R>::conventional().resolve(self, db).await
    }

    /// Parent row referenced by `foreign_key`, matched against `owner_key` on the parent
    async fn belongs_to_with<R: Model>(
        &self,
        db: &Database,
        foreign_key: &str,
        owner_key: &str,
    ) -> ModelResult<Option<R>> {
        BelongsTo::<R>::new(foreign_key, owner_key).resolve(self, db).await
    }

    /// Child rows whose `<this model>_id` equals this record's primary key
    async fn has_many<R: Model>(&self, db: &Database) -> ModelResult<Vec<R>> {
        HasMany::<R>::new(&foreign_key_for::<Self>(), Self::primary_key_name())
            .resolve(self, db)
            .await
    }

    /// Child rows whose `foreign_key` equals this record's primary key
    async fn has_many_with<R: Model>(&self, db: &Database, foreign_key: &str) -> ModelResult<Vec<R>> {
        HasMany::<R>::new(foreign_key, Self::primary_key_name())
            .resolve(self, db)
            .await
    }
}

impl<T: Model> Relationships for T {}

/// Value of `key` on `model`; an absent attribute is an error, NULL is `None`
pub(crate) fn key_value<M: Model>(model: &M, key: &str) -> ModelResult<Option<DatabaseValue>> {
    match model.record().get(key) {
        Some(DatabaseValue::Null) => Ok(None),
        Some(value) => Ok(Some(value.clone())),
        None => Err(ModelError::Relationship(format!(
            "attribute '{}' is not loaded on {}",
            key,
            M::table_name()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Record;

    struct CreditTransaction {
        record: Record,
    }

    impl Model for CreditTransaction {
        fn table_name() -> &'static str {
            "credit_transactions"
        }

        fn from_record(record: Record) -> Self {
            Self { record }
        }

        fn record(&self) -> &Record {
            &self.record
        }

        fn record_mut(&mut self) -> &mut Record {
            &mut self.record
        }
    }

    #[test]
    fn test_conventional_foreign_key() {
        assert_eq!(foreign_key_for::<CreditTransaction>(), "credit_transaction_id");
    }

    #[test]
    fn test_belongs_to_query_uses_owner_key() {
        let mut record = Record::new();
        record.set("credit_transaction_id", 7);
        let child = CreditTransaction::from_record(record);

        let query = BelongsTo::<CreditTransaction>::conventional()
            .query(&child)
            .unwrap()
            .unwrap();
        assert_eq!(query.to_sql(), "SELECT * FROM credit_transactions WHERE id = ?");
        assert_eq!(query.bindings(), vec![DatabaseValue::Int64(7)]);
    }

    #[test]
    fn test_null_foreign_key_resolves_to_none() {
        let mut record = Record::new();
        record.set("parent_id", DatabaseValue::Null);
        let child = CreditTransaction::from_record(record);

        let relation = BelongsTo::<CreditTransaction>::new("parent_id", "id");
        assert!(relation.query(&child).unwrap().is_none());

        let missing = BelongsTo::<CreditTransaction>::new("other_id", "id").query(&child);
        assert!(matches!(missing, Err(ModelError::Relationship(_))));
    }

    #[test]
    fn test_has_many_requires_parent_key() {
        let parent = CreditTransaction::from_record(Record::new());
        let relation = HasMany::<CreditTransaction>::new("credit_transaction_id", "id");
        assert!(relation.query(&parent).is_err());

        let mut record = Record::new();
        record.set("id", 3);
        let parent = CreditTransaction::from_record(record);
        let query = relation.query(&parent).unwrap();
        assert_eq!(
            query.to_sql(),
            "SELECT * FROM credit_transactions WHERE credit_transaction_id = ?"
        );
    }
}
