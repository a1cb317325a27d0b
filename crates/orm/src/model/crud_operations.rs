//! CRUD Operations - Create, Read, Update, Delete operations for models
//!
//! Implements mass assignment, cast-aware attribute reads and single-row
//! persistence: `save()` inserts a new record and updates a persisted one,
//! `delete()` detaches the instance.

use chrono::{DateTime, Utc};
use serde_json::Value as JsonValue;
use tracing::{debug, warn};

use crate::backends::{Attributes, DatabaseValue};
use crate::database::Database;
use crate::error::{ModelError, ModelResult};
use crate::model::core_trait::Model;
use crate::model::record::{Record, RecordState};
use crate::query::QueryBuilder;

/// Trait providing CRUD operations for models
pub trait CrudOperations: Model {
    /// Empty, unsaved instance
    fn new() -> Self {
        Self::from_record(Record::new())
    }

    /// Unsaved instance filled through the fillable whitelist
    fn make<I, K, V>(attributes: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<DatabaseValue>,
    {
        let mut model = Self::new();
        model.fill(attributes);
        model
    }

    /// Mass-assign attributes. Keys outside `fillable()` (other than the
    /// primary key) are dropped and returned.
    fn fill<I, K, V>(&mut self, attributes: I) -> Vec<String>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<DatabaseValue>,
    {
        let dropped = self
            .record_mut()
            .fill(attributes, Self::fillable(), Self::primary_key_name());
        if !dropped.is_empty() {
            warn!(
                "Mass assignment on {} ignored non-fillable attributes: {}",
                Self::table_name(),
                dropped.join(", ")
            );
        }
        dropped
    }

    /// Set one attribute without the fillable check
    fn set_attribute(&mut self, key: &str, value: impl Into<DatabaseValue>) {
        self.record_mut().set(key, value);
    }

    /// Stored value with its cast applied, else the computed accessor
    fn get_attribute(&self, key: &str) -> Option<DatabaseValue> {
        match self.record().get(key) {
            Some(value) => Some(match Self::cast_for(key) {
                Some(cast) => cast.apply(value),
                None => value.clone(),
            }),
            None => self.accessor(key),
        }
    }

    fn get_i64(&self, key: &str) -> Option<i64> {
        self.get_attribute(key).and_then(|v| v.as_i64())
    }

    fn get_f64(&self, key: &str) -> Option<f64> {
        self.get_attribute(key).and_then(|v| v.as_f64())
    }

    fn get_string(&self, key: &str) -> Option<String> {
        match self.get_attribute(key)? {
            DatabaseValue::String(s) => Some(s),
            DatabaseValue::Null => None,
            other => match other.to_json() {
                JsonValue::String(s) => Some(s),
                json => Some(json.to_string()),
            },
        }
    }

    fn get_bool(&self, key: &str) -> Option<bool> {
        match crate::model::CastType::Boolean.apply(&self.get_attribute(key)?) {
            DatabaseValue::Bool(b) => Some(b),
            _ => None,
        }
    }

    fn get_datetime(&self, key: &str) -> Option<DateTime<Utc>> {
        match crate::model::CastType::DateTime.apply(&self.get_attribute(key)?) {
            DatabaseValue::DateTime(dt) => Some(dt),
            _ => None,
        }
    }

    fn get_json(&self, key: &str) -> Option<JsonValue> {
        match crate::model::CastType::Json.apply(&self.get_attribute(key)?) {
            DatabaseValue::Json(json) => Some(json),
            _ => None,
        }
    }

    /// Integer primary key, if set
    fn primary_key(&self) -> Option<i64> {
        self.record()
            .get(Self::primary_key_name())
            .and_then(DatabaseValue::as_i64)
    }

    /// True once inserted or loaded, false again after `delete()`
    fn exists(&self) -> bool {
        self.record().exists()
    }

    /// Insert when new, update when persisted
    async fn save(&mut self, db: &Database) -> ModelResult<()> {
        match self.record().state() {
            RecordState::Detached => Err(ModelError::Detached(Self::table_name().to_string())),
            RecordState::New => perform_insert(self, db).await,
            RecordState::Persisted => perform_update(self, db).await,
        }
    }

    /// Delete the backing row; the instance becomes detached. Only a
    /// persisted instance can be deleted, even when a key was filled in.
    async fn delete(&mut self, db: &Database) -> ModelResult<()> {
        match self.record().state() {
            RecordState::Persisted => {}
            RecordState::Detached => return Err(ModelError::Detached(Self::table_name().to_string())),
            RecordState::New => return Err(ModelError::NotPersisted(Self::table_name().to_string())),
        }

        let key = primary_key_value(self)?;
        let deleted = db
            .delete(
                Self::table_name(),
                &format!("{} = ?", Self::primary_key_name()),
                &[key],
            )
            .await?;

        debug!("Deleted {} row(s) from {}", deleted, Self::table_name());
        self.record_mut().mark_detached();
        Ok(())
    }

    /// Reload attributes from the database
    async fn refresh(&mut self, db: &Database) -> ModelResult<()> {
        if self.record().is_detached() {
            return Err(ModelError::Detached(Self::table_name().to_string()));
        }

        let key = primary_key_value(self)?;
        let row = QueryBuilder::<Self>::new(Self::table_name())
            .where_eq(Self::primary_key_name(), key.clone())
            .first_row(db)
            .await?
            .ok_or_else(|| ModelError::NotFound(format!("{}({})", Self::table_name(), key.to_json())))?;

        let record = self.record_mut();
        record.replace_attributes(row.into_map());
        record.mark_persisted();
        Ok(())
    }

    /// Fill then save; returns the dropped keys
    async fn update_attributes<I, K, V>(&mut self, db: &Database, attributes: I) -> ModelResult<Vec<String>>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<DatabaseValue>,
    {
        let dropped = self.fill(attributes);
        self.save(db).await?;
        Ok(dropped)
    }

    /// Find a model by its primary key
    async fn find(db: &Database, id: impl Into<DatabaseValue>) -> ModelResult<Option<Self>> {
        Self::query()
            .where_eq(Self::primary_key_name(), id)
            .first(db)
            .await
    }

    /// Find a model by its primary key or return an error if not found
    async fn find_or_fail(db: &Database, id: impl Into<DatabaseValue>) -> ModelResult<Self> {
        let id = id.into();
        Self::find(db, id.clone())
            .await?
            .ok_or_else(|| ModelError::NotFound(format!("{}({})", Self::table_name(), id.to_json())))
    }

    /// Find every model whose primary key is in `ids`
    async fn find_many<I, V>(db: &Database, ids: I) -> ModelResult<Vec<Self>>
    where
        I: IntoIterator<Item = V>,
        V: Into<DatabaseValue>,
    {
        let ids: Vec<DatabaseValue> = ids.into_iter().map(Into::into).collect();
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        Self::query().where_in(Self::primary_key_name(), ids).get(db).await
    }

    /// Every row of the table
    async fn all(db: &Database) -> ModelResult<Vec<Self>> {
        Self::query().get(db).await
    }

    /// Fill a new instance and insert it
    async fn create<I, K, V>(db: &Database, attributes: I) -> ModelResult<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<DatabaseValue>,
    {
        let mut model = Self::make(attributes);
        model.save(db).await?;
        Ok(model)
    }

    /// Typed query against this model's table
    fn query() -> QueryBuilder<Self> {
        QueryBuilder::new(Self::table_name())
    }

    /// Attributes as a JSON object, casts applied
    fn to_json(&self) -> JsonValue {
        let map = self
            .record()
            .attributes()
            .keys()
            .map(|key| {
                let value = self.get_attribute(key).unwrap_or(DatabaseValue::Null);
                (key.clone(), value.to_json())
            })
            .collect();
        JsonValue::Object(map)
    }
}

// Implement CrudOperations for all types that implement Model
impl<T: Model> CrudOperations for T {}

fn primary_key_value<M: Model>(model: &M) -> ModelResult<DatabaseValue> {
    match model.record().get(M::primary_key_name()) {
        Some(value) if !value.is_null() => Ok(value.clone()),
        _ => Err(ModelError::MissingPrimaryKey),
    }
}

async fn perform_insert<M: Model>(model: &mut M, db: &Database) -> ModelResult<()> {
    let pk = M::primary_key_name();
    let mut data: Attributes = model.record().attributes().clone();

    let explicit_key = matches!(data.get(pk), Some(value) if !value.is_null());
    if !explicit_key {
        data.remove(pk);
    }

    if M::uses_timestamps() {
        let now = DatabaseValue::DateTime(Utc::now());
        for column in ["created_at", "updated_at"] {
            data.insert(column.to_string(), now.clone());
            model.record_mut().set(column, now.clone());
        }
    }

    let generated = db.insert_with_key(M::table_name(), &data, pk).await?;

    let record = model.record_mut();
    if !explicit_key {
        if let Some(id) = generated {
            record.set(pk, id);
        }
    }
    record.mark_persisted();

    debug!("Inserted into {} (key: {:?})", M::table_name(), generated);
    Ok(())
}

async fn perform_update<M: Model>(model: &mut M, db: &Database) -> ModelResult<()> {
    let key = primary_key_value(model)?;
    let data = update_payload(model);
    if data.is_empty() {
        return Ok(());
    }

    let updated = db
        .update(M::table_name(), &data, &format!("{} = ?", M::primary_key_name()), &[key])
        .await?;
    if updated == 0 {
        warn!("Update on {} matched no rows", M::table_name());
    }
    Ok(())
}

/// Stamp `updated_at` and return the SET columns of the UPDATE: every
/// attribute except the primary key
fn update_payload<M: Model>(model: &mut M) -> Attributes {
    if M::uses_timestamps() {
        model
            .record_mut()
            .set("updated_at", DatabaseValue::DateTime(Utc::now()));
    }

    let mut data: Attributes = model.record().attributes().clone();
    data.remove(M::primary_key_name());
    data
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::CastType;

    #[derive(Debug)]
    struct Widget {
        record: Record,
    }

    impl Model for Widget {
        fn table_name() -> &'static str {
            "widgets"
        }

        fn fillable() -> &'static [&'static str] {
            &["name", "enabled", "options"]
        }

        fn casts() -> &'static [(&'static str, CastType)] {
            &[("enabled", CastType::Boolean), ("options", CastType::Json)]
        }

        fn accessor(&self, key: &str) -> Option<DatabaseValue> {
            match key {
                "label" => self.get_string("name").map(|n| DatabaseValue::String(n.to_uppercase())),
                _ => None,
            }
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
    fn test_make_applies_whitelist() {
        let mut widget = Widget::new();
        let dropped = widget.fill([("name", "gear"), ("owner", "mallory")]);
        assert_eq!(dropped, vec!["owner".to_string()]);
        assert!(!widget.exists());
        assert_eq!(widget.get_string("name").as_deref(), Some("gear"));
        assert_eq!(widget.get_attribute("owner"), None);
    }

    #[test]
    fn test_casts_and_accessors_on_read() {
        let mut widget = Widget::make([("name", DatabaseValue::from("gear"))]);
        widget.set_attribute("enabled", 1);
        widget.set_attribute("options", r#"{"size":3}"#);

        assert_eq!(widget.get_attribute("enabled"), Some(DatabaseValue::Bool(true)));
        assert_eq!(widget.get_bool("enabled"), Some(true));
        assert_eq!(widget.get_json("options"), Some(serde_json::json!({"size": 3})));
        assert_eq!(widget.get_string("label").as_deref(), Some("GEAR"));
        assert_eq!(widget.to_json()["enabled"], serde_json::json!(true));
    }

    #[test]
    fn test_update_payload_excludes_primary_key() {
        let mut widget = Widget::make([("id", DatabaseValue::Int64(7)), ("name", "gear".into())]);
        let payload = update_payload(&mut widget);

        assert!(!payload.contains_key("id"));
        assert_eq!(payload.get("name"), Some(&DatabaseValue::from("gear")));
        assert!(matches!(payload.get("updated_at"), Some(DatabaseValue::DateTime(_))));
        assert_eq!(widget.primary_key(), Some(7));
    }

    #[test]
    fn test_model_name_defaults_to_type_name() {
        assert_eq!(Widget::model_name(), "Widget");
        assert_eq!(Widget::primary_key_name(), "id");
    }
}
