use serde::{Serialize, Serializer};

use crate::backends::DatabaseValue;
use crate::model::{CastType, CrudOperations, Model, Record};

/// Role stored for administrators
pub const ADMIN_ROLE: &str = "admin";

/// Account row in `users`
#[derive(Debug, Clone)]
pub struct User {
    record: Record,
}

impl User {
    pub fn name(&self) -> Option<String> {
        self.get_string("name")
    }

    pub fn email(&self) -> Option<String> {
        self.get_string("email")
    }

    pub fn role(&self) -> Option<String> {
        self.get_string("role")
    }

    pub fn is_admin(&self) -> bool {
        self.role().as_deref() == Some(ADMIN_ROLE)
    }
}

impl Model for User {
    fn table_name() -> &'static str {
        "users"
    }

    fn fillable() -> &'static [&'static str] {
        &["name", "email", "role"]
    }

    fn casts() -> &'static [(&'static str, CastType)] {
        &[
            ("email_verified_at", CastType::DateTime),
            ("created_at", CastType::DateTime),
            ("updated_at", CastType::DateTime),
        ]
    }

    fn accessor(&self, key: &str) -> Option<DatabaseValue> {
        match key {
            "display_name" => {
                let name = self.name()?;
                Some(match self.email() {
                    Some(email) => format!("{} <{}>", name, email).into(),
                    None => name.into(),
                })
            }
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

impl Serialize for User {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}
