use serde::{Serialize, Serializer};

use crate::model::{CastType, CrudOperations, Model, Record};

/// Subscription plan in `plans`
#[derive(Debug, Clone)]
pub struct Plan {
    record: Record,
}

impl Plan {
    pub fn slug(&self) -> Option<String> {
        self.get_string("slug")
    }

    pub fn price(&self) -> f64 {
        self.get_f64("price").unwrap_or(0.0)
    }

    pub fn is_active(&self) -> bool {
        self.get_bool("is_active").unwrap_or(false)
    }
}

impl Model for Plan {
    fn table_name() -> &'static str {
        "plans"
    }

    fn fillable() -> &'static [&'static str] {
        &["name", "slug", "price", "credits", "is_active", "sort_order", "features"]
    }

    fn casts() -> &'static [(&'static str, CastType)] {
        &[
            ("price", CastType::Float),
            ("credits", CastType::Integer),
            ("is_active", CastType::Boolean),
            ("sort_order", CastType::Integer),
            ("features", CastType::Json),
        ]
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

impl Serialize for Plan {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}
