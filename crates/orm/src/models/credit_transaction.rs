use serde::{Serialize, Serializer};

use crate::model::{CastType, CrudOperations, Model, Record};

/// Ledger entry in `credit_transactions`; `amount` is signed
#[derive(Debug, Clone)]
pub struct CreditTransaction {
    record: Record,
}

impl CreditTransaction {
    pub fn user_id(&self) -> Option<i64> {
        self.get_i64("user_id")
    }

    pub fn amount(&self) -> i64 {
        self.get_i64("amount").unwrap_or(0)
    }

    pub fn kind(&self) -> Option<String> {
        self.get_string("type")
    }
}

impl Model for CreditTransaction {
    fn table_name() -> &'static str {
        "credit_transactions"
    }

    fn fillable() -> &'static [&'static str] {
        &["user_id", "amount", "type", "description", "metadata"]
    }

    fn casts() -> &'static [(&'static str, CastType)] {
        &[
            ("user_id", CastType::Integer),
            ("amount", CastType::Integer),
            ("metadata", CastType::Json),
            ("created_at", CastType::DateTime),
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

impl Serialize for CreditTransaction {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}
