use serde::Serialize;

use crate::database::Database;
use crate::error::ModelResult;
use crate::model::Model;
use crate::models::CreditTransaction;
use crate::query::QueryBuilder;
use crate::repository::{positive, Repository};

/// Sum and count of one transaction type
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TypeTotal {
    #[serde(rename = "type")]
    pub kind: String,
    pub total: i64,
    pub count: u64,
}

pub struct CreditTransactionRepository<'a> {
    db: &'a Database,
}

impl<'a> CreditTransactionRepository<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    pub async fn find_all_by_user(&self, user_id: i64) -> ModelResult<Vec<CreditTransaction>> {
        self.find_all_by("user_id", user_id).await
    }

    /// Signed sum of every transaction for the user; zero when there are none
    pub async fn balance_for_user(&self, user_id: i64) -> ModelResult<i64> {
        let row = QueryBuilder::table(CreditTransaction::table_name())
            .select_raw("CAST(COALESCE(SUM(amount), 0) AS BIGINT) AS balance")
            .where_eq("user_id", user_id)
            .first_row(self.db)
            .await?;
        Ok(row
            .and_then(|row| row.get("balance").and_then(|v| v.as_i64()))
            .unwrap_or(0))
    }

    /// Per-type totals for the user, ordered by type
    pub async fn totals_by_type(&self, user_id: i64) -> ModelResult<Vec<TypeTotal>> {
        let rows = QueryBuilder::table(CreditTransaction::table_name())
            .select("type")
            .select_raw("CAST(SUM(amount) AS BIGINT) AS total")
            .select_raw("COUNT(*) AS count")
            .where_eq("user_id", user_id)
            .group_by("type")
            .order_by_asc("type")
            .get_rows(self.db)
            .await?;

        Ok(rows
            .into_iter()
            .map(|row| TypeTotal {
                kind: row.get("type").and_then(|v| v.as_str()).unwrap_or_default().to_string(),
                total: row.get("total").and_then(|v| v.as_i64()).unwrap_or(0),
                count: row
                    .get("count")
                    .and_then(|v| v.as_i64())
                    .and_then(|c| u64::try_from(c).ok())
                    .unwrap_or(0),
            })
            .collect())
    }

    /// Newest transactions first
    pub async fn recent_for_user(&self, user_id: i64, limit: u64) -> ModelResult<Vec<CreditTransaction>> {
        self.query()
            .where_eq("user_id", user_id)
            .order_by_desc("created_at")
            .order_by_desc("id")
            .limit(positive("limit", limit)?)
            .get(self.db)
            .await
    }
}

impl Repository for CreditTransactionRepository<'_> {
    type Entity = CreditTransaction;

    fn database(&self) -> &Database {
        self.db
    }
}
