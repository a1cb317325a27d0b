use crate::database::Database;
use crate::error::ModelResult;
use crate::models::Plan;
use crate::repository::Repository;

pub struct PlanRepository<'a> {
    db: &'a Database,
}

impl<'a> PlanRepository<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Plans offered for sale, in display order
    pub async fn find_active(&self) -> ModelResult<Vec<Plan>> {
        self.query()
            .where_eq("is_active", 1)
            .order_by_asc("sort_order")
            .get(self.db)
            .await
    }

    pub async fn find_by_slug(&self, slug: &str) -> ModelResult<Option<Plan>> {
        self.find_by("slug", slug).await
    }
}

impl Repository for PlanRepository<'_> {
    type Entity = Plan;

    fn database(&self) -> &Database {
        self.db
    }
}
