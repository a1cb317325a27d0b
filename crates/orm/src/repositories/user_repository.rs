use crate::database::Database;
use crate::error::ModelResult;
use crate::models::user::{User, ADMIN_ROLE};
use crate::repository::Repository;

pub struct UserRepository<'a> {
    db: &'a Database,
}

impl<'a> UserRepository<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    pub async fn find_by_email(&self, email: &str) -> ModelResult<Option<User>> {
        self.find_by("email", email).await
    }

    pub async fn find_all_by_role(&self, role: &str) -> ModelResult<Vec<User>> {
        self.find_all_by("role", role).await
    }

    pub async fn count_admins(&self) -> ModelResult<u64> {
        self.query().where_eq("role", ADMIN_ROLE).count(self.db).await
    }
}

impl Repository for UserRepository<'_> {
    type Entity = User;

    fn database(&self) -> &Database {
        self.db
    }
}
