use crate::database::entities::{users, UserRecord};
use crate::database::{DatabaseError, DatabaseResult};
use sea_orm::{DatabaseConnection, EntityTrait};

/// Users DAO. Read-only here; user rows are owned by the account service.
pub struct UsersDao {
    db: DatabaseConnection,
}

impl UsersDao {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn find_by_id(&self, id: &str) -> DatabaseResult<Option<UserRecord>> {
        users::Entity::find_by_id(id.to_string())
            .one(&self.db)
            .await
            .map_err(|e| DatabaseError::Database(e.to_string()))
    }
}
