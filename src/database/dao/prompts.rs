use crate::database::entities::{prompts, PromptRecord};
use crate::database::{DatabaseError, DatabaseResult};
use chrono::Utc;
use sea_orm::{ActiveModelTrait, ActiveValue, DatabaseConnection, EntityTrait, Set};
use uuid::Uuid;

/// Lifecycle status of the most recent run attempt for a prompt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Running,
    Completed,
    Failed,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Running => "running",
            RunStatus::Completed => "completed",
            RunStatus::Failed => "failed",
        }
    }
}

/// Prompts DAO for database operations
pub struct PromptsDao {
    db: DatabaseConnection,
}

impl PromptsDao {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn find_by_id(&self, id: Uuid) -> DatabaseResult<Option<PromptRecord>> {
        prompts::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(|e| DatabaseError::Database(e.to_string()))
    }

    /// Stamp the prompt with the current time and the given attempt status
    pub async fn mark_last_run(&self, id: Uuid, status: RunStatus) -> DatabaseResult<()> {
        tracing::debug!(prompt_id = %id, status = status.as_str(), "updating prompt last run");

        let update = prompts::ActiveModel {
            id: ActiveValue::Unchanged(id),
            brand_id: ActiveValue::NotSet,
            text: ActiveValue::NotSet,
            last_run: Set(Some(Utc::now())),
            last_run_status: Set(Some(status.as_str().to_string())),
        };

        update
            .update(&self.db)
            .await
            .map_err(|e| DatabaseError::Database(e.to_string()))?;

        Ok(())
    }
}
