use crate::{
    commands::Command,
    db::DbPool,
    entities::category,
    errors::ServiceError,
    events::{Event, EventSender},
};
use chrono::Utc;
use sea_orm::{ActiveModelTrait, Set};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, instrument};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateCategoryCommand {
    pub organization_id: Uuid,
    #[validate(length(min = 1, max = 100, message = "Name must be between 1 and 100 characters"))]
    pub name: String,
}

#[async_trait::async_trait]
impl Command for CreateCategoryCommand {
    type Result = category::Model;

    #[instrument(skip(self, db_pool, event_sender))]
    async fn execute(
        &self,
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
    ) -> Result<Self::Result, ServiceError> {
        self.validate()?;

        let created = category::ActiveModel {
            id: Set(Uuid::new_v4()),
            organization_id: Set(self.organization_id),
            name: Set(self.name.trim().to_string()),
            created_at: Set(Utc::now()),
        }
        .insert(db_pool.as_ref())
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to create category");
            ServiceError::DatabaseError(e)
        })?;

        info!(category_id = %created.id, "Category created");
        event_sender
            .send_or_log(Event::CategoryCreated(created.id))
            .await;

        Ok(created)
    }
}
