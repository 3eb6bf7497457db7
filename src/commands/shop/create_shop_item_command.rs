use crate::{
    commands::Command,
    db::DbPool,
    entities::{category, shop_item},
    errors::ServiceError,
    events::{Event, EventSender},
};
use chrono::Utc;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, instrument};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateShopItemCommand {
    pub organization_id: Uuid,
    #[validate(length(min = 1, max = 200, message = "Name must be between 1 and 200 characters"))]
    pub name: String,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
    #[validate(url(message = "Image must be an absolute URL on the image host"))]
    pub image_url: Option<String>,
    pub category_id: Option<Uuid>,
    #[validate(range(min = 0, message = "Initial stock cannot be negative"))]
    pub stock: i32,
}

impl CreateShopItemCommand {
    async fn ensure_category(&self, db: &DbPool) -> Result<(), ServiceError> {
        let Some(category_id) = self.category_id else {
            return Ok(());
        };

        category::Entity::find_by_id(category_id)
            .filter(category::Column::OrganizationId.eq(self.organization_id))
            .one(db)
            .await
            .map_err(ServiceError::DatabaseError)?
            .map(|_| ())
            .ok_or_else(|| ServiceError::NotFound(format!("Category {} not found", category_id)))
    }
}

#[async_trait::async_trait]
impl Command for CreateShopItemCommand {
    type Result = shop_item::Model;

    #[instrument(skip(self, db_pool, event_sender), fields(name = %self.name))]
    async fn execute(
        &self,
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
    ) -> Result<Self::Result, ServiceError> {
        self.validate()?;
        let db = db_pool.as_ref();
        self.ensure_category(db).await?;

        let created = shop_item::ActiveModel {
            id: Set(Uuid::new_v4()),
            organization_id: Set(self.organization_id),
            category_id: Set(self.category_id),
            name: Set(self.name.trim().to_string()),
            description: Set(self.description.clone()),
            image_url: Set(self.image_url.clone()),
            stock: Set(self.stock),
            created_at: Set(Utc::now()),
            updated_at: Set(None),
        }
        .insert(db)
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to create shop item");
            ServiceError::DatabaseError(e)
        })?;

        info!(shop_item_id = %created.id, stock = created.stock, "Shop item created");
        event_sender
            .send_or_log(Event::ShopItemCreated(created.id))
            .await;

        Ok(created)
    }
}
