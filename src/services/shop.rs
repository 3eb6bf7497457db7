use crate::{
    auth::{permissions::consts, Actor},
    cache::{ViewCache, ViewInvalidator, ViewPath},
    commands::{
        shop::{AdjustStockCommand, CreateCategoryCommand, CreateShopItemCommand},
        Command,
    },
    db::DbPool,
    entities::{category, shop_item},
    errors::ServiceError,
    events::EventSender,
};
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QueryOrder};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::instrument;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

/// Body of a shop item creation
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct NewShopItem {
    #[validate(length(min = 1, max = 200, message = "Name must be between 1 and 200 characters"))]
    pub name: String,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
    #[validate(url(message = "Image must be an absolute URL on the image host"))]
    pub image_url: Option<String>,
    pub category_id: Option<Uuid>,
    #[serde(default)]
    #[validate(range(min = 0, message = "Initial stock cannot be negative"))]
    pub stock: i32,
}

/// What the shop page renders
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ShopCatalog {
    pub categories: Vec<category::Model>,
    pub items: Vec<shop_item::Model>,
}

#[derive(Clone)]
pub struct ShopService {
    db_pool: Arc<DbPool>,
    event_sender: Arc<EventSender>,
    views: ViewCache,
}

impl ShopService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Arc<EventSender>, views: ViewCache) -> Self {
        Self {
            db_pool,
            event_sender,
            views,
        }
    }

    fn listing(actor: &Actor) -> ViewPath {
        ViewPath::ShopListing {
            organization_id: actor.organization_id,
        }
    }

    #[instrument(skip(self, actor), fields(user_id = %actor.user_id))]
    pub async fn create_category(
        &self,
        actor: &Actor,
        name: String,
    ) -> Result<category::Model, ServiceError> {
        actor.require(consts::SHOP_MANAGE)?;
        let created = CreateCategoryCommand {
            organization_id: actor.organization_id,
            name,
        }
        .execute(self.db_pool.clone(), self.event_sender.clone())
        .await?;
        self.views.invalidate(&[Self::listing(actor)]).await;
        Ok(created)
    }

    #[instrument(skip(self, actor, item), fields(user_id = %actor.user_id, name = %item.name))]
    pub async fn create_item(
        &self,
        actor: &Actor,
        item: NewShopItem,
    ) -> Result<shop_item::Model, ServiceError> {
        actor.require(consts::SHOP_MANAGE)?;
        let created = CreateShopItemCommand {
            organization_id: actor.organization_id,
            name: item.name,
            description: item.description,
            image_url: item.image_url,
            category_id: item.category_id,
            stock: item.stock,
        }
        .execute(self.db_pool.clone(), self.event_sender.clone())
        .await?;
        self.views.invalidate(&[Self::listing(actor)]).await;
        Ok(created)
    }

    /// Restocks (positive `delta`) or writes down (negative `delta`) a shop item.
    #[instrument(skip(self, actor), fields(user_id = %actor.user_id))]
    pub async fn adjust_stock(
        &self,
        actor: &Actor,
        shop_item_id: Uuid,
        delta: i32,
    ) -> Result<shop_item::Model, ServiceError> {
        actor.require(consts::SHOP_MANAGE)?;
        let updated = AdjustStockCommand {
            organization_id: actor.organization_id,
            shop_item_id,
            delta,
        }
        .execute(self.db_pool.clone(), self.event_sender.clone())
        .await?;
        self.views.invalidate(&[Self::listing(actor)]).await;
        Ok(updated)
    }

    /// Categories and items of the actor's organization, sorted by name.
    #[instrument(skip(self, actor), fields(user_id = %actor.user_id))]
    pub async fn catalog(&self, actor: &Actor) -> Result<ShopCatalog, ServiceError> {
        let organization_id = actor.organization_id;
        let db = self.db_pool.clone();
        self.views
            .read_through(Self::listing(actor), || async move {
                let categories = category::Entity::find()
                    .filter(category::Column::OrganizationId.eq(organization_id))
                    .order_by_asc(category::Column::Name)
                    .all(db.as_ref())
                    .await
                    .map_err(ServiceError::DatabaseError)?;
                let items = shop_item::Entity::find()
                    .filter(shop_item::Column::OrganizationId.eq(organization_id))
                    .order_by_asc(shop_item::Column::Name)
                    .all(db.as_ref())
                    .await
                    .map_err(ServiceError::DatabaseError)?;
                Ok::<_, ServiceError>(ShopCatalog { categories, items })
            })
            .await
    }
}
