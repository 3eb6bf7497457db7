use super::request::RequestStatus;
use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// A requested (item, quantity) line within a request
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize, ToSchema)]
#[sea_orm(table_name = "items_in_request")]
#[schema(as = ItemInRequest)]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub request_id: Uuid,
    pub shop_item_id: Uuid,
    /// Copied from the parent request
    pub organization_id: Uuid,
    pub quantity: i32,
    pub status: RequestStatus,
    pub created_at: DateTime<Utc>,
    #[sea_orm(nullable)]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::request::Entity",
        from = "Column::RequestId",
        to = "super::request::Column::Id",
        on_delete = "Cascade"
    )]
    Request,
    #[sea_orm(
        belongs_to = "super::shop_item::Entity",
        from = "Column::ShopItemId",
        to = "super::shop_item::Column::Id"
    )]
    ShopItem,
}

impl Related<super::request::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Request.def()
    }
}

impl Related<super::shop_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ShopItem.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
