use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Free-text condition recorded on a fresh grant
pub const DEFAULT_HOLDING_STATUS: &str = "OK";

/// Ownership record: `owner_id` currently holds one `shop_item_id`
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize, ToSchema)]
#[sea_orm(table_name = "inventory")]
#[schema(as = InventoryRecord)]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub owner_id: Uuid,
    pub shop_item_id: Uuid,
    /// Line item whose acceptance created this record
    #[sea_orm(nullable)]
    pub item_in_request_id: Option<Uuid>,
    pub purchased_at: DateTime<Utc>,
    #[sea_orm(nullable)]
    pub updated_at: Option<DateTime<Utc>>,
    pub status: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::shop_item::Entity",
        from = "Column::ShopItemId",
        to = "super::shop_item::Column::Id"
    )]
    ShopItem,
    #[sea_orm(
        belongs_to = "super::item_in_request::Entity",
        from = "Column::ItemInRequestId",
        to = "super::item_in_request::Column::Id",
        on_delete = "SetNull"
    )]
    ItemInRequest,
}

impl Related<super::shop_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ShopItem.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
