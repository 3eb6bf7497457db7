//! Ownership Ledger: inventory-of-record rows saying who currently holds what.

use crate::{
    entities::inventory::{self, DEFAULT_HOLDING_STATUS},
    errors::ServiceError,
};
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, ModelTrait, QueryFilter,
    QueryOrder, Set,
};
use tracing::{debug, error};
use uuid::Uuid;

/// Records that `owner_id` holds one `shop_item_id`, linked to the line item that granted it.
pub async fn grant<C: ConnectionTrait>(
    conn: &C,
    owner_id: Uuid,
    shop_item_id: Uuid,
    granted_at: DateTime<Utc>,
    item_in_request_id: Option<Uuid>,
) -> Result<inventory::Model, ServiceError> {
    let record = inventory::ActiveModel {
        id: Set(Uuid::new_v4()),
        owner_id: Set(owner_id),
        shop_item_id: Set(shop_item_id),
        item_in_request_id: Set(item_in_request_id),
        purchased_at: Set(granted_at),
        updated_at: Set(None),
        status: Set(DEFAULT_HOLDING_STATUS.to_string()),
    }
    .insert(conn)
    .await
    .map_err(|e| {
        error!(error = %e, %owner_id, %shop_item_id, "Failed to record ownership");
        ServiceError::DatabaseError(e)
    })?;

    debug!(inventory_id = %record.id, %owner_id, %shop_item_id, "Ownership granted");
    Ok(record)
}

/// Removes one ownership record and returns its id, or `None` if nothing matched.
///
/// The row linked to `item_in_request_id` is preferred. Without a linked row the oldest
/// unlinked owner+item row is removed, so a grant made by another line item is never taken.
pub async fn revoke<C: ConnectionTrait>(
    conn: &C,
    owner_id: Uuid,
    shop_item_id: Uuid,
    item_in_request_id: Option<Uuid>,
) -> Result<Option<Uuid>, ServiceError> {
    let base = inventory::Entity::find()
        .filter(inventory::Column::OwnerId.eq(owner_id))
        .filter(inventory::Column::ShopItemId.eq(shop_item_id))
        .order_by_asc(inventory::Column::PurchasedAt);

    let linked = match item_in_request_id {
        Some(line_id) => base
            .clone()
            .filter(inventory::Column::ItemInRequestId.eq(line_id))
            .one(conn)
            .await
            .map_err(ServiceError::DatabaseError)?,
        None => None,
    };

    let target = match linked {
        Some(record) => Some(record),
        None => {
            let fallback = if item_in_request_id.is_some() {
                base.filter(inventory::Column::ItemInRequestId.is_null())
            } else {
                base
            };
            fallback
                .one(conn)
                .await
                .map_err(ServiceError::DatabaseError)?
        }
    };

    let Some(record) = target else {
        debug!(%owner_id, %shop_item_id, "No ownership record to revoke");
        return Ok(None);
    };

    let id = record.id;
    record.delete(conn).await.map_err(|e| {
        error!(error = %e, inventory_id = %id, "Failed to revoke ownership");
        ServiceError::DatabaseError(e)
    })?;

    debug!(inventory_id = %id, %owner_id, %shop_item_id, "Ownership revoked");
    Ok(Some(id))
}

/// Everything `owner_id` currently holds, oldest grant first.
pub async fn holdings<C: ConnectionTrait>(
    conn: &C,
    owner_id: Uuid,
) -> Result<Vec<inventory::Model>, ServiceError> {
    inventory::Entity::find()
        .filter(inventory::Column::OwnerId.eq(owner_id))
        .order_by_asc(inventory::Column::PurchasedAt)
        .all(conn)
        .await
        .map_err(ServiceError::DatabaseError)
}
