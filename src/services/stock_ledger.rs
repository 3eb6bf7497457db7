//! Stock Ledger: the only code that changes `shop_items.stock`.
//!
//! Decrements are a single conditional `UPDATE ... WHERE stock >= n`, so concurrent
//! accepts against the same item can never drive stock below zero.

use crate::{entities::shop_item, errors::ServiceError};
use chrono::Utc;
use sea_orm::{sea_query::Expr, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter};
use tracing::{debug, error, warn};
use uuid::Uuid;

async fn find_item<C: ConnectionTrait>(
    conn: &C,
    shop_item_id: Uuid,
) -> Result<shop_item::Model, ServiceError> {
    shop_item::Entity::find_by_id(shop_item_id)
        .one(conn)
        .await
        .map_err(|e| {
            error!(error = %e, %shop_item_id, "Failed to load shop item");
            ServiceError::DatabaseError(e)
        })?
        .ok_or_else(|| ServiceError::NotFound(format!("Shop item {} not found", shop_item_id)))
}

fn stock_overflow(item: &shop_item::Model, delta: i32) -> ServiceError {
    warn!(shop_item_id = %item.id, stock = item.stock, delta, "Stock adjustment would overflow");
    ServiceError::InvalidInput(format!(
        "{} cannot hold {} more units on top of {}",
        item.name, delta, item.stock
    ))
}

/// Adds `delta` (possibly negative) to the item's stock and returns the new level.
///
/// A negative delta larger than the current stock is rejected with
/// `InsufficientStock`, and a level past `i32::MAX` with `InvalidInput`.
/// Either way the row is left untouched.
pub async fn adjust_stock<C: ConnectionTrait>(
    conn: &C,
    shop_item_id: Uuid,
    delta: i32,
) -> Result<i32, ServiceError> {
    let item = find_item(conn, shop_item_id).await?;
    if delta == 0 {
        return Ok(item.stock);
    }
    if delta > 0 && item.stock.checked_add(delta).is_none() {
        return Err(stock_overflow(&item, delta));
    }

    let mut update = shop_item::Entity::update_many()
        .col_expr(
            shop_item::Column::Stock,
            Expr::col(shop_item::Column::Stock).add(delta),
        )
        .col_expr(shop_item::Column::UpdatedAt, Expr::value(Utc::now()))
        .filter(shop_item::Column::Id.eq(shop_item_id));

    // i64 so that i32::MIN negates cleanly
    let requested = -i64::from(delta);
    if delta < 0 {
        update = update.filter(shop_item::Column::Stock.gte(requested));
    } else {
        update = update.filter(shop_item::Column::Stock.lte(i32::MAX - delta));
    }

    let result = update.exec(conn).await.map_err(|e| {
        error!(error = %e, %shop_item_id, delta, "Failed to adjust stock");
        ServiceError::DatabaseError(e)
    })?;

    if result.rows_affected == 0 && delta > 0 {
        let current = find_item(conn, shop_item_id).await?;
        return Err(stock_overflow(&current, delta));
    }
    if result.rows_affected == 0 {
        let available = find_item(conn, shop_item_id).await?.stock;
        warn!(%shop_item_id, available, requested, "Stock adjustment rejected");
        return Err(ServiceError::InsufficientStock(format!(
            "{} has {} in stock, {} requested",
            item.name, available, requested
        )));
    }

    let stock = find_item(conn, shop_item_id).await?.stock;
    debug!(%shop_item_id, delta, stock, "Stock adjusted");
    Ok(stock)
}

/// Removes `quantity` units from stock, failing if fewer are available.
pub async fn take_stock<C: ConnectionTrait>(
    conn: &C,
    shop_item_id: Uuid,
    quantity: i32,
) -> Result<i32, ServiceError> {
    if quantity <= 0 {
        return Err(ServiceError::InvalidInput(format!(
            "quantity must be positive, got {}",
            quantity
        )));
    }
    adjust_stock(conn, shop_item_id, -quantity).await
}

/// Puts `quantity` units back into stock.
pub async fn return_stock<C: ConnectionTrait>(
    conn: &C,
    shop_item_id: Uuid,
    quantity: i32,
) -> Result<i32, ServiceError> {
    if quantity <= 0 {
        return Err(ServiceError::InvalidInput(format!(
            "quantity must be positive, got {}",
            quantity
        )));
    }
    adjust_stock(conn, shop_item_id, quantity).await
}
