use crate::{
    commands::Command,
    db::DbPool,
    entities::shop_item,
    errors::ServiceError,
    events::{Event, EventSender},
    metrics::STOCK_ADJUSTMENTS,
    services::stock_ledger,
};
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, TransactionTrait};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, instrument};
use uuid::Uuid;

/// Manual restock (positive delta) or write-down (negative delta)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdjustStockCommand {
    pub organization_id: Uuid,
    pub shop_item_id: Uuid,
    pub delta: i32,
}

#[async_trait::async_trait]
impl Command for AdjustStockCommand {
    type Result = shop_item::Model;

    #[instrument(skip(self, db_pool, event_sender), fields(shop_item_id = %self.shop_item_id, delta = self.delta))]
    async fn execute(
        &self,
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
    ) -> Result<Self::Result, ServiceError> {
        if self.delta == 0 {
            return Err(ServiceError::InvalidInput(
                "Stock adjustment must be non-zero".to_string(),
            ));
        }

        let txn = db_pool.begin().await.map_err(|e| {
            error!(error = %e, "Failed to start transaction for stock adjustment");
            ServiceError::DatabaseError(e)
        })?;

        shop_item::Entity::find_by_id(self.shop_item_id)
            .filter(shop_item::Column::OrganizationId.eq(self.organization_id))
            .one(&txn)
            .await
            .map_err(ServiceError::DatabaseError)?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Shop item {} not found", self.shop_item_id))
            })?;

        stock_ledger::adjust_stock(&txn, self.shop_item_id, self.delta).await?;

        let item = shop_item::Entity::find_by_id(self.shop_item_id)
            .one(&txn)
            .await
            .map_err(ServiceError::DatabaseError)?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Shop item {} not found", self.shop_item_id))
            })?;

        txn.commit().await.map_err(|e| {
            error!(error = %e, "Failed to commit stock adjustment");
            ServiceError::DatabaseError(e)
        })?;

        info!(shop_item_id = %item.id, stock = item.stock, "Stock adjusted manually");
        STOCK_ADJUSTMENTS.inc();
        event_sender
            .send_or_log(Event::StockAdjusted {
                shop_item_id: item.id,
                delta: self.delta,
            })
            .await;

        Ok(item)
    }
}
