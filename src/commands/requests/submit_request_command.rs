use crate::{
    commands::Command,
    db::DbPool,
    entities::{item_in_request, request, shop_item, RequestStatus},
    errors::ServiceError,
    events::{Event, EventSender},
    metrics::REQUESTS_SUBMITTED,
};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{error, info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidationError};

/// One cart entry: a shop item and how many of it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct CartLine {
    pub shop_item_id: Uuid,
    pub quantity: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SubmitRequestCommand {
    pub requester_id: Uuid,
    pub organization_id: Uuid,
    #[validate(custom = "validate_cart")]
    pub items: Vec<CartLine>,
}

/// A request together with its line items
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct RequestDetail {
    pub request: request::Model,
    pub items: Vec<item_in_request::Model>,
}

pub(crate) fn validate_cart(items: &[CartLine]) -> Result<(), ValidationError> {
    if items.is_empty() {
        let mut err = ValidationError::new("items");
        err.message = Some("Cart must contain at least one item".into());
        return Err(err);
    }
    if items.iter().any(|line| line.quantity <= 0) {
        let mut err = ValidationError::new("quantity");
        err.message = Some("Every quantity must be greater than zero".into());
        return Err(err);
    }
    Ok(())
}

impl SubmitRequestCommand {
    /// Cart entries with repeated shop items folded into one line, first occurrence order kept.
    /// Fails with `InvalidInput` when a folded quantity does not fit in an `i32`.
    fn distinct_lines(&self) -> Result<Vec<CartLine>, ServiceError> {
        let mut lines: Vec<CartLine> = Vec::with_capacity(self.items.len());
        for line in &self.items {
            match lines.iter_mut().find(|l| l.shop_item_id == line.shop_item_id) {
                Some(existing) => {
                    existing.quantity = existing
                        .quantity
                        .checked_add(line.quantity)
                        .ok_or_else(|| {
                            ServiceError::InvalidInput(format!(
                                "total quantity for shop item {} is too large",
                                line.shop_item_id
                            ))
                        })?;
                }
                None => lines.push(*line),
            }
        }
        Ok(lines)
    }

    async fn ensure_items_exist(
        &self,
        db: &impl sea_orm::ConnectionTrait,
        lines: &[CartLine],
    ) -> Result<(), ServiceError> {
        let ids: Vec<Uuid> = lines.iter().map(|l| l.shop_item_id).collect();
        let found: HashSet<Uuid> = shop_item::Entity::find()
            .filter(shop_item::Column::Id.is_in(ids.clone()))
            .filter(shop_item::Column::OrganizationId.eq(self.organization_id))
            .all(db)
            .await
            .map_err(ServiceError::DatabaseError)?
            .into_iter()
            .map(|item| item.id)
            .collect();

        match ids.into_iter().find(|id| !found.contains(id)) {
            Some(missing) => Err(ServiceError::NotFound(format!(
                "Shop item {} not found",
                missing
            ))),
            None => Ok(()),
        }
    }

    async fn create_request(&self, db: &DbPool) -> Result<RequestDetail, ServiceError> {
        let lines = self.distinct_lines()?;
        self.ensure_items_exist(db, &lines).await?;

        let now = Utc::now();
        let request_id = Uuid::new_v4();

        let txn = db.begin().await.map_err(|e| {
            error!(error = %e, "Failed to start transaction for request submission");
            ServiceError::DatabaseError(e)
        })?;

        let request = request::ActiveModel {
            id: Set(request_id),
            organization_id: Set(self.organization_id),
            requester_id: Set(self.requester_id),
            status: Set(RequestStatus::Processing),
            created_at: Set(now),
            updated_at: Set(None),
        }
        .insert(&txn)
        .await
        .map_err(|e| {
            error!(error = %e, %request_id, "Failed to create request");
            ServiceError::DatabaseError(e)
        })?;

        let mut items = Vec::with_capacity(lines.len());
        for line in lines {
            let item = item_in_request::ActiveModel {
                id: Set(Uuid::new_v4()),
                request_id: Set(request_id),
                shop_item_id: Set(line.shop_item_id),
                organization_id: Set(request.organization_id),
                quantity: Set(line.quantity),
                status: Set(RequestStatus::Processing),
                created_at: Set(now),
                updated_at: Set(None),
            }
            .insert(&txn)
            .await
            .map_err(|e| {
                error!(error = %e, %request_id, "Failed to create line item");
                ServiceError::DatabaseError(e)
            })?;
            items.push(item);
        }

        txn.commit().await.map_err(|e| {
            error!(error = %e, %request_id, "Failed to commit request submission");
            ServiceError::DatabaseError(e)
        })?;

        Ok(RequestDetail { request, items })
    }

    async fn log_and_trigger_event(&self, event_sender: &EventSender, detail: &RequestDetail) {
        info!(
            request_id = %detail.request.id,
            requester_id = %self.requester_id,
            line_items = detail.items.len(),
            "Equipment request submitted"
        );
        event_sender
            .send_or_log(Event::RequestSubmitted {
                request_id: detail.request.id,
                requester_id: self.requester_id,
                line_items: detail.items.len(),
            })
            .await;
    }
}

#[async_trait::async_trait]
impl Command for SubmitRequestCommand {
    type Result = RequestDetail;

    #[instrument(skip(self, db_pool, event_sender), fields(requester_id = %self.requester_id))]
    async fn execute(
        &self,
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
    ) -> Result<Self::Result, ServiceError> {
        if let Err(e) = validate_cart(&self.items) {
            let message = e
                .message
                .map(|m| m.to_string())
                .unwrap_or_else(|| "invalid cart".to_string());
            return Err(ServiceError::InvalidInput(message));
        }

        let detail = self.create_request(db_pool.as_ref()).await?;
        self.log_and_trigger_event(&event_sender, &detail).await;
        REQUESTS_SUBMITTED.inc();

        Ok(detail)
    }
}
