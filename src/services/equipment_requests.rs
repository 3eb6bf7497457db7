use crate::{
    auth::{permissions::consts, Actor},
    cache::{ViewCache, ViewInvalidator, ViewPath},
    commands::{
        requests::{CartLine, ChangeRequestStatusCommand, RequestDetail, StatusChange, SubmitRequestCommand},
        Command,
    },
    config::BulkTransitionMode,
    db::DbPool,
    entities::{inventory, request, RequestStatus},
    errors::ServiceError,
    events::EventSender,
    services::{ownership_ledger, request_status::load_line_items},
};
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QueryOrder};
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

/// Submits equipment requests and moves their line items through review.
#[derive(Clone)]
pub struct EquipmentRequestService {
    db_pool: Arc<DbPool>,
    event_sender: Arc<EventSender>,
    views: ViewCache,
    bulk_mode: BulkTransitionMode,
}

impl EquipmentRequestService {
    pub fn new(
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
        views: ViewCache,
        bulk_mode: BulkTransitionMode,
    ) -> Self {
        Self {
            db_pool,
            event_sender,
            views,
            bulk_mode,
        }
    }

    /// Views that may change when a request owned by `requester_id` changes.
    fn stale_views(&self, actor: &Actor, request_id: Uuid, requester_id: Uuid) -> Vec<ViewPath> {
        vec![
            ViewPath::RequestDetail(request_id),
            ViewPath::ShopListing {
                organization_id: actor.organization_id,
            },
            ViewPath::AllRequests {
                organization_id: actor.organization_id,
            },
            ViewPath::UserRequests {
                user_id: requester_id,
            },
            ViewPath::UserInventory {
                user_id: requester_id,
            },
        ]
    }

    /// Creates a Processing request for the actor from their cart.
    #[instrument(skip(self, actor, items), fields(user_id = %actor.user_id, lines = items.len()))]
    pub async fn submit(
        &self,
        actor: &Actor,
        items: Vec<CartLine>,
    ) -> Result<RequestDetail, ServiceError> {
        let command = SubmitRequestCommand {
            requester_id: actor.user_id,
            organization_id: actor.organization_id,
            items,
        };
        let detail = command
            .execute(self.db_pool.clone(), self.event_sender.clone())
            .await?;

        self.views
            .invalidate(&[
                ViewPath::AllRequests {
                    organization_id: actor.organization_id,
                },
                ViewPath::UserRequests {
                    user_id: actor.user_id,
                },
            ])
            .await;
        Ok(detail)
    }

    /// Moves one line item (or every line item when `item_in_request_id` is `None`) to `target`.
    /// Requires `requests:manage`.
    #[instrument(skip(self, actor), fields(user_id = %actor.user_id, %request_id, %target))]
    pub async fn change_status(
        &self,
        actor: &Actor,
        request_id: Uuid,
        target: RequestStatus,
        item_in_request_id: Option<Uuid>,
    ) -> Result<StatusChange, ServiceError> {
        actor.require(consts::REQUESTS_MANAGE)?;

        let existing = self.find_request(actor.organization_id, request_id).await?;
        let command = ChangeRequestStatusCommand {
            organization_id: actor.organization_id,
            request_id,
            target,
            item_in_request_id,
            mode: self.bulk_mode,
        };

        let result = command
            .execute(self.db_pool.clone(), self.event_sender.clone())
            .await;
        let stale = self.stale_views(actor, request_id, existing.requester_id);

        match &result {
            Ok(StatusChange::Applied { transitioned, .. }) => {
                info!(transitioned, "Request status change committed");
                self.views.invalidate(&stale).await;
            }
            Ok(StatusChange::AlreadySet { .. }) => {}
            Err(e) => {
                // a partial bulk run may have committed some lines before failing
                if item_in_request_id.is_none() && self.bulk_mode == BulkTransitionMode::Partial {
                    self.views.invalidate(&stale).await;
                }
                warn!(error = %e, "Request status change rejected");
            }
        }
        result
    }

    /// A single request with its line items. Visible to its requester and to request managers.
    #[instrument(skip(self, actor), fields(user_id = %actor.user_id))]
    pub async fn get_request(
        &self,
        actor: &Actor,
        request_id: Uuid,
    ) -> Result<RequestDetail, ServiceError> {
        let db = self.db_pool.clone();
        let detail: RequestDetail = self
            .views
            .read_through(ViewPath::RequestDetail(request_id), || async move {
                let request = request::Entity::find_by_id(request_id)
                    .one(db.as_ref())
                    .await
                    .map_err(ServiceError::DatabaseError)?
                    .ok_or_else(|| not_found(request_id))?;
                let items = load_line_items(db.as_ref(), request_id).await?;
                Ok::<_, ServiceError>(RequestDetail { request, items })
            })
            .await?;

        if !actor.belongs_to(detail.request.organization_id) {
            return Err(not_found(request_id));
        }
        if detail.request.requester_id != actor.user_id && !actor.can_manage_requests() {
            return Err(ServiceError::Forbidden(
                "Only the requester or a request manager may view this request".to_string(),
            ));
        }
        Ok(detail)
    }

    /// Every request in the actor's organization, newest first. Requires `requests:manage`.
    #[instrument(skip(self, actor), fields(user_id = %actor.user_id))]
    pub async fn list_requests(&self, actor: &Actor) -> Result<Vec<request::Model>, ServiceError> {
        actor.require(consts::REQUESTS_MANAGE)?;
        let organization_id = actor.organization_id;
        let db = self.db_pool.clone();
        self.views
            .read_through(ViewPath::AllRequests { organization_id }, || async move {
                request::Entity::find()
                    .filter(request::Column::OrganizationId.eq(organization_id))
                    .order_by_desc(request::Column::CreatedAt)
                    .all(db.as_ref())
                    .await
                    .map_err(|e| {
                        error!(error = %e, "Failed to list requests");
                        ServiceError::DatabaseError(e)
                    })
            })
            .await
    }

    /// The actor's own requests, newest first.
    #[instrument(skip(self, actor), fields(user_id = %actor.user_id))]
    pub async fn list_my_requests(
        &self,
        actor: &Actor,
    ) -> Result<Vec<request::Model>, ServiceError> {
        let user_id = actor.user_id;
        let organization_id = actor.organization_id;
        let db = self.db_pool.clone();
        self.views
            .read_through(ViewPath::UserRequests { user_id }, || async move {
                request::Entity::find()
                    .filter(request::Column::RequesterId.eq(user_id))
                    .filter(request::Column::OrganizationId.eq(organization_id))
                    .order_by_desc(request::Column::CreatedAt)
                    .all(db.as_ref())
                    .await
                    .map_err(ServiceError::DatabaseError)
            })
            .await
    }

    /// Equipment the actor currently holds.
    #[instrument(skip(self, actor), fields(user_id = %actor.user_id))]
    pub async fn my_inventory(&self, actor: &Actor) -> Result<Vec<inventory::Model>, ServiceError> {
        let user_id = actor.user_id;
        let db = self.db_pool.clone();
        self.views
            .read_through(ViewPath::UserInventory { user_id }, || async move {
                ownership_ledger::holdings(db.as_ref(), user_id).await
            })
            .await
    }

    async fn find_request(
        &self,
        organization_id: Uuid,
        request_id: Uuid,
    ) -> Result<request::Model, ServiceError> {
        request::Entity::find_by_id(request_id)
            .filter(request::Column::OrganizationId.eq(organization_id))
            .one(self.db_pool.as_ref())
            .await
            .map_err(ServiceError::DatabaseError)?
            .ok_or_else(|| not_found(request_id))
    }
}

fn not_found(request_id: Uuid) -> ServiceError {
    ServiceError::NotFound(format!("Request {} not found", request_id))
}
