use crate::{
    auth::Actor,
    cache::{ViewCache, ViewInvalidator, ViewPath},
    commands::{
        tickets::{
            AddTicketMessageCommand, ChangeTicketStatusCommand, CreateTicketCommand,
            TicketDetail, TicketStatusChange,
        },
        Command,
    },
    db::DbPool,
    entities::{ticket, ticket_conversation, ticket_screenshot, TicketStatus},
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

/// Body of a ticket creation
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct NewTicket {
    #[validate(length(min = 1, max = 200, message = "Title must be between 1 and 200 characters"))]
    pub title: String,
    #[validate(length(min = 1, max = 10000, message = "Description must not be empty"))]
    pub description: String,
    #[serde(default)]
    pub screenshots: Vec<String>,
}

/// Support tickets: plain records with an owner, a conversation and screenshots.
#[derive(Clone)]
pub struct TicketService {
    db_pool: Arc<DbPool>,
    event_sender: Arc<EventSender>,
    views: ViewCache,
}

impl TicketService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Arc<EventSender>, views: ViewCache) -> Self {
        Self {
            db_pool,
            event_sender,
            views,
        }
    }

    fn stale_views(actor: &Actor, ticket_id: Uuid) -> [ViewPath; 2] {
        [
            ViewPath::TicketDetail(ticket_id),
            ViewPath::TicketListing {
                organization_id: actor.organization_id,
            },
        ]
    }

    #[instrument(skip(self, actor, ticket), fields(user_id = %actor.user_id))]
    pub async fn create(&self, actor: &Actor, ticket: NewTicket) -> Result<TicketDetail, ServiceError> {
        let detail = CreateTicketCommand {
            organization_id: actor.organization_id,
            owner_id: actor.user_id,
            title: ticket.title,
            description: ticket.description,
            screenshots: ticket.screenshots,
        }
        .execute(self.db_pool.clone(), self.event_sender.clone())
        .await?;
        self.views
            .invalidate(&Self::stale_views(actor, detail.ticket.id))
            .await;
        Ok(detail)
    }

    #[instrument(skip(self, actor, message), fields(user_id = %actor.user_id))]
    pub async fn add_message(
        &self,
        actor: &Actor,
        ticket_id: Uuid,
        message: String,
    ) -> Result<ticket_conversation::Model, ServiceError> {
        let added = AddTicketMessageCommand {
            organization_id: actor.organization_id,
            ticket_id,
            author_id: actor.user_id,
            may_manage: actor.can_manage_tickets(),
            message,
        }
        .execute(self.db_pool.clone(), self.event_sender.clone())
        .await?;
        self.views
            .invalidate(&Self::stale_views(actor, ticket_id))
            .await;
        Ok(added)
    }

    #[instrument(skip(self, actor), fields(user_id = %actor.user_id))]
    pub async fn change_status(
        &self,
        actor: &Actor,
        ticket_id: Uuid,
        target: TicketStatus,
    ) -> Result<TicketStatusChange, ServiceError> {
        let change = ChangeTicketStatusCommand {
            organization_id: actor.organization_id,
            ticket_id,
            acting_user_id: actor.user_id,
            may_manage: actor.can_manage_tickets(),
            target,
        }
        .execute(self.db_pool.clone(), self.event_sender.clone())
        .await?;
        if let TicketStatusChange::Applied(_) = change {
            self.views
                .invalidate(&Self::stale_views(actor, ticket_id))
                .await;
        }
        Ok(change)
    }

    /// A ticket with its conversation, visible to its owner and to support staff.
    #[instrument(skip(self, actor), fields(user_id = %actor.user_id))]
    pub async fn get(&self, actor: &Actor, ticket_id: Uuid) -> Result<TicketDetail, ServiceError> {
        let db = self.db_pool.clone();
        let detail: TicketDetail = self
            .views
            .read_through(ViewPath::TicketDetail(ticket_id), || async move {
                let ticket = ticket::Entity::find_by_id(ticket_id)
                    .one(db.as_ref())
                    .await
                    .map_err(ServiceError::DatabaseError)?
                    .ok_or_else(|| not_found(ticket_id))?;
                let conversation = ticket_conversation::Entity::find()
                    .filter(ticket_conversation::Column::TicketId.eq(ticket_id))
                    .order_by_asc(ticket_conversation::Column::CreatedAt)
                    .all(db.as_ref())
                    .await
                    .map_err(ServiceError::DatabaseError)?;
                let screenshots = ticket_screenshot::Entity::find()
                    .filter(ticket_screenshot::Column::TicketId.eq(ticket_id))
                    .order_by_asc(ticket_screenshot::Column::CreatedAt)
                    .all(db.as_ref())
                    .await
                    .map_err(ServiceError::DatabaseError)?;
                Ok::<_, ServiceError>(TicketDetail {
                    ticket,
                    conversation,
                    screenshots,
                })
            })
            .await?;

        if !actor.belongs_to(detail.ticket.organization_id) {
            return Err(not_found(ticket_id));
        }
        if detail.ticket.owner_id != actor.user_id && !actor.can_manage_tickets() {
            return Err(ServiceError::Forbidden(
                "Only the ticket owner or support staff may view this ticket".to_string(),
            ));
        }
        Ok(detail)
    }

    /// Support staff see every ticket of the organization; everyone else sees their own.
    #[instrument(skip(self, actor), fields(user_id = %actor.user_id))]
    pub async fn list(&self, actor: &Actor) -> Result<Vec<ticket::Model>, ServiceError> {
        let organization_id = actor.organization_id;
        let db = self.db_pool.clone();

        if actor.can_manage_tickets() {
            return self
                .views
                .read_through(ViewPath::TicketListing { organization_id }, || async move {
                    ticket::Entity::find()
                        .filter(ticket::Column::OrganizationId.eq(organization_id))
                        .order_by_desc(ticket::Column::CreatedAt)
                        .all(db.as_ref())
                        .await
                        .map_err(ServiceError::DatabaseError)
                })
                .await;
        }

        ticket::Entity::find()
            .filter(ticket::Column::OrganizationId.eq(organization_id))
            .filter(ticket::Column::OwnerId.eq(actor.user_id))
            .order_by_desc(ticket::Column::CreatedAt)
            .all(db.as_ref())
            .await
            .map_err(ServiceError::DatabaseError)
    }
}

fn not_found(ticket_id: Uuid) -> ServiceError {
    ServiceError::NotFound(format!("Ticket {} not found", ticket_id))
}
