use super::find_ticket;
use crate::{
    commands::Command,
    db::DbPool,
    entities::{ticket, TicketStatus},
    errors::ServiceError,
    events::{Event, EventSender},
    metrics::TICKET_CHANGES,
};
use chrono::Utc;
use sea_orm::{ActiveModelTrait, Set};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeTicketStatusCommand {
    pub organization_id: Uuid,
    pub ticket_id: Uuid,
    pub acting_user_id: Uuid,
    /// Support staff may set any status; owners may only close
    pub may_manage: bool,
    pub target: TicketStatus,
}

#[derive(Debug, Clone)]
pub enum TicketStatusChange {
    Applied(ticket::Model),
    AlreadySet(ticket::Model),
}

impl ChangeTicketStatusCommand {
    fn authorize(&self, ticket: &ticket::Model) -> Result<(), ServiceError> {
        if self.may_manage {
            return Ok(());
        }
        if ticket.owner_id != self.acting_user_id {
            return Err(ServiceError::Forbidden(
                "Only the ticket owner or support staff may change its status".to_string(),
            ));
        }
        if self.target != TicketStatus::Closed {
            return Err(ServiceError::Forbidden(
                "Ticket owners may only close their tickets".to_string(),
            ));
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl Command for ChangeTicketStatusCommand {
    type Result = TicketStatusChange;

    #[instrument(skip(self, db_pool, event_sender), fields(ticket_id = %self.ticket_id, target = %self.target))]
    async fn execute(
        &self,
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
    ) -> Result<Self::Result, ServiceError> {
        let db = db_pool.as_ref();
        let ticket = find_ticket(db, self.organization_id, self.ticket_id).await?;
        self.authorize(&ticket)?;

        if ticket.status == self.target {
            return Ok(TicketStatusChange::AlreadySet(ticket));
        }

        let previous = ticket.status;
        let mut active: ticket::ActiveModel = ticket.into();
        active.status = Set(self.target);
        active.updated_at = Set(Some(Utc::now()));
        let updated = active.update(db).await.map_err(ServiceError::DatabaseError)?;

        info!(ticket_id = %updated.id, %previous, status = %updated.status, "Ticket status changed");
        TICKET_CHANGES.with_label_values(&["status"]).inc();
        event_sender
            .send_or_log(Event::TicketStatusChanged {
                ticket_id: updated.id,
                old_status: previous,
                new_status: updated.status,
            })
            .await;

        Ok(TicketStatusChange::Applied(updated))
    }
}
