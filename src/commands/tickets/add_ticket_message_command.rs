use super::find_ticket;
use crate::{
    commands::Command,
    db::DbPool,
    entities::{ticket, ticket_conversation},
    errors::ServiceError,
    events::{Event, EventSender},
    metrics::TICKET_CHANGES,
};
use chrono::Utc;
use sea_orm::{ActiveModelTrait, Set, TransactionTrait};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, instrument};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct AddTicketMessageCommand {
    pub organization_id: Uuid,
    pub ticket_id: Uuid,
    pub author_id: Uuid,
    /// Whether the author may act on tickets they do not own
    pub may_manage: bool,
    #[validate(length(min = 1, max = 10000, message = "Message must not be empty"))]
    pub message: String,
}

#[async_trait::async_trait]
impl Command for AddTicketMessageCommand {
    type Result = ticket_conversation::Model;

    #[instrument(skip(self, db_pool, event_sender), fields(ticket_id = %self.ticket_id))]
    async fn execute(
        &self,
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
    ) -> Result<Self::Result, ServiceError> {
        self.validate()?;

        let txn = db_pool.begin().await.map_err(|e| {
            error!(error = %e, "Failed to start transaction for ticket message");
            ServiceError::DatabaseError(e)
        })?;

        let ticket = find_ticket(&txn, self.organization_id, self.ticket_id).await?;
        if ticket.owner_id != self.author_id && !self.may_manage {
            return Err(ServiceError::Forbidden(
                "Only the ticket owner or support staff may reply".to_string(),
            ));
        }

        let now = Utc::now();
        let message = ticket_conversation::ActiveModel {
            id: Set(Uuid::new_v4()),
            ticket_id: Set(ticket.id),
            author_id: Set(self.author_id),
            message: Set(self.message.clone()),
            created_at: Set(now),
        }
        .insert(&txn)
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to store ticket message");
            ServiceError::DatabaseError(e)
        })?;

        let mut touched: ticket::ActiveModel = ticket.into();
        touched.updated_at = Set(Some(now));
        touched.update(&txn).await.map_err(ServiceError::DatabaseError)?;

        txn.commit().await.map_err(|e| {
            error!(error = %e, "Failed to commit ticket message");
            ServiceError::DatabaseError(e)
        })?;

        TICKET_CHANGES.with_label_values(&["message"]).inc();
        event_sender
            .send_or_log(Event::TicketMessageAdded {
                ticket_id: self.ticket_id,
                author_id: self.author_id,
            })
            .await;

        Ok(message)
    }
}
