use crate::{
    commands::Command,
    db::DbPool,
    entities::{ticket, ticket_conversation, ticket_screenshot, TicketStatus},
    errors::ServiceError,
    events::{Event, EventSender},
    metrics::TICKET_CHANGES,
};
use chrono::Utc;
use sea_orm::{ActiveModelTrait, Set, TransactionTrait};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidationError};

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateTicketCommand {
    pub organization_id: Uuid,
    pub owner_id: Uuid,
    #[validate(length(min = 1, max = 200, message = "Title must be between 1 and 200 characters"))]
    pub title: String,
    #[validate(length(min = 1, max = 10000, message = "Description must not be empty"))]
    pub description: String,
    /// URLs returned by the image host after upload
    #[validate(custom = "validate_screenshot_urls")]
    pub screenshots: Vec<String>,
}

/// A ticket with its conversation and screenshots
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct TicketDetail {
    pub ticket: ticket::Model,
    pub conversation: Vec<ticket_conversation::Model>,
    pub screenshots: Vec<ticket_screenshot::Model>,
}

fn validate_screenshot_urls(urls: &[String]) -> Result<(), ValidationError> {
    if urls.len() > 10 {
        let mut err = ValidationError::new("screenshots");
        err.message = Some("At most 10 screenshots per ticket".into());
        return Err(err);
    }
    if urls
        .iter()
        .any(|u| !(u.starts_with("https://") || u.starts_with("http://")))
    {
        let mut err = ValidationError::new("screenshots");
        err.message = Some("Screenshots must be absolute image host URLs".into());
        return Err(err);
    }
    Ok(())
}

#[async_trait::async_trait]
impl Command for CreateTicketCommand {
    type Result = TicketDetail;

    #[instrument(skip(self, db_pool, event_sender), fields(owner_id = %self.owner_id))]
    async fn execute(
        &self,
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
    ) -> Result<Self::Result, ServiceError> {
        self.validate()?;

        let now = Utc::now();
        let ticket_id = Uuid::new_v4();
        let txn = db_pool.begin().await.map_err(|e| {
            error!(error = %e, "Failed to start transaction for ticket creation");
            ServiceError::DatabaseError(e)
        })?;

        let ticket = ticket::ActiveModel {
            id: Set(ticket_id),
            organization_id: Set(self.organization_id),
            owner_id: Set(self.owner_id),
            title: Set(self.title.trim().to_string()),
            description: Set(self.description.clone()),
            status: Set(TicketStatus::Open),
            created_at: Set(now),
            updated_at: Set(None),
        }
        .insert(&txn)
        .await
        .map_err(|e| {
            error!(error = %e, %ticket_id, "Failed to create ticket");
            ServiceError::DatabaseError(e)
        })?;

        let mut screenshots = Vec::with_capacity(self.screenshots.len());
        for url in &self.screenshots {
            let shot = ticket_screenshot::ActiveModel {
                id: Set(Uuid::new_v4()),
                ticket_id: Set(ticket_id),
                image_url: Set(url.clone()),
                created_at: Set(now),
            }
            .insert(&txn)
            .await
            .map_err(ServiceError::DatabaseError)?;
            screenshots.push(shot);
        }

        txn.commit().await.map_err(|e| {
            error!(error = %e, %ticket_id, "Failed to commit ticket creation");
            ServiceError::DatabaseError(e)
        })?;

        info!(%ticket_id, screenshots = screenshots.len(), "Ticket created");
        TICKET_CHANGES.with_label_values(&["created"]).inc();
        event_sender.send_or_log(Event::TicketCreated(ticket_id)).await;

        Ok(TicketDetail {
            ticket,
            conversation: Vec::new(),
            screenshots,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn screenshot_urls_must_be_absolute() {
        assert!(validate_screenshot_urls(&["https://img.example.com/a.png".into()]).is_ok());
        assert!(validate_screenshot_urls(&["a.png".into()]).is_err());
    }

    #[test]
    fn blank_title_is_rejected() {
        let cmd = CreateTicketCommand {
            organization_id: Uuid::new_v4(),
            owner_id: Uuid::new_v4(),
            title: String::new(),
            description: "printer on fire".into(),
            screenshots: vec![],
        };
        assert!(cmd.validate().is_err());
    }
}
