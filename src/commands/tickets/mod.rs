pub mod add_ticket_message_command;
pub mod change_ticket_status_command;
pub mod create_ticket_command;

pub use add_ticket_message_command::AddTicketMessageCommand;
pub use change_ticket_status_command::{ChangeTicketStatusCommand, TicketStatusChange};
pub use create_ticket_command::{CreateTicketCommand, TicketDetail};

use crate::{entities::ticket, errors::ServiceError};
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter};
use uuid::Uuid;

/// Loads a ticket scoped to `organization_id`; other organizations' tickets read as missing.
pub(crate) async fn find_ticket<C: ConnectionTrait>(
    conn: &C,
    organization_id: Uuid,
    ticket_id: Uuid,
) -> Result<ticket::Model, ServiceError> {
    ticket::Entity::find_by_id(ticket_id)
        .filter(ticket::Column::OrganizationId.eq(organization_id))
        .one(conn)
        .await
        .map_err(ServiceError::DatabaseError)?
        .ok_or_else(|| ServiceError::NotFound(format!("Ticket {} not found", ticket_id)))
}
