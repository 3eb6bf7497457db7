use super::outcome::{ActionOutcome, ActionResult, Outcome};
use crate::{
    auth::Actor,
    commands::tickets::{TicketDetail, TicketStatusChange},
    entities::{ticket, TicketStatus},
    errors::ServiceError,
    services::NewTicket,
    AppState,
};
use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    response::Json,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct TicketMessageBody {
    #[validate(length(min = 1, max = 10000, message = "Message must not be empty"))]
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TicketStatusBody {
    pub status: TicketStatus,
}

#[utoipa::path(
    post,
    path = "/api/v1/tickets",
    summary = "Open a support ticket",
    request_body = NewTicket,
    responses(
        (status = 201, description = "Ticket opened", body = ActionOutcome),
        (status = 400, description = "Invalid ticket", body = ActionOutcome),
    ),
    tag = "tickets"
)]
pub async fn create_ticket(
    State(state): State<AppState>,
    actor: Result<Actor, ServiceError>,
    payload: Result<Json<NewTicket>, JsonRejection>,
) -> ActionResult {
    let actor = actor?;
    let Json(body) = payload?;
    body.validate()?;

    let detail = state.services.tickets.create(&actor, body).await?;
    Ok(Outcome::created("Ticket opened").with_data(&detail))
}

#[utoipa::path(
    get,
    path = "/api/v1/tickets",
    summary = "Tickets visible to the caller",
    responses((status = 200, description = "Tickets, newest first", body = [ticket::Model])),
    tag = "tickets"
)]
pub async fn list_tickets(
    State(state): State<AppState>,
    actor: Actor,
) -> Result<Json<Vec<ticket::Model>>, ServiceError> {
    Ok(Json(state.services.tickets.list(&actor).await?))
}

#[utoipa::path(
    get,
    path = "/api/v1/tickets/{id}",
    summary = "A ticket with its conversation",
    params(("id" = Uuid, Path, description = "Ticket id")),
    responses(
        (status = 200, description = "Ticket detail", body = TicketDetail),
        (status = 404, description = "Unknown ticket", body = crate::errors::ErrorResponse),
    ),
    tag = "tickets"
)]
pub async fn get_ticket(
    State(state): State<AppState>,
    actor: Actor,
    Path(ticket_id): Path<Uuid>,
) -> Result<Json<TicketDetail>, ServiceError> {
    Ok(Json(state.services.tickets.get(&actor, ticket_id).await?))
}

#[utoipa::path(
    post,
    path = "/api/v1/tickets/{id}/messages",
    summary = "Reply on a ticket",
    params(("id" = Uuid, Path, description = "Ticket id")),
    request_body = TicketMessageBody,
    responses(
        (status = 201, description = "Reply added", body = ActionOutcome),
        (status = 403, description = "Neither owner nor support staff", body = ActionOutcome),
    ),
    tag = "tickets"
)]
pub async fn add_message(
    State(state): State<AppState>,
    actor: Result<Actor, ServiceError>,
    id: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<TicketMessageBody>, JsonRejection>,
) -> ActionResult {
    let actor = actor?;
    let Path(ticket_id) = id?;
    let Json(body) = payload?;
    body.validate()?;

    let message = state
        .services
        .tickets
        .add_message(&actor, ticket_id, body.message)
        .await?;
    Ok(Outcome::created("Reply added").with_data(&message))
}

#[utoipa::path(
    post,
    path = "/api/v1/tickets/{id}/status",
    summary = "Change a ticket's status",
    params(("id" = Uuid, Path, description = "Ticket id")),
    request_body = TicketStatusBody,
    responses(
        (status = 200, description = "Status changed, or already set (type = info)", body = ActionOutcome),
        (status = 403, description = "Owners may only close", body = ActionOutcome),
    ),
    tag = "tickets"
)]
pub async fn change_ticket_status(
    State(state): State<AppState>,
    actor: Result<Actor, ServiceError>,
    id: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<TicketStatusBody>, JsonRejection>,
) -> ActionResult {
    let actor = actor?;
    let Path(ticket_id) = id?;
    let Json(body) = payload?;

    Ok(
        match state
            .services
            .tickets
            .change_status(&actor, ticket_id, body.status)
            .await?
        {
            TicketStatusChange::Applied(ticket) => {
                Outcome::success(format!("Ticket is now {}", ticket.status)).with_data(&ticket)
            }
            TicketStatusChange::AlreadySet(ticket) => {
                Outcome::info(format!("Ticket is already {}", ticket.status))
            }
        },
    )
}
