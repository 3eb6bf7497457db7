use super::outcome::{ActionOutcome, ActionResult, Outcome};
use crate::{
    auth::Actor,
    commands::requests::{submit_request_command::validate_cart, CartLine, RequestDetail, StatusChange},
    entities::{inventory, request, RequestStatus},
    errors::ServiceError,
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
pub struct SubmitRequestBody {
    #[validate(custom = "validate_cart")]
    pub items: Vec<CartLine>,
}

/// `item_in_request_id` absent applies the status to every line item of the request.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct ChangeStatusBody {
    pub status: RequestStatus,
    pub item_in_request_id: Option<Uuid>,
}

#[utoipa::path(
    post,
    path = "/api/v1/requests",
    summary = "Submit an equipment request",
    request_body = SubmitRequestBody,
    responses(
        (status = 201, description = "Request submitted", body = ActionOutcome),
        (status = 400, description = "Invalid cart", body = ActionOutcome),
        (status = 401, description = "Unauthorized", body = ActionOutcome),
        (status = 404, description = "Unknown shop item", body = ActionOutcome),
    ),
    tag = "requests"
)]
pub async fn submit_request(
    State(state): State<AppState>,
    actor: Result<Actor, ServiceError>,
    payload: Result<Json<SubmitRequestBody>, JsonRejection>,
) -> ActionResult {
    let actor = actor?;
    let Json(body) = payload?;
    body.validate()?;

    let detail = state.services.requests.submit(&actor, body.items).await?;
    Ok(Outcome::created("Request submitted").with_data(&detail))
}

#[utoipa::path(
    post,
    path = "/api/v1/requests/{id}/status",
    summary = "Accept or decline a request or one of its line items",
    params(("id" = Uuid, Path, description = "Request id")),
    request_body = ChangeStatusBody,
    responses(
        (status = 200, description = "Status changed, or already set (type = info)", body = ActionOutcome),
        (status = 400, description = "Malformed id or status", body = ActionOutcome),
        (status = 403, description = "Missing requests:manage", body = ActionOutcome),
        (status = 404, description = "Unknown request or line item", body = ActionOutcome),
        (status = 422, description = "Not enough stock", body = ActionOutcome),
    ),
    tag = "requests"
)]
pub async fn change_request_status(
    State(state): State<AppState>,
    actor: Result<Actor, ServiceError>,
    id: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<ChangeStatusBody>, JsonRejection>,
) -> ActionResult {
    let actor = actor?;
    let Path(request_id) = id?;
    let Json(body) = payload?;
    body.validate()?;

    let change = state
        .services
        .requests
        .change_status(&actor, request_id, body.status, body.item_in_request_id)
        .await?;

    Ok(match change {
        StatusChange::Applied {
            request,
            items,
            transitioned,
        } => Outcome::success(format!(
            "{} item(s) set to {}, request is now {}",
            transitioned, body.status, request.status
        ))
        .with_data(&RequestDetail { request, items }),
        StatusChange::AlreadySet { status, .. } => {
            Outcome::info(format!("Status is already {}", status))
        }
    })
}

#[utoipa::path(
    get,
    path = "/api/v1/requests",
    summary = "All requests of the organization",
    responses(
        (status = 200, description = "Requests, newest first", body = [request::Model]),
        (status = 403, description = "Missing requests:manage", body = crate::errors::ErrorResponse),
    ),
    tag = "requests"
)]
pub async fn list_requests(
    State(state): State<AppState>,
    actor: Actor,
) -> Result<Json<Vec<request::Model>>, ServiceError> {
    Ok(Json(state.services.requests.list_requests(&actor).await?))
}

#[utoipa::path(
    get,
    path = "/api/v1/requests/mine",
    summary = "The caller's own requests",
    responses((status = 200, description = "Requests, newest first", body = [request::Model])),
    tag = "requests"
)]
pub async fn list_my_requests(
    State(state): State<AppState>,
    actor: Actor,
) -> Result<Json<Vec<request::Model>>, ServiceError> {
    Ok(Json(state.services.requests.list_my_requests(&actor).await?))
}

#[utoipa::path(
    get,
    path = "/api/v1/requests/{id}",
    summary = "A request with its line items",
    params(("id" = Uuid, Path, description = "Request id")),
    responses(
        (status = 200, description = "Request detail", body = RequestDetail),
        (status = 403, description = "Not the requester", body = crate::errors::ErrorResponse),
        (status = 404, description = "Unknown request", body = crate::errors::ErrorResponse),
    ),
    tag = "requests"
)]
pub async fn get_request(
    State(state): State<AppState>,
    actor: Actor,
    Path(request_id): Path<Uuid>,
) -> Result<Json<RequestDetail>, ServiceError> {
    Ok(Json(
        state.services.requests.get_request(&actor, request_id).await?,
    ))
}

#[utoipa::path(
    get,
    path = "/api/v1/inventory/mine",
    summary = "Equipment the caller holds",
    responses((status = 200, description = "Holdings, oldest first", body = [inventory::Model])),
    tag = "requests"
)]
pub async fn my_inventory(
    State(state): State<AppState>,
    actor: Actor,
) -> Result<Json<Vec<inventory::Model>>, ServiceError> {
    Ok(Json(state.services.requests.my_inventory(&actor).await?))
}
