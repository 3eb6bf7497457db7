use super::outcome::{ActionOutcome, ActionResult, Outcome};
use crate::{
    auth::Actor,
    errors::ServiceError,
    services::{NewShopItem, ShopCatalog},
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
pub struct NewCategoryBody {
    #[validate(length(min = 1, max = 100, message = "Name must be between 1 and 100 characters"))]
    pub name: String,
}

/// Positive restocks, negative writes stock down
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct AdjustStockBody {
    #[validate(range(min = -100000, max = 100000, message = "Adjustment is out of range"))]
    pub delta: i32,
}

#[utoipa::path(
    get,
    path = "/api/v1/shop/items",
    summary = "Shop categories and items",
    responses((status = 200, description = "Catalog of the caller's organization", body = ShopCatalog)),
    tag = "shop"
)]
pub async fn list_items(
    State(state): State<AppState>,
    actor: Actor,
) -> Result<Json<ShopCatalog>, ServiceError> {
    Ok(Json(state.services.shop.catalog(&actor).await?))
}

#[utoipa::path(
    post,
    path = "/api/v1/shop/items",
    summary = "Add a shop item",
    request_body = NewShopItem,
    responses(
        (status = 201, description = "Item created", body = ActionOutcome),
        (status = 400, description = "Invalid item", body = ActionOutcome),
        (status = 403, description = "Missing shop:manage", body = ActionOutcome),
    ),
    tag = "shop"
)]
pub async fn create_item(
    State(state): State<AppState>,
    actor: Result<Actor, ServiceError>,
    payload: Result<Json<NewShopItem>, JsonRejection>,
) -> ActionResult {
    let actor = actor?;
    let Json(body) = payload?;
    body.validate()?;

    let item = state.services.shop.create_item(&actor, body).await?;
    Ok(Outcome::created(format!("{} added to the shop", item.name)).with_data(&item))
}

#[utoipa::path(
    post,
    path = "/api/v1/shop/items/{id}/stock",
    summary = "Restock or write down a shop item",
    params(("id" = Uuid, Path, description = "Shop item id")),
    request_body = AdjustStockBody,
    responses(
        (status = 200, description = "Stock adjusted", body = ActionOutcome),
        (status = 404, description = "Unknown shop item", body = ActionOutcome),
        (status = 422, description = "Write-down exceeds stock", body = ActionOutcome),
    ),
    tag = "shop"
)]
pub async fn adjust_stock(
    State(state): State<AppState>,
    actor: Result<Actor, ServiceError>,
    id: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<AdjustStockBody>, JsonRejection>,
) -> ActionResult {
    let actor = actor?;
    let Path(shop_item_id) = id?;
    let Json(body) = payload?;
    body.validate()?;

    let item = state
        .services
        .shop
        .adjust_stock(&actor, shop_item_id, body.delta)
        .await?;
    Ok(Outcome::success(format!("{} now has {} in stock", item.name, item.stock)).with_data(&item))
}

#[utoipa::path(
    post,
    path = "/api/v1/shop/categories",
    summary = "Add a shop category",
    request_body = NewCategoryBody,
    responses(
        (status = 201, description = "Category created", body = ActionOutcome),
        (status = 403, description = "Missing shop:manage", body = ActionOutcome),
    ),
    tag = "shop"
)]
pub async fn create_category(
    State(state): State<AppState>,
    actor: Result<Actor, ServiceError>,
    payload: Result<Json<NewCategoryBody>, JsonRejection>,
) -> ActionResult {
    let actor = actor?;
    let Json(body) = payload?;
    body.validate()?;

    let category = state
        .services
        .shop
        .create_category(&actor, body.name)
        .await?;
    Ok(Outcome::created(format!("Category {} created", category.name)).with_data(&category))
}
