use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Support Desk API",
        version = "1.0.0",
        description = r#"
# Support Desk API

Equipment requests, the shop they draw from, and support tickets for an organization portal.

## Identity

The upstream identity provider forwards the verified caller in headers:

```
x-user-id: <uuid>
x-organization-id: <uuid>
x-permissions: requests:manage,shop:manage
```

## Action outcomes

Mutating endpoints answer with a tagged outcome:

```json
{ "type": "success" | "info" | "error", "message": "...", "errors": ["field: reason"] }
```

`info` means nothing changed because the target status was already set.
"#
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development")
    ),
    tags(
        (name = "requests", description = "Equipment requests and their review"),
        (name = "shop", description = "Shop catalog and stock"),
        (name = "tickets", description = "Support tickets"),
        (name = "health", description = "Health check endpoints")
    ),
    paths(
        crate::handlers::requests::submit_request,
        crate::handlers::requests::change_request_status,
        crate::handlers::requests::list_requests,
        crate::handlers::requests::list_my_requests,
        crate::handlers::requests::get_request,
        crate::handlers::requests::my_inventory,

        crate::handlers::shop::list_items,
        crate::handlers::shop::create_item,
        crate::handlers::shop::adjust_stock,
        crate::handlers::shop::create_category,

        crate::handlers::tickets::create_ticket,
        crate::handlers::tickets::list_tickets,
        crate::handlers::tickets::get_ticket,
        crate::handlers::tickets::add_message,
        crate::handlers::tickets::change_ticket_status,

        crate::handlers::health::health,
    ),
    components(
        schemas(
            crate::handlers::outcome::ActionOutcome,
            crate::handlers::outcome::OutcomeKind,
            crate::handlers::requests::SubmitRequestBody,
            crate::handlers::requests::ChangeStatusBody,
            crate::handlers::shop::NewCategoryBody,
            crate::handlers::shop::AdjustStockBody,
            crate::handlers::tickets::TicketMessageBody,
            crate::handlers::tickets::TicketStatusBody,
            crate::commands::requests::CartLine,
            crate::commands::requests::RequestDetail,
            crate::commands::tickets::TicketDetail,
            crate::services::NewShopItem,
            crate::services::NewTicket,
            crate::services::ShopCatalog,
            crate::entities::RequestStatus,
            crate::entities::TicketStatus,
            crate::errors::ErrorResponse
        )
    )
)]
pub struct ApiDocV1;

pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/swagger-ui")
        .url("/api-docs/openapi.json", ApiDocV1::openapi())
        .config(utoipa_swagger_ui::Config::from("/api-docs/openapi.json").try_it_out_enabled(true))
}
