//! Support Desk API Library
//!
//! Equipment-request lifecycle for an organization support portal: the shop stock ledger,
//! equipment ownership, line-item review with derived request status, and support tickets.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

// Core modules
pub mod auth;
pub mod cache;
pub mod commands;
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod events;
pub mod handlers;
pub mod metrics;
pub mod middleware_helpers;
pub mod migrator;
pub mod openapi;
pub mod services;
pub mod tracing;

use axum::{
    routing::{get, post},
    Router,
};
use sea_orm::DatabaseConnection;
use std::sync::Arc;

// App state definition
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub config: config::AppConfig,
    pub event_sender: Arc<events::EventSender>,
    pub views: cache::ViewCache,
    pub services: handlers::AppServices,
}

impl AppState {
    /// Wires the services over a connected pool and a live event channel.
    pub fn new(
        db: Arc<DatabaseConnection>,
        config: config::AppConfig,
        event_sender: Arc<events::EventSender>,
    ) -> Self {
        let views = cache::ViewCache::in_memory(config.cache_ttl());
        let services = handlers::AppServices::new(
            db.clone(),
            event_sender.clone(),
            views.clone(),
            config.bulk_transition_mode,
        );
        Self {
            db,
            config,
            event_sender,
            views,
            services,
        }
    }
}

/// Standard result type for JSON read endpoints
pub type ApiResult<T> = Result<axum::Json<T>, errors::ServiceError>;

pub fn api_v1_routes() -> Router<AppState> {
    let requests = Router::new()
        .route(
            "/requests",
            post(handlers::requests::submit_request).get(handlers::requests::list_requests),
        )
        .route("/requests/mine", get(handlers::requests::list_my_requests))
        .route("/requests/:id", get(handlers::requests::get_request))
        .route(
            "/requests/:id/status",
            post(handlers::requests::change_request_status),
        )
        .route("/inventory/mine", get(handlers::requests::my_inventory));

    let shop = Router::new()
        .route(
            "/shop/items",
            get(handlers::shop::list_items).post(handlers::shop::create_item),
        )
        .route("/shop/items/:id/stock", post(handlers::shop::adjust_stock))
        .route("/shop/categories", post(handlers::shop::create_category));

    let tickets = Router::new()
        .route(
            "/tickets",
            post(handlers::tickets::create_ticket).get(handlers::tickets::list_tickets),
        )
        .route("/tickets/:id", get(handlers::tickets::get_ticket))
        .route("/tickets/:id/messages", post(handlers::tickets::add_message))
        .route(
            "/tickets/:id/status",
            post(handlers::tickets::change_ticket_status),
        );

    Router::new().merge(requests).merge(shop).merge(tickets)
}

/// The full application router without CORS and compression, which depend on deployment.
pub fn app_router(state: AppState) -> Router {
    Router::new()
        .nest("/api/v1", api_v1_routes())
        .merge(handlers::health::health_routes())
        .merge(openapi::swagger_ui())
        .layer(crate::tracing::configure_http_tracing())
        // Ensure every request carries a request id for traceability
        .layer(axum::middleware::from_fn(
            middleware_helpers::request_id_middleware,
        ))
        .with_state(state)
}

pub mod prelude {
    pub use crate::auth::Actor;
    pub use crate::commands::Command;
    pub use crate::db::DbPool;
    pub use crate::entities::{RequestStatus, TicketStatus};
    pub use crate::errors::ServiceError;
    pub use crate::events::{Event, EventSender};
    pub use crate::AppState;
}
