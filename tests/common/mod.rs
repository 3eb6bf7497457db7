#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::Body,
    http::{Method, Request},
    Router,
};
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QueryOrder};
use serde_json::Value;
use supportdesk_api::{
    app_router,
    auth::{permissions::consts, Actor, PermissionSet},
    config::{AppConfig, BulkTransitionMode},
    db,
    entities::{inventory, item_in_request, request, shop_item},
    events::{self, EventSender},
    services::NewShopItem,
    AppState,
};
use tempfile::TempDir;
use tokio::sync::mpsc;
use tower::ServiceExt;
use uuid::Uuid;

/// Helper harness for spinning up an application state backed by a throwaway SQLite database.
pub struct TestApp {
    router: Router,
    pub state: AppState,
    pub organization_id: Uuid,
    _db_dir: TempDir,
    _event_task: tokio::task::JoinHandle<()>,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_bulk_mode(BulkTransitionMode::Partial).await
    }

    /// Construct a test application with fresh database state.
    pub async fn with_bulk_mode(bulk_mode: BulkTransitionMode) -> Self {
        let db_dir = tempfile::tempdir().expect("temp dir for test database");
        let db_path = db_dir.path().join("supportdesk_test.db");

        let mut cfg = AppConfig::new(
            format!("sqlite://{}?mode=rwc", db_path.display()),
            "127.0.0.1".to_string(),
            18_080,
            "test".to_string(),
        );
        cfg.auto_migrate = true;
        // a single connection serializes writers the way row locks would on Postgres
        cfg.db_max_connections = 1;
        cfg.db_min_connections = 1;
        cfg.bulk_transition_mode = bulk_mode;

        let pool = db::establish_connection_from_app_config(&cfg)
            .await
            .expect("failed to create test database");
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations in tests");

        let (event_tx, event_rx) = mpsc::channel(256);
        let event_task = tokio::spawn(events::process_events(event_rx));
        let state = AppState::new(Arc::new(pool), cfg, Arc::new(EventSender::new(event_tx)));

        Self {
            router: app_router(state.clone()),
            state,
            organization_id: Uuid::new_v4(),
            _db_dir: db_dir,
            _event_task: event_task,
        }
    }

    /// A member of the test organization with no extra permissions.
    pub fn member(&self) -> Actor {
        Actor::new(Uuid::new_v4(), self.organization_id, PermissionSet::default())
    }

    /// A portal administrator: manages requests, shop and tickets.
    pub fn admin(&self) -> Actor {
        Actor::new(
            Uuid::new_v4(),
            self.organization_id,
            PermissionSet::new([
                consts::REQUESTS_MANAGE,
                consts::SHOP_MANAGE,
                consts::TICKETS_MANAGE,
            ]),
        )
    }

    pub async fn seed_item(&self, name: &str, stock: i32) -> shop_item::Model {
        self.state
            .services
            .shop
            .create_item(
                &self.admin(),
                NewShopItem {
                    name: name.to_string(),
                    description: None,
                    image_url: None,
                    category_id: None,
                    stock,
                },
            )
            .await
            .expect("seed shop item")
    }

    pub async fn stock_of(&self, shop_item_id: Uuid) -> i32 {
        shop_item::Entity::find_by_id(shop_item_id)
            .one(self.state.db.as_ref())
            .await
            .expect("load shop item")
            .expect("shop item exists")
            .stock
    }

    pub async fn request_row(&self, request_id: Uuid) -> request::Model {
        request::Entity::find_by_id(request_id)
            .one(self.state.db.as_ref())
            .await
            .expect("load request")
            .expect("request exists")
    }

    pub async fn line_items(&self, request_id: Uuid) -> Vec<item_in_request::Model> {
        item_in_request::Entity::find()
            .filter(item_in_request::Column::RequestId.eq(request_id))
            .order_by_asc(item_in_request::Column::CreatedAt)
            .order_by_asc(item_in_request::Column::Id)
            .all(self.state.db.as_ref())
            .await
            .expect("load line items")
    }

    pub async fn holdings(&self, owner_id: Uuid) -> Vec<inventory::Model> {
        inventory::Entity::find()
            .filter(inventory::Column::OwnerId.eq(owner_id))
            .all(self.state.db.as_ref())
            .await
            .expect("load holdings")
    }

    /// Send a request as `actor` through the full router.
    pub async fn request_as(
        &self,
        actor: Option<&Actor>,
        method: Method,
        uri: &str,
        body: Option<Value>,
    ) -> axum::response::Response {
        let mut builder = Request::builder().method(method).uri(uri);

        if let Some(actor) = actor {
            let permissions: Vec<&str> = actor.permissions.iter().collect();
            builder = builder
                .header("x-user-id", actor.user_id.to_string())
                .header("x-organization-id", actor.organization_id.to_string())
                .header("x-permissions", permissions.join(","));
        }

        let body = if let Some(json) = body {
            builder = builder.header("content-type", "application/json");
            Body::from(serde_json::to_vec(&json).expect("failed to serialize json request body"))
        } else {
            Body::empty()
        };

        let request = builder.body(body).expect("failed to build request");
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router error during test request")
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        self._event_task.abort();
    }
}

/// Reads a JSON response body.
pub async fn json_body(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read response body");
    serde_json::from_slice(&bytes).expect("response body is json")
}
