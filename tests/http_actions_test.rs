mod common;

use axum::http::{Method, StatusCode};
use common::{json_body, TestApp};
use serde_json::json;
use uuid::Uuid;

#[tokio::test]
async fn health_and_metrics_are_served() {
    let app = TestApp::new().await;

    let health = app.request_as(None, Method::GET, "/health", None).await;
    assert_eq!(health.status(), StatusCode::OK);
    assert_eq!(json_body(health).await["database"], json!("up"));

    let metrics = app.request_as(None, Method::GET, "/metrics", None).await;
    assert_eq!(metrics.status(), StatusCode::OK);
}

#[tokio::test]
async fn actions_require_identity_headers() {
    let app = TestApp::new().await;
    let response = app
        .request_as(None, Method::POST, "/api/v1/requests", Some(json!({"items": []})))
        .await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = json_body(response).await;
    assert_eq!(body["type"], json!("error"));
}

#[tokio::test]
async fn submit_accept_and_repeat_report_tagged_outcomes() {
    let app = TestApp::new().await;
    let requester = app.member();
    let admin = app.admin();
    let laptop = app.seed_item("Laptop", 10).await;

    let submitted = app
        .request_as(
            Some(&requester),
            Method::POST,
            "/api/v1/requests",
            Some(json!({"items": [{"shop_item_id": laptop.id, "quantity": 4}]})),
        )
        .await;
    assert_eq!(submitted.status(), StatusCode::CREATED);
    let body = json_body(submitted).await;
    assert_eq!(body["type"], json!("success"));
    let request_id = body["data"]["request"]["id"].as_str().unwrap().to_string();

    let uri = format!("/api/v1/requests/{}/status", request_id);
    let accepted = app
        .request_as(Some(&admin), Method::POST, &uri, Some(json!({"status": "accepted"})))
        .await;
    assert_eq!(accepted.status(), StatusCode::OK);
    let body = json_body(accepted).await;
    assert_eq!(body["type"], json!("success"));
    assert_eq!(body["data"]["request"]["status"], json!("accepted"));
    assert_eq!(app.stock_of(laptop.id).await, 6);

    let repeated = app
        .request_as(Some(&admin), Method::POST, &uri, Some(json!({"status": "accepted"})))
        .await;
    assert_eq!(repeated.status(), StatusCode::OK);
    assert_eq!(json_body(repeated).await["type"], json!("info"));

    let mine = app
        .request_as(Some(&requester), Method::GET, "/api/v1/inventory/mine", None)
        .await;
    assert_eq!(mine.status(), StatusCode::OK);
    assert_eq!(json_body(mine).await.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn insufficient_stock_is_an_error_outcome() {
    let app = TestApp::new().await;
    let requester = app.member();
    let dock = app.seed_item("Docking station", 3).await;

    let submitted = app
        .request_as(
            Some(&requester),
            Method::POST,
            "/api/v1/requests",
            Some(json!({"items": [{"shop_item_id": dock.id, "quantity": 5}]})),
        )
        .await;
    let request_id = json_body(submitted).await["data"]["request"]["id"]
        .as_str()
        .unwrap()
        .to_string();

    let response = app
        .request_as(
            Some(&app.admin()),
            Method::POST,
            &format!("/api/v1/requests/{}/status", request_id),
            Some(json!({"status": "accepted"})),
        )
        .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = json_body(response).await;
    assert_eq!(body["type"], json!("error"));
    assert!(body["message"].as_str().unwrap().contains("Not enough stock"));
    assert_eq!(app.stock_of(dock.id).await, 3);
}

#[tokio::test]
async fn malformed_input_is_rejected_with_field_messages() {
    let app = TestApp::new().await;
    let admin = app.admin();

    let bad_status = app
        .request_as(
            Some(&admin),
            Method::POST,
            &format!("/api/v1/requests/{}/status", Uuid::new_v4()),
            Some(json!({"status": "maybe"})),
        )
        .await;
    assert_eq!(bad_status.status(), StatusCode::BAD_REQUEST);
    let body = json_body(bad_status).await;
    assert_eq!(body["type"], json!("error"));
    assert!(!body["errors"].as_array().unwrap().is_empty());

    let bad_id = app
        .request_as(
            Some(&admin),
            Method::POST,
            "/api/v1/requests/42/status",
            Some(json!({"status": "accepted"})),
        )
        .await;
    assert_eq!(bad_id.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(bad_id).await["type"], json!("error"));

    let empty_cart = app
        .request_as(
            Some(&app.member()),
            Method::POST,
            "/api/v1/requests",
            Some(json!({"items": []})),
        )
        .await;
    assert_eq!(empty_cart.status(), StatusCode::BAD_REQUEST);
    let body = json_body(empty_cart).await;
    assert_eq!(
        body["errors"],
        json!(["items: Cart must contain at least one item"])
    );
}

#[tokio::test]
async fn members_cannot_review_requests_or_manage_the_shop() {
    let app = TestApp::new().await;
    let member = app.member();

    let listing = app
        .request_as(Some(&member), Method::GET, "/api/v1/requests", None)
        .await;
    assert_eq!(listing.status(), StatusCode::FORBIDDEN);

    let create = app
        .request_as(
            Some(&member),
            Method::POST,
            "/api/v1/shop/items",
            Some(json!({"name": "Chair", "stock": 2})),
        )
        .await;
    assert_eq!(create.status(), StatusCode::FORBIDDEN);
    assert_eq!(json_body(create).await["type"], json!("error"));
}

#[tokio::test]
async fn managers_restock_and_write_down() {
    let app = TestApp::new().await;
    let admin = app.admin();
    let chair = app.seed_item("Chair", 2).await;
    let uri = format!("/api/v1/shop/items/{}/stock", chair.id);

    let restock = app
        .request_as(Some(&admin), Method::POST, &uri, Some(json!({"delta": 5})))
        .await;
    assert_eq!(restock.status(), StatusCode::OK);
    assert_eq!(app.stock_of(chair.id).await, 7);

    let too_much = app
        .request_as(Some(&admin), Method::POST, &uri, Some(json!({"delta": -8})))
        .await;
    assert_eq!(too_much.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(app.stock_of(chair.id).await, 7);

    let catalog = app
        .request_as(Some(&app.member()), Method::GET, "/api/v1/shop/items", None)
        .await;
    assert_eq!(catalog.status(), StatusCode::OK);
    assert_eq!(json_body(catalog).await["items"][0]["stock"], json!(7));
}

#[tokio::test]
async fn ticket_owner_close_flow_over_http() {
    let app = TestApp::new().await;
    let owner = app.member();

    let created = app
        .request_as(
            Some(&owner),
            Method::POST,
            "/api/v1/tickets",
            Some(json!({"title": "VPN drops", "description": "Every hour on the hour"})),
        )
        .await;
    assert_eq!(created.status(), StatusCode::CREATED);
    let ticket_id = json_body(created).await["data"]["ticket"]["id"]
        .as_str()
        .unwrap()
        .to_string();

    let triage = app
        .request_as(
            Some(&owner),
            Method::POST,
            &format!("/api/v1/tickets/{}/status", ticket_id),
            Some(json!({"status": "in_progress"})),
        )
        .await;
    assert_eq!(triage.status(), StatusCode::FORBIDDEN);

    let close = app
        .request_as(
            Some(&owner),
            Method::POST,
            &format!("/api/v1/tickets/{}/status", ticket_id),
            Some(json!({"status": "closed"})),
        )
        .await;
    assert_eq!(close.status(), StatusCode::OK);
    assert_eq!(json_body(close).await["type"], json!("success"));

    let detail = app
        .request_as(
            Some(&owner),
            Method::GET,
            &format!("/api/v1/tickets/{}", ticket_id),
            None,
        )
        .await;
    assert_eq!(detail.status(), StatusCode::OK);
    assert_eq!(json_body(detail).await["ticket"]["status"], json!("closed"));
}
