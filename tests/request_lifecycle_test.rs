mod common;

use assert_matches::assert_matches;
use chrono::Duration;
use common::TestApp;
use sea_orm::{ActiveModelTrait, Set};
use supportdesk_api::{
    commands::requests::{CartLine, StatusChange},
    config::BulkTransitionMode,
    entities::{item_in_request, RequestStatus},
    errors::ServiceError,
};
use uuid::Uuid;

fn line(shop_item_id: Uuid, quantity: i32) -> CartLine {
    CartLine {
        shop_item_id,
        quantity,
    }
}

#[tokio::test]
async fn submission_creates_processing_request_with_one_line_per_item() {
    let app = TestApp::new().await;
    let laptop = app.seed_item("Laptop", 10).await;
    let monitor = app.seed_item("Monitor", 10).await;
    let requester = app.member();

    let detail = app
        .state
        .services
        .requests
        .submit(&requester, vec![line(laptop.id, 2), line(monitor.id, 1)])
        .await
        .expect("submit");

    assert_eq!(detail.request.status, RequestStatus::Processing);
    assert_eq!(detail.request.requester_id, requester.user_id);

    let items = app.line_items(detail.request.id).await;
    assert_eq!(items.len(), 2);
    for item in &items {
        assert_eq!(item.status, RequestStatus::Processing);
        assert_eq!(item.request_id, detail.request.id);
        assert_eq!(item.organization_id, app.organization_id);
    }
    // nothing is reserved at submission
    assert_eq!(app.stock_of(laptop.id).await, 10);
    assert_eq!(app.stock_of(monitor.id).await, 10);
}

#[tokio::test]
async fn submission_rejects_empty_carts_and_non_positive_quantities() {
    let app = TestApp::new().await;
    let laptop = app.seed_item("Laptop", 1).await;
    let requests = &app.state.services.requests;

    assert_matches!(
        requests.submit(&app.member(), vec![]).await,
        Err(ServiceError::InvalidInput(_))
    );
    assert_matches!(
        requests.submit(&app.member(), vec![line(laptop.id, 0)]).await,
        Err(ServiceError::InvalidInput(_))
    );
    assert_matches!(
        requests
            .submit(&app.member(), vec![line(Uuid::new_v4(), 1)])
            .await,
        Err(ServiceError::NotFound(_))
    );
}

#[tokio::test]
async fn repeated_cart_entries_fold_into_one_line() {
    let app = TestApp::new().await;
    let cable = app.seed_item("USB-C cable", 10).await;

    let detail = app
        .state
        .services
        .requests
        .submit(&app.member(), vec![line(cable.id, 1), line(cable.id, 2)])
        .await
        .unwrap();

    assert_eq!(detail.items.len(), 1);
    assert_eq!(detail.items[0].quantity, 3);
}

#[tokio::test]
async fn folded_cart_quantities_past_the_limit_are_rejected() {
    let app = TestApp::new().await;
    let laptop = app.seed_item("Laptop", 10).await;
    let requester = app.member();
    let requests = &app.state.services.requests;

    assert_matches!(
        requests
            .submit(&requester, vec![line(laptop.id, i32::MAX), line(laptop.id, 1)])
            .await,
        Err(ServiceError::InvalidInput(_))
    );
    assert!(requests.list_my_requests(&requester).await.unwrap().is_empty());
    assert_eq!(app.stock_of(laptop.id).await, 10);
}

#[tokio::test]
async fn accept_then_decline_round_trips_stock_and_ownership() {
    let app = TestApp::new().await;
    let admin = app.admin();
    let requester = app.member();
    let laptop = app.seed_item("Laptop", 10).await;
    let requests = &app.state.services.requests;

    let detail = requests
        .submit(&requester, vec![line(laptop.id, 4)])
        .await
        .unwrap();
    let item_id = detail.items[0].id;

    let accepted = requests
        .change_status(&admin, detail.request.id, RequestStatus::Accepted, Some(item_id))
        .await
        .unwrap();
    assert_matches!(accepted, StatusChange::Applied { transitioned: 1, .. });
    assert_eq!(app.stock_of(laptop.id).await, 6);
    let held = app.holdings(requester.user_id).await;
    assert_eq!(held.len(), 1);
    assert_eq!(held[0].item_in_request_id, Some(item_id));
    assert_eq!(
        app.request_row(detail.request.id).await.status,
        RequestStatus::Accepted
    );

    requests
        .change_status(&admin, detail.request.id, RequestStatus::Declined, Some(item_id))
        .await
        .unwrap();
    assert_eq!(app.stock_of(laptop.id).await, 10);
    assert!(app.holdings(requester.user_id).await.is_empty());
    assert_eq!(
        app.request_row(detail.request.id).await.status,
        RequestStatus::Declined
    );
}

#[tokio::test]
async fn insufficient_stock_leaves_everything_untouched() {
    let app = TestApp::new().await;
    let requester = app.member();
    let dock = app.seed_item("Docking station", 3).await;
    let requests = &app.state.services.requests;

    let detail = requests
        .submit(&requester, vec![line(dock.id, 5)])
        .await
        .unwrap();

    let result = requests
        .change_status(
            &app.admin(),
            detail.request.id,
            RequestStatus::Accepted,
            Some(detail.items[0].id),
        )
        .await;

    assert_matches!(result, Err(ServiceError::InsufficientStock(msg)) if msg.contains("Docking station"));
    assert_eq!(app.stock_of(dock.id).await, 3);
    assert_eq!(app.line_items(detail.request.id).await[0].status, RequestStatus::Processing);
    assert!(app.holdings(requester.user_id).await.is_empty());
    assert_eq!(
        app.request_row(detail.request.id).await.status,
        RequestStatus::Processing
    );
}

#[tokio::test]
async fn unknown_line_item_is_not_found_and_changes_nothing() {
    let app = TestApp::new().await;
    let admin = app.admin();
    let requester = app.member();
    let laptop = app.seed_item("Laptop", 5).await;
    let requests = &app.state.services.requests;

    let detail = requests
        .submit(&requester, vec![line(laptop.id, 2)])
        .await
        .unwrap();

    assert_matches!(
        requests
            .change_status(
                &admin,
                detail.request.id,
                RequestStatus::Accepted,
                Some(Uuid::new_v4())
            )
            .await,
        Err(ServiceError::NotFound(_))
    );

    assert_eq!(app.stock_of(laptop.id).await, 5);
    assert!(app.holdings(requester.user_id).await.is_empty());
    assert_eq!(
        app.request_row(detail.request.id).await.status,
        RequestStatus::Processing
    );
    assert!(app
        .line_items(detail.request.id)
        .await
        .iter()
        .all(|item| item.status == RequestStatus::Processing));
}

#[tokio::test]
async fn line_item_of_another_request_is_not_found() {
    let app = TestApp::new().await;
    let admin = app.admin();
    let alice = app.member();
    let bob = app.member();
    let laptop = app.seed_item("Laptop", 5).await;
    let requests = &app.state.services.requests;

    let first = requests.submit(&alice, vec![line(laptop.id, 1)]).await.unwrap();
    let second = requests.submit(&bob, vec![line(laptop.id, 3)]).await.unwrap();

    assert_matches!(
        requests
            .change_status(
                &admin,
                first.request.id,
                RequestStatus::Accepted,
                Some(second.items[0].id)
            )
            .await,
        Err(ServiceError::NotFound(_))
    );

    assert_eq!(app.stock_of(laptop.id).await, 5);
    assert!(app.holdings(alice.user_id).await.is_empty());
    assert!(app.holdings(bob.user_id).await.is_empty());
    for request_id in [first.request.id, second.request.id] {
        assert_eq!(
            app.request_row(request_id).await.status,
            RequestStatus::Processing
        );
        assert_eq!(
            app.line_items(request_id).await[0].status,
            RequestStatus::Processing
        );
    }
}

#[tokio::test]
async fn restocking_past_the_stock_limit_is_invalid_input() {
    let app = TestApp::new().await;
    let admin = app.admin();
    let laptop = app.seed_item("Laptop", 10).await;
    let shop = &app.state.services.shop;

    assert_matches!(
        shop.adjust_stock(&admin, laptop.id, i32::MAX).await,
        Err(ServiceError::InvalidInput(_))
    );
    assert_eq!(app.stock_of(laptop.id).await, 10);

    // the largest restock that still fits goes through
    let topped = shop
        .adjust_stock(&admin, laptop.id, i32::MAX - 10)
        .await
        .unwrap();
    assert_eq!(topped.stock, i32::MAX);
    assert_matches!(
        shop.adjust_stock(&admin, laptop.id, 1).await,
        Err(ServiceError::InvalidInput(_))
    );

    let catalog = shop.catalog(&admin).await.unwrap();
    assert_eq!(catalog.items[0].stock, i32::MAX);
}

#[tokio::test]
async fn setting_the_current_status_is_a_no_op() {
    let app = TestApp::new().await;
    let admin = app.admin();
    let requester = app.member();
    let phone = app.seed_item("Phone", 5).await;
    let requests = &app.state.services.requests;

    let detail = requests
        .submit(&requester, vec![line(phone.id, 2)])
        .await
        .unwrap();
    let item_id = detail.items[0].id;
    requests
        .change_status(&admin, detail.request.id, RequestStatus::Accepted, Some(item_id))
        .await
        .unwrap();

    let before_items = app.line_items(detail.request.id).await;
    let before_request = app.request_row(detail.request.id).await;
    let before_holdings = app.holdings(requester.user_id).await;

    let again = requests
        .change_status(&admin, detail.request.id, RequestStatus::Accepted, Some(item_id))
        .await
        .unwrap();
    assert_matches!(again, StatusChange::AlreadySet { status: RequestStatus::Accepted, .. });

    let whole = requests
        .change_status(&admin, detail.request.id, RequestStatus::Accepted, None)
        .await
        .unwrap();
    assert_matches!(whole, StatusChange::AlreadySet { .. });

    assert_eq!(app.stock_of(phone.id).await, 3);
    assert_eq!(app.line_items(detail.request.id).await, before_items);
    assert_eq!(app.request_row(detail.request.id).await, before_request);
    assert_eq!(app.holdings(requester.user_id).await, before_holdings);
}

#[tokio::test]
async fn aggregate_follows_sibling_statuses() {
    let app = TestApp::new().await;
    let admin = app.admin();
    let a = app.seed_item("Keyboard", 5).await;
    let b = app.seed_item("Mouse", 5).await;
    let requests = &app.state.services.requests;

    let detail = requests
        .submit(&app.member(), vec![line(a.id, 1), line(b.id, 1)])
        .await
        .unwrap();
    let request_id = detail.request.id;
    let (first, second) = (detail.items[0].id, detail.items[1].id);

    // [Processing, Declined] reads as Processing
    requests
        .change_status(&admin, request_id, RequestStatus::Declined, Some(first))
        .await
        .unwrap();
    assert_eq!(app.request_row(request_id).await.status, RequestStatus::Processing);

    // [Declined, Accepted] reads as Accepted
    requests
        .change_status(&admin, request_id, RequestStatus::Accepted, Some(second))
        .await
        .unwrap();
    assert_eq!(app.request_row(request_id).await.status, RequestStatus::Accepted);

    // [Declined, Declined] reads as Declined
    requests
        .change_status(&admin, request_id, RequestStatus::Declined, Some(second))
        .await
        .unwrap();
    assert_eq!(app.request_row(request_id).await.status, RequestStatus::Declined);

    // [Processing, Processing] reads as Processing
    requests
        .change_status(&admin, request_id, RequestStatus::Processing, None)
        .await
        .unwrap();
    assert_eq!(app.request_row(request_id).await.status, RequestStatus::Processing);
}

#[tokio::test]
async fn bulk_decline_walks_back_every_accepted_line() {
    let app = TestApp::new().await;
    let admin = app.admin();
    let requester = app.member();
    let a = app.seed_item("Headset", 4).await;
    let b = app.seed_item("Webcam", 4).await;
    let requests = &app.state.services.requests;

    let detail = requests
        .submit(&requester, vec![line(a.id, 2), line(b.id, 3)])
        .await
        .unwrap();
    requests
        .change_status(&admin, detail.request.id, RequestStatus::Accepted, None)
        .await
        .unwrap();
    assert_eq!(app.stock_of(a.id).await, 2);
    assert_eq!(app.stock_of(b.id).await, 1);
    assert_eq!(app.holdings(requester.user_id).await.len(), 2);

    let change = requests
        .change_status(&admin, detail.request.id, RequestStatus::Declined, None)
        .await
        .unwrap();
    assert_matches!(change, StatusChange::Applied { transitioned: 2, ref request, .. } if request.status == RequestStatus::Declined);
    assert_eq!(app.stock_of(a.id).await, 4);
    assert_eq!(app.stock_of(b.id).await, 4);
    assert!(app.holdings(requester.user_id).await.is_empty());
}

/// Submits [plenty, scarce] with the scarce line ordered last.
async fn request_with_scarce_last(app: &TestApp) -> (Uuid, Uuid, Uuid, Uuid) {
    let plenty = app.seed_item("Charger", 5).await;
    let scarce = app.seed_item("Tablet", 1).await;
    let requester = app.member();

    let detail = app
        .state
        .services
        .requests
        .submit(&requester, vec![line(plenty.id, 2), line(scarce.id, 5)])
        .await
        .unwrap();

    let scarce_line = detail
        .items
        .iter()
        .find(|item| item.shop_item_id == scarce.id)
        .cloned()
        .unwrap();
    let mut later: item_in_request::ActiveModel = scarce_line.clone().into();
    later.created_at = Set(scarce_line.created_at + Duration::seconds(1));
    later.update(app.state.db.as_ref()).await.unwrap();

    (detail.request.id, requester.user_id, plenty.id, scarce.id)
}

#[tokio::test]
async fn partial_bulk_accept_keeps_lines_committed_before_the_failure() {
    let app = TestApp::with_bulk_mode(BulkTransitionMode::Partial).await;
    let (request_id, requester_id, plenty, scarce) = request_with_scarce_last(&app).await;

    let result = app
        .state
        .services
        .requests
        .change_status(&app.admin(), request_id, RequestStatus::Accepted, None)
        .await;
    assert_matches!(result, Err(ServiceError::InsufficientStock(_)));

    assert_eq!(app.stock_of(plenty).await, 3);
    assert_eq!(app.stock_of(scarce).await, 1);
    assert_eq!(app.holdings(requester_id).await.len(), 1);

    let statuses: Vec<_> = app
        .line_items(request_id)
        .await
        .into_iter()
        .map(|item| (item.shop_item_id, item.status))
        .collect();
    assert!(statuses.contains(&(plenty, RequestStatus::Accepted)));
    assert!(statuses.contains(&(scarce, RequestStatus::Processing)));
    // stored status is re-derived from what committed
    assert_eq!(app.request_row(request_id).await.status, RequestStatus::Accepted);
}

#[tokio::test]
async fn atomic_bulk_accept_rolls_back_the_whole_batch() {
    let app = TestApp::with_bulk_mode(BulkTransitionMode::Atomic).await;
    let (request_id, requester_id, plenty, scarce) = request_with_scarce_last(&app).await;

    let result = app
        .state
        .services
        .requests
        .change_status(&app.admin(), request_id, RequestStatus::Accepted, None)
        .await;
    assert_matches!(result, Err(ServiceError::InsufficientStock(_)));

    assert_eq!(app.stock_of(plenty).await, 5);
    assert_eq!(app.stock_of(scarce).await, 1);
    assert!(app.holdings(requester_id).await.is_empty());
    assert!(app
        .line_items(request_id)
        .await
        .iter()
        .all(|item| item.status == RequestStatus::Processing));
    assert_eq!(app.request_row(request_id).await.status, RequestStatus::Processing);
}

#[tokio::test]
async fn revoking_removes_the_row_granted_by_that_line() {
    let app = TestApp::new().await;
    let admin = app.admin();
    let requester = app.member();
    let monitor = app.seed_item("Monitor", 10).await;
    let requests = &app.state.services.requests;

    let first = requests
        .submit(&requester, vec![line(monitor.id, 1)])
        .await
        .unwrap();
    let second = requests
        .submit(&requester, vec![line(monitor.id, 1)])
        .await
        .unwrap();
    for detail in [&first, &second] {
        requests
            .change_status(&admin, detail.request.id, RequestStatus::Accepted, None)
            .await
            .unwrap();
    }
    assert_eq!(app.holdings(requester.user_id).await.len(), 2);

    requests
        .change_status(&admin, first.request.id, RequestStatus::Declined, None)
        .await
        .unwrap();

    let held = app.holdings(requester.user_id).await;
    assert_eq!(held.len(), 1);
    assert_eq!(held[0].item_in_request_id, Some(second.items[0].id));
    assert_eq!(app.stock_of(monitor.id).await, 9);
}

#[tokio::test]
async fn concurrent_accepts_never_oversell() {
    let app = TestApp::new().await;
    let admin = app.admin();
    let badge = app.seed_item("Security badge", 3).await;

    let mut request_ids = Vec::new();
    for _ in 0..6 {
        let detail = app
            .state
            .services
            .requests
            .submit(&app.member(), vec![line(badge.id, 1)])
            .await
            .unwrap();
        request_ids.push(detail.request.id);
    }

    let attempts = request_ids.iter().map(|request_id| {
        let service = app.state.services.requests.clone();
        let admin = admin.clone();
        let request_id = *request_id;
        tokio::spawn(async move {
            service
                .change_status(&admin, request_id, RequestStatus::Accepted, None)
                .await
        })
    });

    let results = futures::future::join_all(attempts).await;
    let accepted = results
        .into_iter()
        .map(|joined| joined.expect("task panicked"))
        .filter(|result| result.is_ok())
        .count();

    assert_eq!(accepted, 3);
    assert_eq!(app.stock_of(badge.id).await, 0);
}

#[tokio::test]
async fn status_changes_require_request_management() {
    let app = TestApp::new().await;
    let requester = app.member();
    let pen = app.seed_item("Pen", 5).await;

    let detail = app
        .state
        .services
        .requests
        .submit(&requester, vec![line(pen.id, 1)])
        .await
        .unwrap();

    let result = app
        .state
        .services
        .requests
        .change_status(&requester, detail.request.id, RequestStatus::Accepted, None)
        .await;
    assert_matches!(result, Err(ServiceError::Forbidden(_)));
    assert_eq!(app.stock_of(pen.id).await, 5);
}

#[tokio::test]
async fn other_organizations_cannot_see_or_touch_requests() {
    let app = TestApp::new().await;
    let requester = app.member();
    let pen = app.seed_item("Pen", 5).await;
    let detail = app
        .state
        .services
        .requests
        .submit(&requester, vec![line(pen.id, 1)])
        .await
        .unwrap();

    let mut outsider = app.admin();
    outsider.organization_id = Uuid::new_v4();

    assert_matches!(
        app.state
            .services
            .requests
            .get_request(&outsider, detail.request.id)
            .await,
        Err(ServiceError::NotFound(_))
    );
    assert_matches!(
        app.state
            .services
            .requests
            .change_status(&outsider, detail.request.id, RequestStatus::Accepted, None)
            .await,
        Err(ServiceError::NotFound(_))
    );

    // a colleague without request management sees nothing of it either
    assert_matches!(
        app.state
            .services
            .requests
            .get_request(&app.member(), detail.request.id)
            .await,
        Err(ServiceError::Forbidden(_))
    );
}

#[tokio::test]
async fn cached_views_are_refreshed_after_a_change() {
    let app = TestApp::new().await;
    let admin = app.admin();
    let requester = app.member();
    let pen = app.seed_item("Pen", 5).await;
    let requests = &app.state.services.requests;

    let detail = requests
        .submit(&requester, vec![line(pen.id, 2)])
        .await
        .unwrap();

    // warm the caches
    let cached = requests.get_request(&requester, detail.request.id).await.unwrap();
    assert_eq!(cached.request.status, RequestStatus::Processing);
    assert!(requests.my_inventory(&requester).await.unwrap().is_empty());
    let catalog = app.state.services.shop.catalog(&requester).await.unwrap();
    assert_eq!(catalog.items[0].stock, 5);

    requests
        .change_status(&admin, detail.request.id, RequestStatus::Accepted, None)
        .await
        .unwrap();

    let refreshed = requests.get_request(&requester, detail.request.id).await.unwrap();
    assert_eq!(refreshed.request.status, RequestStatus::Accepted);
    assert_eq!(requests.my_inventory(&requester).await.unwrap().len(), 1);
    let catalog = app.state.services.shop.catalog(&requester).await.unwrap();
    assert_eq!(catalog.items[0].stock, 3);
}

mod stock_properties {
    use super::*;
    use proptest::prelude::*;

    #[derive(Debug, Clone, Copy)]
    enum Step {
        Accept(usize),
        Decline(usize),
    }

    fn step() -> impl Strategy<Value = Step> {
        prop_oneof![
            (0usize..4).prop_map(Step::Accept),
            (0usize..4).prop_map(Step::Decline),
        ]
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(12))]

        #[test]
        fn stock_never_goes_negative_and_ownership_tracks_accepted_lines(
            initial in 0i32..6,
            quantities in proptest::collection::vec(1i32..4, 4),
            steps in proptest::collection::vec(step(), 1..12),
        ) {
            let rt = tokio::runtime::Runtime::new().unwrap();
            rt.block_on(async {
                let app = TestApp::new().await;
                let admin = app.admin();
                let requester = app.member();
                let item = app.seed_item("Spare battery", initial).await;
                let requests = &app.state.services.requests;

                let mut lines = Vec::new();
                for quantity in &quantities {
                    let detail = requests
                        .submit(&requester, vec![line(item.id, *quantity)])
                        .await
                        .unwrap();
                    lines.push((detail.request.id, detail.items[0].id, *quantity));
                }

                for step in steps {
                    let (index, target) = match step {
                        Step::Accept(i) => (i, RequestStatus::Accepted),
                        Step::Decline(i) => (i, RequestStatus::Declined),
                    };
                    let (request_id, item_id, _) = lines[index];
                    let before = app.stock_of(item.id).await;
                    let result = requests
                        .change_status(&admin, request_id, target, Some(item_id))
                        .await;
                    if let Err(e) = result {
                        assert_matches!(e, ServiceError::InsufficientStock(_));
                        assert_eq!(app.stock_of(item.id).await, before);
                    }
                    assert!(app.stock_of(item.id).await >= 0);
                }

                let mut accepted_quantity = 0;
                let mut accepted_lines = 0;
                for (request_id, _, quantity) in &lines {
                    let items = app.line_items(*request_id).await;
                    if items[0].status == RequestStatus::Accepted {
                        accepted_quantity += quantity;
                        accepted_lines += 1;
                    }
                }
                assert_eq!(app.stock_of(item.id).await, initial - accepted_quantity);
                assert_eq!(app.holdings(requester.user_id).await.len(), accepted_lines);
            });
        }
    }
}
