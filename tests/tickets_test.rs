mod common;

use assert_matches::assert_matches;
use common::TestApp;
use supportdesk_api::{
    commands::tickets::TicketStatusChange,
    entities::TicketStatus,
    errors::ServiceError,
    services::NewTicket,
};
use uuid::Uuid;

fn printer_ticket() -> NewTicket {
    NewTicket {
        title: "Printer jams".to_string(),
        description: "Third floor printer jams on every duplex job".to_string(),
        screenshots: vec!["https://img.example.com/jam.png".to_string()],
    }
}

#[tokio::test]
async fn owner_opens_ticket_and_replies() {
    let app = TestApp::new().await;
    let owner = app.member();
    let tickets = &app.state.services.tickets;

    let detail = tickets.create(&owner, printer_ticket()).await.unwrap();
    assert_eq!(detail.ticket.status, TicketStatus::Open);
    assert_eq!(detail.ticket.owner_id, owner.user_id);
    assert_eq!(detail.screenshots.len(), 1);

    tickets
        .add_message(&owner, detail.ticket.id, "Still happening".to_string())
        .await
        .unwrap();
    tickets
        .add_message(&app.admin(), detail.ticket.id, "Technician booked".to_string())
        .await
        .unwrap();

    let loaded = tickets.get(&owner, detail.ticket.id).await.unwrap();
    let messages: Vec<_> = loaded
        .conversation
        .iter()
        .map(|m| m.message.as_str())
        .collect();
    assert_eq!(messages, vec!["Still happening", "Technician booked"]);
}

#[tokio::test]
async fn owner_may_close_but_not_reopen_or_triage() {
    let app = TestApp::new().await;
    let owner = app.member();
    let tickets = &app.state.services.tickets;
    let detail = tickets.create(&owner, printer_ticket()).await.unwrap();

    assert_matches!(
        tickets
            .change_status(&owner, detail.ticket.id, TicketStatus::InProgress)
            .await,
        Err(ServiceError::Forbidden(_))
    );

    let closed = tickets
        .change_status(&owner, detail.ticket.id, TicketStatus::Closed)
        .await
        .unwrap();
    assert_matches!(closed, TicketStatusChange::Applied(t) if t.status == TicketStatus::Closed);

    let again = tickets
        .change_status(&owner, detail.ticket.id, TicketStatus::Closed)
        .await
        .unwrap();
    assert_matches!(again, TicketStatusChange::AlreadySet(_));

    assert_matches!(
        tickets
            .change_status(&owner, detail.ticket.id, TicketStatus::Open)
            .await,
        Err(ServiceError::Forbidden(_))
    );
}

#[tokio::test]
async fn support_staff_may_set_any_status() {
    let app = TestApp::new().await;
    let staff = app.admin();
    let tickets = &app.state.services.tickets;
    let detail = tickets.create(&app.member(), printer_ticket()).await.unwrap();

    for target in [TicketStatus::InProgress, TicketStatus::OnHold, TicketStatus::Open] {
        let change = tickets
            .change_status(&staff, detail.ticket.id, target)
            .await
            .unwrap();
        assert_matches!(change, TicketStatusChange::Applied(t) if t.status == target);
    }
}

#[tokio::test]
async fn strangers_cannot_read_or_reply() {
    let app = TestApp::new().await;
    let tickets = &app.state.services.tickets;
    let detail = tickets.create(&app.member(), printer_ticket()).await.unwrap();
    let colleague = app.member();

    assert_matches!(
        tickets.get(&colleague, detail.ticket.id).await,
        Err(ServiceError::Forbidden(_))
    );
    assert_matches!(
        tickets
            .add_message(&colleague, detail.ticket.id, "me too".to_string())
            .await,
        Err(ServiceError::Forbidden(_))
    );

    let mut outsider = app.admin();
    outsider.organization_id = Uuid::new_v4();
    assert_matches!(
        tickets.get(&outsider, detail.ticket.id).await,
        Err(ServiceError::NotFound(_))
    );
}

#[tokio::test]
async fn listings_depend_on_ticket_management() {
    let app = TestApp::new().await;
    let tickets = &app.state.services.tickets;
    let alice = app.member();
    let bob = app.member();

    tickets.create(&alice, printer_ticket()).await.unwrap();
    tickets.create(&bob, printer_ticket()).await.unwrap();

    assert_eq!(tickets.list(&alice).await.unwrap().len(), 1);
    assert_eq!(tickets.list(&app.admin()).await.unwrap().len(), 2);

    tickets.create(&bob, printer_ticket()).await.unwrap();
    assert_eq!(tickets.list(&app.admin()).await.unwrap().len(), 3);
}

#[tokio::test]
async fn invalid_tickets_are_rejected() {
    let app = TestApp::new().await;
    let mut ticket = printer_ticket();
    ticket.title = String::new();

    assert_matches!(
        app.state.services.tickets.create(&app.member(), ticket).await,
        Err(ServiceError::ValidationError(_))
    );
}
