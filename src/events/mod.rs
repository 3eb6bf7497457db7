use crate::entities::{RequestStatus, TicketStatus};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Cloneable handle used by commands to publish domain events
#[derive(Clone, Debug)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    /// Creates a new EventSender
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Sends an event asynchronously
    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {}", e))
    }

    /// Sends an event after a commit; a closed or full channel is only logged.
    pub async fn send_or_log(&self, event: Event) {
        if let Err(e) = self.send(event).await {
            warn!(error = %e, "Domain event dropped after commit");
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    RequestSubmitted {
        request_id: Uuid,
        requester_id: Uuid,
        line_items: usize,
    },
    RequestItemStatusChanged {
        request_id: Uuid,
        item_in_request_id: Uuid,
        old_status: RequestStatus,
        new_status: RequestStatus,
    },
    RequestStatusChanged {
        request_id: Uuid,
        old_status: RequestStatus,
        new_status: RequestStatus,
    },
    StockAdjusted {
        shop_item_id: Uuid,
        delta: i32,
    },
    OwnershipGranted {
        owner_id: Uuid,
        shop_item_id: Uuid,
        item_in_request_id: Uuid,
    },
    OwnershipRevoked {
        owner_id: Uuid,
        shop_item_id: Uuid,
        item_in_request_id: Uuid,
    },
    ShopItemCreated(Uuid),
    CategoryCreated(Uuid),
    TicketCreated(Uuid),
    TicketMessageAdded {
        ticket_id: Uuid,
        author_id: Uuid,
    },
    TicketStatusChanged {
        ticket_id: Uuid,
        old_status: TicketStatus,
        new_status: TicketStatus,
    },
}

/// Drains the event channel, logging each event until every sender is dropped.
pub async fn process_events(mut rx: mpsc::Receiver<Event>) {
    info!("Starting event processing loop");

    while let Some(event) = rx.recv().await {
        match event {
            Event::RequestSubmitted {
                request_id,
                requester_id,
                line_items,
            } => info!(%request_id, %requester_id, line_items, "Equipment request submitted"),
            Event::RequestItemStatusChanged {
                request_id,
                item_in_request_id,
                old_status,
                new_status,
            } => info!(
                %request_id,
                %item_in_request_id,
                %old_status,
                %new_status,
                "Line item status changed"
            ),
            Event::RequestStatusChanged {
                request_id,
                old_status,
                new_status,
            } => info!(%request_id, %old_status, %new_status, "Request status recomputed"),
            Event::StockAdjusted {
                shop_item_id,
                delta,
            } => debug!(%shop_item_id, delta, "Stock adjusted"),
            Event::OwnershipGranted {
                owner_id,
                shop_item_id,
                item_in_request_id,
            } => info!(%owner_id, %shop_item_id, %item_in_request_id, "Ownership granted"),
            Event::OwnershipRevoked {
                owner_id,
                shop_item_id,
                item_in_request_id,
            } => info!(%owner_id, %shop_item_id, %item_in_request_id, "Ownership revoked"),
            Event::ShopItemCreated(id) => info!(shop_item_id = %id, "Shop item created"),
            Event::CategoryCreated(id) => info!(category_id = %id, "Category created"),
            Event::TicketCreated(id) => info!(ticket_id = %id, "Ticket created"),
            Event::TicketMessageAdded {
                ticket_id,
                author_id,
            } => debug!(%ticket_id, %author_id, "Ticket message added"),
            Event::TicketStatusChanged {
                ticket_id,
                old_status,
                new_status,
            } => info!(%ticket_id, %old_status, %new_status, "Ticket status changed"),
        }
    }

    info!("Event channel closed; event processing loop stopped");
}
