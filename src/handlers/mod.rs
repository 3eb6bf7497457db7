pub mod health;
pub mod outcome;
pub mod requests;
pub mod shop;
pub mod tickets;

use crate::{
    cache::ViewCache,
    config::BulkTransitionMode,
    db::DbPool,
    events::EventSender,
    services::{EquipmentRequestService, ShopService, TicketService},
};
use std::sync::Arc;

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer that encapsulates business logic used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub requests: Arc<EquipmentRequestService>,
    pub shop: Arc<ShopService>,
    pub tickets: Arc<TicketService>,
}

impl AppServices {
    /// Builds every service over one pool, one event channel and one view cache.
    pub fn new(
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
        views: ViewCache,
        bulk_mode: BulkTransitionMode,
    ) -> Self {
        Self {
            requests: Arc::new(EquipmentRequestService::new(
                db_pool.clone(),
                event_sender.clone(),
                views.clone(),
                bulk_mode,
            )),
            shop: Arc::new(ShopService::new(
                db_pool.clone(),
                event_sender.clone(),
                views.clone(),
            )),
            tickets: Arc::new(TicketService::new(db_pool, event_sender, views)),
        }
    }
}
