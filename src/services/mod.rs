//! Service layer: the ledgers and transition rules the commands are built from, plus the
//! per-area services the HTTP handlers call with an authenticated [`crate::auth::Actor`].

// Building blocks used inside command transactions
pub mod item_transition;
pub mod ownership_ledger;
pub mod request_status;
pub mod stock_ledger;

// Actor-facing services
pub mod equipment_requests;
pub mod shop;
pub mod tickets;

pub use equipment_requests::EquipmentRequestService;
pub use shop::{NewShopItem, ShopCatalog, ShopService};
pub use tickets::{NewTicket, TicketService};
