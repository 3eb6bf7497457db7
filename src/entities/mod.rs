pub mod category;
pub mod inventory;
pub mod item_in_request;
pub mod request;
pub mod shop_item;
pub mod ticket;
pub mod ticket_conversation;
pub mod ticket_screenshot;

pub use request::RequestStatus;
pub use ticket::TicketStatus;
