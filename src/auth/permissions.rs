//! Permission names understood by the portal. The identity provider decides who holds them.

/// Permission actions
pub struct Actions;

impl Actions {
    pub const MANAGE: &'static str = "manage";
    pub const ALL: &'static str = "*";
}

/// Resource types
pub struct Resources;

impl Resources {
    pub const REQUESTS: &'static str = "requests";
    pub const SHOP: &'static str = "shop";
    pub const TICKETS: &'static str = "tickets";
}

pub mod consts {
    /// Approve or decline any equipment request and view every request in the organization
    pub const REQUESTS_MANAGE: &str = "requests:manage";
    /// Create catalog entries and adjust stock
    pub const SHOP_MANAGE: &str = "shop:manage";
    /// Triage every ticket in the organization
    pub const TICKETS_MANAGE: &str = "tickets:manage";
}
