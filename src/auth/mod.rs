//! Identity forwarded by the upstream identity provider.
//!
//! The provider authenticates the caller and forwards the verified identity in headers;
//! this module only parses it into an [`Actor`] that is passed explicitly to services.

pub mod permissions;

pub use permissions::consts;

use crate::errors::ServiceError;
use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use std::collections::BTreeSet;
use uuid::Uuid;

pub const USER_ID_HEADER: &str = "x-user-id";
pub const ORGANIZATION_ID_HEADER: &str = "x-organization-id";
pub const PERMISSIONS_HEADER: &str = "x-permissions";

/// Capabilities granted to the acting user
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PermissionSet(BTreeSet<String>);

impl PermissionSet {
    pub fn new<I, S>(permissions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(permissions.into_iter().map(Into::into).collect())
    }

    /// Parses a comma separated list, ignoring blanks.
    pub fn parse(raw: &str) -> Self {
        Self::new(
            raw.split(',')
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .map(str::to_string),
        )
    }

    /// `*` grants everything; `resource:*` grants every action on that resource.
    pub fn allows(&self, permission: &str) -> bool {
        if self.0.contains(permission) || self.0.contains(permissions::Actions::ALL) {
            return true;
        }
        permission
            .split_once(':')
            .map(|(resource, _)| {
                self.0
                    .contains(&format!("{}:{}", resource, permissions::Actions::ALL))
            })
            .unwrap_or(false)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

/// The verified caller of an action
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub user_id: Uuid,
    pub organization_id: Uuid,
    pub permissions: PermissionSet,
}

impl Actor {
    pub fn new(user_id: Uuid, organization_id: Uuid, permissions: PermissionSet) -> Self {
        Self {
            user_id,
            organization_id,
            permissions,
        }
    }

    pub fn has_permission(&self, permission: &str) -> bool {
        self.permissions.allows(permission)
    }

    /// Fails with `Forbidden` unless the actor holds `permission`.
    pub fn require(&self, permission: &str) -> Result<(), ServiceError> {
        if self.has_permission(permission) {
            Ok(())
        } else {
            Err(ServiceError::Forbidden(format!(
                "missing permission {}",
                permission
            )))
        }
    }

    pub fn can_manage_requests(&self) -> bool {
        self.has_permission(consts::REQUESTS_MANAGE)
    }

    pub fn can_manage_tickets(&self) -> bool {
        self.has_permission(consts::TICKETS_MANAGE)
    }

    pub fn belongs_to(&self, organization_id: Uuid) -> bool {
        self.organization_id == organization_id
    }
}

fn header_uuid(parts: &Parts, name: &str) -> Result<Uuid, ServiceError> {
    let raw = parts
        .headers
        .get(name)
        .ok_or_else(|| ServiceError::Unauthorized(format!("missing {} header", name)))?
        .to_str()
        .map_err(|_| ServiceError::Unauthorized(format!("unreadable {} header", name)))?;

    Uuid::parse_str(raw.trim())
        .map_err(|_| ServiceError::Unauthorized(format!("malformed {} header", name)))
}

#[async_trait]
impl<S> FromRequestParts<S> for Actor
where
    S: Send + Sync,
{
    type Rejection = ServiceError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user_id = header_uuid(parts, USER_ID_HEADER)?;
        let organization_id = header_uuid(parts, ORGANIZATION_ID_HEADER)?;
        let permissions = parts
            .headers
            .get(PERMISSIONS_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(PermissionSet::parse)
            .unwrap_or_default();

        Ok(Actor::new(user_id, organization_id, permissions))
    }
}
