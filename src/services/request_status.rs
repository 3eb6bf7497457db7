//! Derives a request's aggregate status from its line items.
//!
//! `requests.status` is stored for querying but is only ever written by
//! [`recompute_request_status`].

use crate::{
    entities::{item_in_request, request, RequestStatus},
    errors::ServiceError,
};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder, Set,
};
use tracing::{debug, error};
use uuid::Uuid;

/// Aggregate status for a set of sibling line-item statuses.
///
/// First match wins:
/// 1. every item Declined -> Declined
/// 2. every item Processing -> Processing
/// 3. any item Accepted -> Accepted
/// 4. otherwise (Processing mixed with Declined) -> Processing
///
/// An empty set satisfies rule 1.
pub fn aggregate_status(statuses: &[RequestStatus]) -> RequestStatus {
    if statuses.iter().all(|s| *s == RequestStatus::Declined) {
        RequestStatus::Declined
    } else if statuses.iter().all(|s| *s == RequestStatus::Processing) {
        RequestStatus::Processing
    } else if statuses.iter().any(|s| *s == RequestStatus::Accepted) {
        RequestStatus::Accepted
    } else {
        RequestStatus::Processing
    }
}

/// Result of re-deriving a request's status
#[derive(Debug, Clone)]
pub struct Recomputed {
    pub request: request::Model,
    pub previous: RequestStatus,
}

impl Recomputed {
    pub fn changed(&self) -> bool {
        self.previous != self.request.status
    }
}

pub async fn load_line_items<C: ConnectionTrait>(
    conn: &C,
    request_id: Uuid,
) -> Result<Vec<item_in_request::Model>, ServiceError> {
    item_in_request::Entity::find()
        .filter(item_in_request::Column::RequestId.eq(request_id))
        .order_by_asc(item_in_request::Column::CreatedAt)
        .order_by_asc(item_in_request::Column::Id)
        .all(conn)
        .await
        .map_err(|e| {
            error!(error = %e, %request_id, "Failed to load line items");
            ServiceError::DatabaseError(e)
        })
}

/// Reloads the request's line items and writes the derived status back.
pub async fn recompute_request_status<C: ConnectionTrait>(
    conn: &C,
    request_id: Uuid,
) -> Result<Recomputed, ServiceError> {
    let current = request::Entity::find_by_id(request_id)
        .one(conn)
        .await
        .map_err(ServiceError::DatabaseError)?
        .ok_or_else(|| ServiceError::NotFound(format!("Request {} not found", request_id)))?;

    let statuses: Vec<RequestStatus> = load_line_items(conn, request_id)
        .await?
        .into_iter()
        .map(|item| item.status)
        .collect();

    let previous = current.status;
    let derived = aggregate_status(&statuses);

    let mut active: request::ActiveModel = current.into();
    active.status = Set(derived);
    active.updated_at = Set(Some(Utc::now()));
    let request = active.update(conn).await.map_err(|e| {
        error!(error = %e, %request_id, "Failed to store aggregate request status");
        ServiceError::DatabaseError(e)
    })?;

    debug!(%request_id, %previous, status = %derived, "Request status recomputed");
    Ok(Recomputed { request, previous })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use RequestStatus::{Accepted, Declined, Processing};

    #[rstest]
    #[case(&[Declined, Declined], Declined)]
    #[case(&[Processing, Processing], Processing)]
    #[case(&[Accepted, Declined], Accepted)]
    #[case(&[Processing, Declined], Processing)]
    #[case(&[Accepted], Accepted)]
    #[case(&[Accepted, Accepted], Accepted)]
    #[case(&[Accepted, Processing], Accepted)]
    #[case(&[Accepted, Processing, Declined], Accepted)]
    #[case(&[Declined], Declined)]
    #[case(&[Processing], Processing)]
    #[case(&[], Declined)]
    fn aggregation_precedence(#[case] statuses: &[RequestStatus], #[case] expected: RequestStatus) {
        assert_eq!(aggregate_status(statuses), expected);
    }

    #[test]
    fn aggregation_ignores_order() {
        let forward = [Processing, Declined, Accepted];
        let mut backward = forward;
        backward.reverse();
        assert_eq!(aggregate_status(&forward), aggregate_status(&backward));
    }
}
