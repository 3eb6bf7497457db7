//! Per-line-item status transitions and their stock and ownership side effects.

use super::{ownership_ledger, stock_ledger};
use crate::{
    entities::{item_in_request, RequestStatus},
    errors::ServiceError,
};
use chrono::{DateTime, Utc};
use sea_orm::{ActiveModelTrait, ConnectionTrait, Set};
use tracing::{error, info, instrument};
use uuid::Uuid;

/// Side effects applied while moving one line item
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransitionEffects {
    /// Net change applied to the shop item's stock
    pub stock_delta: i32,
    /// Inventory row created on entering Accepted
    pub granted: Option<Uuid>,
    /// Inventory row removed on leaving Accepted
    pub revoked: Option<Uuid>,
}

#[derive(Debug, Clone)]
pub enum TransitionOutcome {
    Applied {
        item: item_in_request::Model,
        previous: RequestStatus,
        effects: TransitionEffects,
    },
    /// The line item was already at the target; nothing was touched.
    AlreadySet(item_in_request::Model),
}

/// Moves `item` to `target`, granting to or reclaiming from `requester_id`.
///
/// - same status: no-op, reported as [`TransitionOutcome::AlreadySet`]
/// - entering Accepted: take stock (fails with `InsufficientStock`), then grant ownership
/// - leaving Accepted: return stock, then revoke the ownership this line item granted
/// - anything else: status only
///
/// Callers run this inside a transaction so a failure leaves no partial effects.
#[instrument(skip(conn, item), fields(item_in_request_id = %item.id, from = %item.status, to = %target))]
pub async fn apply_transition<C: ConnectionTrait>(
    conn: &C,
    item: item_in_request::Model,
    requester_id: Uuid,
    target: RequestStatus,
    now: DateTime<Utc>,
) -> Result<TransitionOutcome, ServiceError> {
    let previous = item.status;
    if previous == target {
        return Ok(TransitionOutcome::AlreadySet(item));
    }

    let mut effects = TransitionEffects::default();

    if previous == RequestStatus::Accepted {
        stock_ledger::return_stock(conn, item.shop_item_id, item.quantity).await?;
        effects.stock_delta += item.quantity;
        effects.revoked =
            ownership_ledger::revoke(conn, requester_id, item.shop_item_id, Some(item.id)).await?;
    }

    if target == RequestStatus::Accepted {
        stock_ledger::take_stock(conn, item.shop_item_id, item.quantity).await?;
        effects.stock_delta -= item.quantity;
        let record =
            ownership_ledger::grant(conn, requester_id, item.shop_item_id, now, Some(item.id))
                .await?;
        effects.granted = Some(record.id);
    }

    let item_id = item.id;
    let mut active: item_in_request::ActiveModel = item.into();
    active.status = Set(target);
    active.updated_at = Set(Some(now));
    let item = active.update(conn).await.map_err(|e| {
        error!(error = %e, item_in_request_id = %item_id, "Failed to update line item status");
        ServiceError::DatabaseError(e)
    })?;

    info!(
        item_in_request_id = %item.id,
        %previous,
        status = %item.status,
        stock_delta = effects.stock_delta,
        "Line item transitioned"
    );

    Ok(TransitionOutcome::Applied {
        item,
        previous,
        effects,
    })
}
