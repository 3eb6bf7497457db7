use crate::{
    commands::Command,
    config::BulkTransitionMode,
    db::DbPool,
    entities::{item_in_request, request, RequestStatus},
    errors::ServiceError,
    events::{Event, EventSender},
    metrics::{INSUFFICIENT_STOCK_REJECTIONS, ITEM_TRANSITIONS},
    services::{
        item_transition::{apply_transition, TransitionEffects, TransitionOutcome},
        request_status::{load_line_items, recompute_request_status, Recomputed},
    },
};
use chrono::Utc;
use sea_orm::{
    ColumnTrait, ConnectionTrait, DatabaseTransaction, EntityTrait, QueryFilter, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

/// Moves one line item, or every line item of a request, to `target`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeRequestStatusCommand {
    pub organization_id: Uuid,
    pub request_id: Uuid,
    pub target: RequestStatus,
    /// `None` applies the change to the whole request
    pub item_in_request_id: Option<Uuid>,
    #[serde(default)]
    pub mode: BulkTransitionMode,
}

#[derive(Debug, Clone)]
pub enum StatusChange {
    Applied {
        request: request::Model,
        items: Vec<item_in_request::Model>,
        transitioned: usize,
    },
    /// Everything addressed was already at the target status.
    AlreadySet {
        request_id: Uuid,
        status: RequestStatus,
    },
}

/// One line item moved, kept for the events published after commit
#[derive(Debug, Clone)]
struct Moved {
    item: item_in_request::Model,
    previous: RequestStatus,
    effects: TransitionEffects,
}

/// What a run left committed, plus the error that stopped a partial batch
#[derive(Debug, Default)]
struct BatchRun {
    recomputed: Option<Recomputed>,
    moved: Vec<Moved>,
    failure: Option<ServiceError>,
}

impl BatchRun {
    fn committed(recomputed: Recomputed, moved: Vec<Moved>) -> Self {
        Self {
            recomputed: Some(recomputed),
            moved,
            failure: None,
        }
    }
}

fn db_err(context: &'static str) -> impl Fn(sea_orm::DbErr) -> ServiceError {
    move |e| {
        error!(error = %e, "{}", context);
        ServiceError::DatabaseError(e)
    }
}

impl ChangeRequestStatusCommand {
    async fn load_request<C: ConnectionTrait>(&self, conn: &C) -> Result<request::Model, ServiceError> {
        request::Entity::find_by_id(self.request_id)
            .filter(request::Column::OrganizationId.eq(self.organization_id))
            .one(conn)
            .await
            .map_err(db_err("Failed to load request"))?
            .ok_or_else(|| ServiceError::NotFound(format!("Request {} not found", self.request_id)))
    }

    async fn transition_one(
        &self,
        txn: &DatabaseTransaction,
        item: item_in_request::Model,
        requester_id: Uuid,
    ) -> Result<Option<Moved>, ServiceError> {
        let outcome = apply_transition(txn, item, requester_id, self.target, Utc::now())
            .await
            .map_err(|e| {
                if matches!(e, ServiceError::InsufficientStock(_)) {
                    INSUFFICIENT_STOCK_REJECTIONS.inc();
                }
                e
            })?;

        Ok(match outcome {
            TransitionOutcome::Applied {
                item,
                previous,
                effects,
            } => Some(Moved {
                item,
                previous,
                effects,
            }),
            TransitionOutcome::AlreadySet(_) => None,
        })
    }

    async fn find_line_item<C: ConnectionTrait>(
        &self,
        conn: &C,
        request_id: Uuid,
        item_in_request_id: Uuid,
    ) -> Result<item_in_request::Model, ServiceError> {
        item_in_request::Entity::find_by_id(item_in_request_id)
            .filter(item_in_request::Column::RequestId.eq(request_id))
            .one(conn)
            .await
            .map_err(db_err("Failed to load line item"))?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Item in request {} not found", item_in_request_id))
            })
    }

    async fn change_single_item(
        &self,
        db: &DbPool,
        item_in_request_id: Uuid,
    ) -> Result<BatchRun, ServiceError> {
        let txn = db
            .begin()
            .await
            .map_err(db_err("Failed to start transaction for status change"))?;

        let request = self.load_request(&txn).await?;
        let item = self
            .find_line_item(&txn, request.id, item_in_request_id)
            .await?;

        let Some(moved) = self.transition_one(&txn, item, request.requester_id).await? else {
            txn.rollback()
                .await
                .map_err(db_err("Failed to release no-op transaction"))?;
            return Ok(BatchRun::default());
        };

        let recomputed = recompute_request_status(&txn, request.id).await?;
        txn.commit()
            .await
            .map_err(db_err("Failed to commit status change"))?;

        Ok(BatchRun::committed(recomputed, vec![moved]))
    }

    /// Accepted siblings are walked back before the others are moved.
    fn batch_order(
        &self,
        mut siblings: Vec<item_in_request::Model>,
    ) -> Vec<item_in_request::Model> {
        siblings.retain(|item| item.status != self.target);
        siblings.sort_by_key(|item| item.status != RequestStatus::Accepted);
        siblings
    }

    async fn change_whole_request(&self, db: &DbPool) -> Result<BatchRun, ServiceError> {
        match self.mode {
            BulkTransitionMode::Atomic => self.run_atomic_batch(db).await,
            BulkTransitionMode::Partial => self.run_partial_batch(db).await,
        }
    }

    /// Reads the siblings and moves them inside one transaction.
    async fn run_atomic_batch(&self, db: &DbPool) -> Result<BatchRun, ServiceError> {
        let txn = db
            .begin()
            .await
            .map_err(db_err("Failed to start transaction for bulk status change"))?;

        let request = self.load_request(&txn).await?;
        let batch = self.batch_order(load_line_items(&txn, request.id).await?);
        if batch.is_empty() {
            txn.rollback()
                .await
                .map_err(db_err("Failed to release no-op transaction"))?;
            return Ok(BatchRun::default());
        }

        let mut moved = Vec::with_capacity(batch.len());
        for item in batch {
            if let Some(m) = self.transition_one(&txn, item, request.requester_id).await? {
                moved.push(m);
            }
        }

        let recomputed = recompute_request_status(&txn, request.id).await?;
        txn.commit()
            .await
            .map_err(db_err("Failed to commit bulk status change"))?;

        Ok(BatchRun::committed(recomputed, moved))
    }

    /// Each line item commits on its own. On failure the items already moved stay moved,
    /// the request status is re-derived from them, and the error is carried in the run.
    ///
    /// The up-front read only fixes the order; every line item is re-read inside its
    /// own transaction before it is moved.
    async fn run_partial_batch(&self, db: &DbPool) -> Result<BatchRun, ServiceError> {
        let request = self.load_request(db).await?;
        let planned: Vec<Uuid> = self
            .batch_order(load_line_items(db, request.id).await?)
            .into_iter()
            .map(|item| item.id)
            .collect();
        if planned.is_empty() {
            return Ok(BatchRun::default());
        }

        let mut moved = Vec::with_capacity(planned.len());
        let mut failure = None;

        for item_id in planned {
            let txn = db
                .begin()
                .await
                .map_err(db_err("Failed to start transaction for line item"))?;

            let step = match self.find_line_item(&txn, request.id, item_id).await {
                Ok(item) => self.transition_one(&txn, item, request.requester_id).await,
                Err(e) => Err(e),
            };

            match step {
                Ok(result) => {
                    txn.commit()
                        .await
                        .map_err(db_err("Failed to commit line item transition"))?;
                    moved.extend(result);
                }
                Err(e) => {
                    warn!(
                        request_id = %request.id,
                        item_in_request_id = %item_id,
                        committed = moved.len(),
                        error = %e,
                        "Bulk status change stopped part way"
                    );
                    if let Err(rollback_err) = txn.rollback().await {
                        error!(error = %rollback_err, "Failed to roll back line item transition");
                    }
                    failure = Some(e);
                    break;
                }
            }
        }

        // Re-derive from what actually committed, including when every sibling ended Declined.
        let recomputed = if moved.is_empty() {
            None
        } else {
            let txn = db
                .begin()
                .await
                .map_err(db_err("Failed to start transaction for aggregation"))?;
            let recomputed = recompute_request_status(&txn, request.id).await?;
            txn.commit()
                .await
                .map_err(db_err("Failed to commit aggregate status"))?;
            Some(recomputed)
        };

        if let (Some(_), Some(recomputed)) = (&failure, &recomputed) {
            info!(
                request_id = %request.id,
                status = %recomputed.request.status,
                "Aggregate status kept in step with partially applied batch"
            );
        }

        Ok(BatchRun {
            recomputed,
            moved,
            failure,
        })
    }

    async fn log_and_trigger_event(
        &self,
        event_sender: &EventSender,
        recomputed: &Recomputed,
        moved: &[Moved],
    ) {
        let request = &recomputed.request;
        for m in moved {
            let target_label = m.item.status.to_string();
            ITEM_TRANSITIONS
                .with_label_values(&[target_label.as_str()])
                .inc();

            event_sender
                .send_or_log(Event::RequestItemStatusChanged {
                    request_id: request.id,
                    item_in_request_id: m.item.id,
                    old_status: m.previous,
                    new_status: m.item.status,
                })
                .await;
            if m.effects.stock_delta != 0 {
                event_sender
                    .send_or_log(Event::StockAdjusted {
                        shop_item_id: m.item.shop_item_id,
                        delta: m.effects.stock_delta,
                    })
                    .await;
            }
            if m.effects.revoked.is_some() {
                event_sender
                    .send_or_log(Event::OwnershipRevoked {
                        owner_id: request.requester_id,
                        shop_item_id: m.item.shop_item_id,
                        item_in_request_id: m.item.id,
                    })
                    .await;
            }
            if m.effects.granted.is_some() {
                event_sender
                    .send_or_log(Event::OwnershipGranted {
                        owner_id: request.requester_id,
                        shop_item_id: m.item.shop_item_id,
                        item_in_request_id: m.item.id,
                    })
                    .await;
            }
        }

        if recomputed.changed() {
            event_sender
                .send_or_log(Event::RequestStatusChanged {
                    request_id: request.id,
                    old_status: recomputed.previous,
                    new_status: request.status,
                })
                .await;
        }

        info!(
            request_id = %request.id,
            target = %self.target,
            transitioned = moved.len(),
            status = %request.status,
            "Request status change applied"
        );
    }
}

#[async_trait::async_trait]
impl Command for ChangeRequestStatusCommand {
    type Result = StatusChange;

    #[instrument(skip(self, db_pool, event_sender), fields(request_id = %self.request_id, target = %self.target))]
    async fn execute(
        &self,
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
    ) -> Result<Self::Result, ServiceError> {
        let db = db_pool.as_ref();

        let run = match self.item_in_request_id {
            Some(item_id) => self.change_single_item(db, item_id).await?,
            None => self.change_whole_request(db).await?,
        };

        if let Some(recomputed) = &run.recomputed {
            self.log_and_trigger_event(&event_sender, recomputed, &run.moved)
                .await;
        }

        if let Some(e) = run.failure {
            return Err(e);
        }

        let Some(recomputed) = run.recomputed else {
            return Ok(StatusChange::AlreadySet {
                request_id: self.request_id,
                status: self.target,
            });
        };

        let items = load_line_items(db, recomputed.request.id).await?;
        Ok(StatusChange::Applied {
            request: recomputed.request,
            items,
            transitioned: run.moved.len(),
        })
    }
}
