//! Stock adjustments: usage entries and order receipts.
//!
//! An adjustment is two writes against the store: move the item's stock, then
//! append a usage record describing the movement. The store offers no transaction
//! spanning both, so the adjuster pairs them with a compensating restore:
//!
//! ```text
//! spawn task, lock(item)
//!   ↓
//! 1. Re-read item, check caller's expected_qty, plan (validation, zero writes on failure)
//!   ↓
//! 2. set_stock(item, Exact(observed) -> new_qty)      timeout -> UnknownState
//!   ↓
//! 3. insert usage record (pre-generated id), retried  all attempts fail -> step 4
//!   ↓
//! 4. set_stock(item, Exact(new_qty) -> observed)      ok -> RolledBack, else PartialCommit
//! unlock(item)
//! ```
//!
//! Receiving an order claims it first (`pending -> received`, conditional) and then
//! runs steps 1-4 with an increment. If the stock movement leaves nothing committed
//! the order is reopened.
//!
//! Every adjustment runs on its own task. A caller that stops waiting (a dropped
//! HTTP request) does not interrupt the write pair or its compensation.
//!
//! Adjustments on the same item are serialized through a per-item async mutex;
//! adjustments on different items run concurrently. The conditional update in step 2
//! still protects against writers that bypass this process.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::time::error::Elapsed;
use tracing::{Instrument, error, info, instrument, warn};

use stockroom_auth::CurrentUser;
use stockroom_core::{DomainError, Expected};
use stockroom_inventory::{
    Item, ItemId, NewUsageRecord, Order, OrderId, OrderStatus, StockMovement, UsagePeriod,
    UsageRecord, plan_receipt, plan_usage,
};

use crate::store::{InventoryStore, StoreError};

/// Timeouts and retry policy for adjustments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdjusterConfig {
    /// Upper bound on every individual store call. Must be non-zero.
    pub write_timeout: Duration,
    /// Additional attempts for the usage record insert after the first one fails.
    pub record_retries: u32,
    /// Fixed pause between record insert attempts.
    pub retry_backoff: Duration,
}

impl Default for AdjusterConfig {
    fn default() -> Self {
        Self {
            write_timeout: Duration::from_millis(5_000),
            record_retries: 2,
            retry_backoff: Duration::from_millis(100),
        }
    }
}

/// Outcome of a failed adjustment. Every variant states what was committed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AdjustError {
    /// Amount out of range. Nothing was written.
    #[error("validation failed: {0}")]
    Validation(String),

    /// The named item or order does not exist.
    #[error("{0} not found")]
    NotFound(&'static str),

    /// The caller's view of the stock is stale, or another writer won the race.
    /// Nothing was written.
    #[error("stock changed concurrently: {0}")]
    Conflict(String),

    /// Reading the current state failed. Nothing was written.
    #[error("reading from the store failed, nothing written: {0}")]
    ReadFailure(String),

    /// The stock update was rejected. Nothing was written.
    #[error("stock update failed: {0}")]
    WriteFailure(String),

    /// The usage record could not be written and the stock update was undone.
    #[error("usage record not written after {attempts} attempt(s), stock restored: {reason}")]
    RolledBack { attempts: u32, reason: String },

    /// The stock update committed but neither the usage record nor the restore did.
    /// Needs manual reconciliation.
    #[error(
        "partial commit on item {item_id}: stock is {committed_qty} without a usage record: {reason}"
    )]
    PartialCommit {
        item_id: ItemId,
        committed_qty: i64,
        reason: String,
    },

    /// The stock update did not answer in time; it may or may not have committed.
    #[error("stock update on item {item_id} timed out after {timeout:?}; outcome unknown")]
    UnknownState { item_id: ItemId, timeout: Duration },

    /// The order may be marked received without its stock. Needs manual reconciliation.
    #[error("order {order_id} needs reconciliation: {reason}")]
    OrderUnresolved { order_id: OrderId, reason: String },

    /// The adjustment task ended without reporting an outcome.
    #[error("adjustment interrupted, outcome unknown: {0}")]
    Interrupted(String),
}

impl AdjustError {
    /// `true` when the store is left exactly as it was before the adjustment.
    pub fn committed_nothing(&self) -> bool {
        !matches!(
            self,
            AdjustError::PartialCommit { .. }
                | AdjustError::UnknownState { .. }
                | AdjustError::OrderUnresolved { .. }
                | AdjustError::Interrupted(_)
        )
    }
}

impl From<DomainError> for AdjustError {
    fn from(value: DomainError) -> Self {
        match value {
            DomainError::Validation(msg) | DomainError::InvalidId(msg) => {
                AdjustError::Validation(msg)
            }
            DomainError::NotFound => AdjustError::NotFound("item"),
            DomainError::Conflict(msg) => AdjustError::Conflict(msg),
        }
    }
}

/// Errors raised by the stock update before anything was committed.
fn uncommitted(err: StoreError) -> AdjustError {
    match err {
        StoreError::NotFound => AdjustError::NotFound("item"),
        StoreError::Conflict(msg) => AdjustError::Conflict(msg),
        other => AdjustError::WriteFailure(other.to_string()),
    }
}

/// One usage entry as submitted by a caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageRequest {
    pub item_id: ItemId,
    pub amount: i64,
    pub date: NaiveDate,
    pub period: UsagePeriod,
    /// Stock the caller last saw; the adjustment is refused if it moved since.
    #[serde(default)]
    pub expected_qty: Option<i64>,
}

/// A committed adjustment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdjustmentReceipt {
    pub item: Item,
    pub record: UsageRecord,
    /// How many insert attempts the usage record took (1 when nothing failed).
    pub record_attempts: u32,
}

/// A received order together with the stock movement it caused.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderReceipt {
    pub order: Order,
    #[serde(flatten)]
    pub stock: AdjustmentReceipt,
}

/// Applies stock adjustments against an [`InventoryStore`].
///
/// Cheap to clone; clones share the store and the per-item locks.
pub struct StockAdjuster<S> {
    shared: Arc<Shared<S>>,
}

impl<S> Clone for StockAdjuster<S> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

struct Shared<S> {
    store: S,
    config: AdjusterConfig,
    locks: LockRegistry,
}

impl<S: InventoryStore + 'static> StockAdjuster<S> {
    pub fn new(store: S, config: AdjusterConfig) -> Self {
        Self {
            shared: Arc::new(Shared {
                store,
                config,
                locks: LockRegistry::default(),
            }),
        }
    }

    /// Decrement an item's stock by `request.amount` and log the decrement.
    ///
    /// On `Ok` both writes are committed. Each error variant documents what state the
    /// store is left in; only `PartialCommit`, `UnknownState` and `Interrupted` need
    /// reconciliation.
    #[instrument(
        skip(self, user, request),
        fields(
            item_id = %request.item_id,
            amount = request.amount,
            period = request.period.as_str(),
            user_id = %user.user_id()
        ),
        err
    )]
    pub async fn adjust(
        &self,
        user: &CurrentUser,
        request: UsageRequest,
    ) -> Result<AdjustmentReceipt, AdjustError> {
        let shared = Arc::clone(&self.shared);
        let user = user.clone();
        run_detached(async move { shared.adjust(&user, request).await }).await
    }

    /// Mark a pending order received and add its quantity to the item's stock.
    #[instrument(skip(self, user), fields(user_id = %user.user_id()), err)]
    pub async fn receive_order(
        &self,
        user: &CurrentUser,
        order_id: OrderId,
        received_date: NaiveDate,
    ) -> Result<OrderReceipt, AdjustError> {
        let shared = Arc::clone(&self.shared);
        let user = user.clone();
        run_detached(async move { shared.receive_order(&user, order_id, received_date).await })
            .await
    }
}

/// Run `work` to completion on its own task, even if the caller stops waiting.
async fn run_detached<T>(
    work: impl Future<Output = Result<T, AdjustError>> + Send + 'static,
) -> Result<T, AdjustError>
where
    T: Send + 'static,
{
    match tokio::spawn(work.in_current_span()).await {
        Ok(outcome) => outcome,
        Err(join_error) => {
            error!(error = %join_error, "adjustment task ended without an outcome");
            Err(AdjustError::Interrupted(join_error.to_string()))
        }
    }
}

impl<S: InventoryStore> Shared<S> {
    async fn adjust(
        &self,
        user: &CurrentUser,
        request: UsageRequest,
    ) -> Result<AdjustmentReceipt, AdjustError> {
        let lease = self.locks.lease(request.item_id);
        let _held = lease.acquire().await;

        let item = self.read_item(request.item_id).await?;

        if let Some(expected) = request.expected_qty {
            if expected != item.qty_in_stock {
                warn!(expected, actual = item.qty_in_stock, "stale stock quantity; refusing adjustment");
                return Err(AdjustError::Conflict(format!(
                    "stock is now {} {}, expected {expected}; refresh and retry",
                    item.qty_in_stock, item.unit
                )));
            }
        }

        let plan = plan_usage(
            &item,
            request.amount,
            request.date,
            request.period,
            Some(user.user_id()),
        )?;

        self.apply(plan).await
    }

    async fn receive_order(
        &self,
        user: &CurrentUser,
        order_id: OrderId,
        received_date: NaiveDate,
    ) -> Result<OrderReceipt, AdjustError> {
        let placed = self.read_order(order_id).await?;

        let lease = self.locks.lease(placed.item_id);
        let _held = lease.acquire().await;

        // Receipts of the same order queue on the same item lock; the winner has
        // already flipped the status by the time the others get here.
        let order = self.read_order(order_id).await?;
        let item = self.read_item(order.item_id).await?;
        let plan = plan_receipt(&item, &order, received_date, Some(user.user_id()))?;

        let claimed = self.claim_order(order_id, received_date).await?;

        match self.apply(plan).await {
            Ok(stock) => {
                info!(
                    order_id = %order_id,
                    qty_ordered = order.qty_ordered,
                    "order received"
                );
                Ok(OrderReceipt {
                    order: claimed,
                    stock,
                })
            }
            Err(err) if err.committed_nothing() => Err(self.reopen_order(order_id, err).await),
            Err(err) => Err(err),
        }
    }

    /// Conditional stock update, the usage record, and the restore if the record fails.
    async fn apply(&self, plan: StockMovement) -> Result<AdjustmentReceipt, AdjustError> {
        let updated = match self
            .within(self.store.set_stock(
                plan.item_id,
                Expected::Exact(plan.observed_qty),
                plan.new_qty,
            ))
            .await
        {
            Err(_) => {
                error!(
                    item_id = %plan.item_id,
                    timeout = ?self.config.write_timeout,
                    "stock update timed out; outcome unknown"
                );
                return Err(AdjustError::UnknownState {
                    item_id: plan.item_id,
                    timeout: self.config.write_timeout,
                });
            }
            Ok(Err(StoreError::Conflict(msg))) => {
                warn!(error = %msg, "conditional stock update lost a race");
                return Err(AdjustError::Conflict(msg));
            }
            Ok(written) => written.map_err(uncommitted)?,
        };

        match self.insert_record(&plan.record).await {
            Ok((record, attempts)) => {
                info!(
                    item_id = %plan.item_id,
                    observed_qty = plan.observed_qty,
                    new_qty = updated.qty_in_stock,
                    update_type = record.update_type.as_str(),
                    record_id = %record.id,
                    attempts,
                    "stock movement recorded"
                );
                Ok(AdjustmentReceipt {
                    item: updated,
                    record,
                    record_attempts: attempts,
                })
            }
            Err((attempts, reason)) => {
                Err(self
                    .compensate(plan.item_id, plan.observed_qty, plan.new_qty, attempts, reason)
                    .await)
            }
        }
    }

    async fn read_item(&self, id: ItemId) -> Result<Item, AdjustError> {
        match self.within(self.store.get_item(id)).await {
            Err(_) => Err(AdjustError::ReadFailure(format!(
                "reading item {id} timed out after {:?}",
                self.config.write_timeout
            ))),
            Ok(Err(e)) => Err(AdjustError::ReadFailure(e.to_string())),
            Ok(Ok(None)) => Err(AdjustError::NotFound("item")),
            Ok(Ok(Some(item))) => Ok(item),
        }
    }

    async fn read_order(&self, id: OrderId) -> Result<Order, AdjustError> {
        match self.within(self.store.get_order(id)).await {
            Err(_) => Err(AdjustError::ReadFailure(format!(
                "reading order {id} timed out after {:?}",
                self.config.write_timeout
            ))),
            Ok(Err(e)) => Err(AdjustError::ReadFailure(e.to_string())),
            Ok(Ok(None)) => Err(AdjustError::NotFound("order")),
            Ok(Ok(Some(order))) => Ok(order),
        }
    }

    /// Flip the order to `received` unless someone else already did.
    async fn claim_order(
        &self,
        order_id: OrderId,
        received_date: NaiveDate,
    ) -> Result<Order, AdjustError> {
        let claim = self.store.set_order_status(
            order_id,
            Expected::Exact(OrderStatus::Pending),
            OrderStatus::Received,
            Some(received_date),
        );

        match self.within(claim).await {
            Ok(Ok(order)) => Ok(order),
            Ok(Err(StoreError::NotFound)) => Err(AdjustError::NotFound("order")),
            Ok(Err(StoreError::Conflict(msg))) => {
                warn!(order_id = %order_id, error = %msg, "order already claimed");
                Err(AdjustError::Conflict(msg))
            }
            Ok(Err(e)) => Err(AdjustError::WriteFailure(e.to_string())),
            Err(_) => {
                error!(order_id = %order_id, "claiming order timed out; outcome unknown");
                Err(AdjustError::OrderUnresolved {
                    order_id,
                    reason: format!(
                        "marking the order received timed out after {:?}",
                        self.config.write_timeout
                    ),
                })
            }
        }
    }

    /// Put a claimed order back to `pending` after its stock movement failed cleanly.
    async fn reopen_order(&self, order_id: OrderId, cause: AdjustError) -> AdjustError {
        let reopen = self.store.set_order_status(
            order_id,
            Expected::Exact(OrderStatus::Received),
            OrderStatus::Pending,
            None,
        );

        let reopen_error = match self.within(reopen).await {
            Ok(Ok(_)) => {
                warn!(order_id = %order_id, error = %cause, "stock not received; order reopened");
                return cause;
            }
            Ok(Err(e)) => e.to_string(),
            Err(_) => format!("reopen timed out after {:?}", self.config.write_timeout),
        };

        error!(
            order_id = %order_id,
            cause = %cause,
            reopen_error = %reopen_error,
            "order marked received without its stock"
        );
        AdjustError::OrderUnresolved {
            order_id,
            reason: format!("{cause}; reopening the order failed: {reopen_error}"),
        }
    }

    /// Insert the record, retrying on failure. Returns the attempt count either way.
    async fn insert_record(&self, record: &NewUsageRecord) -> Result<(UsageRecord, u32), (u32, String)> {
        let max_attempts = self.config.record_retries.saturating_add(1);
        let mut last_error = String::new();

        for attempt in 1..=max_attempts {
            match self.within(self.store.insert_usage_record(record.clone())).await {
                Ok(Ok(stored)) => return Ok((stored, attempt)),
                Ok(Err(e)) => last_error = e.to_string(),
                Err(_) => {
                    last_error = format!("insert timed out after {:?}", self.config.write_timeout)
                }
            }

            if attempt < max_attempts {
                warn!(attempt, max_attempts, error = %last_error, "usage record insert failed; retrying");
                tokio::time::sleep(self.config.retry_backoff).await;
            }
        }

        Err((max_attempts, last_error))
    }

    /// Undo the stock update after the usage record could not be written.
    async fn compensate(
        &self,
        item_id: ItemId,
        observed_qty: i64,
        new_qty: i64,
        attempts: u32,
        reason: String,
    ) -> AdjustError {
        let restore = self
            .within(self.store.set_stock(item_id, Expected::Exact(new_qty), observed_qty))
            .await;

        let restore_error = match restore {
            Ok(Ok(_)) => {
                warn!(attempts, error = %reason, "usage record not written; stock update rolled back");
                return AdjustError::RolledBack { attempts, reason };
            }
            Ok(Err(e)) => e.to_string(),
            Err(_) => format!("restore timed out after {:?}", self.config.write_timeout),
        };

        error!(
            item_id = %item_id,
            committed_qty = new_qty,
            record_error = %reason,
            restore_error = %restore_error,
            "partial commit: stock changed without a usage record"
        );
        AdjustError::PartialCommit {
            item_id,
            committed_qty: new_qty,
            reason: format!("record insert failed: {reason}; restore failed: {restore_error}"),
        }
    }

    async fn within<T>(
        &self,
        call: impl Future<Output = Result<T, StoreError>>,
    ) -> Result<Result<T, StoreError>, Elapsed> {
        tokio::time::timeout(self.config.write_timeout, call).await
    }
}

type ItemLock = Arc<tokio::sync::Mutex<()>>;

/// Per-item async mutexes, created on first use and dropped with their last lease.
#[derive(Default)]
struct LockRegistry {
    locks: Mutex<HashMap<ItemId, ItemLock>>,
}

impl LockRegistry {
    fn lease(&self, item_id: ItemId) -> LockLease<'_> {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        let lock = locks.entry(item_id).or_default().clone();
        LockLease {
            registry: self,
            item_id,
            lock,
        }
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.locks.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

/// A claim on one item's mutex. Dropping the last lease for an item removes its
/// entry, whether the holder finished, panicked, or was dropped while waiting.
struct LockLease<'a> {
    registry: &'a LockRegistry,
    item_id: ItemId,
    lock: ItemLock,
}

impl LockLease<'_> {
    async fn acquire(&self) -> tokio::sync::MutexGuard<'_, ()> {
        self.lock.lock().await
    }
}

impl Drop for LockLease<'_> {
    fn drop(&mut self) {
        let mut locks = self.registry.locks.lock().unwrap_or_else(PoisonError::into_inner);
        // Two references left: the registry's and this lease's.
        let last = locks
            .get(&self.item_id)
            .is_some_and(|l| Arc::ptr_eq(l, &self.lock) && Arc::strong_count(l) == 2);
        if last {
            locks.remove(&self.item_id);
        }
    }
}
