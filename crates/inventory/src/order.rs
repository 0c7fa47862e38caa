//! Purchase orders and the pure planning step of receiving one.
//!
//! An order is placed as `pending` and becomes `received` exactly once. Receiving
//! adds the ordered quantity to the item's stock and logs a `received` usage record.

use core::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use stockroom_core::{DomainError, DomainResult, Entity, UserId};

use crate::{Item, ItemId, NewUsageRecord, OrderId, StockMovement, UpdateType, UsageRecordId};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    Received,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Received => "received",
        }
    }
}

impl FromStr for OrderStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(OrderStatus::Pending),
            "received" => Ok(OrderStatus::Received),
            other => Err(DomainError::validation(format!("unknown order status '{other}'"))),
        }
    }
}

/// A purchase order for one item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub item_id: ItemId,
    pub qty_ordered: i64,
    pub order_placed_date: NaiveDate,
    /// Set once the order is received.
    pub order_received_date: Option<NaiveDate>,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
}

impl Entity for Order {
    type Id = OrderId;

    fn id(&self) -> OrderId {
        self.id
    }
}

/// An order that has not been placed yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewOrder {
    pub item_id: ItemId,
    pub qty_ordered: i64,
    pub order_placed_date: NaiveDate,
}

impl NewOrder {
    pub fn validated(self) -> DomainResult<Self> {
        if self.qty_ordered <= 0 {
            return Err(DomainError::validation("qty_ordered must be greater than zero"));
        }
        Ok(self)
    }

    /// The pending order as first stored.
    pub fn into_order(self, id: OrderId, created_at: DateTime<Utc>) -> Order {
        Order {
            id,
            item_id: self.item_id,
            qty_ordered: self.qty_ordered,
            order_placed_date: self.order_placed_date,
            order_received_date: None,
            status: OrderStatus::Pending,
            created_at,
        }
    }
}

/// Check that `order` can be received into `item` and plan the stock increase.
///
/// Fails with `Conflict` when the order was already received.
pub fn plan_receipt(
    item: &Item,
    order: &Order,
    received_date: NaiveDate,
    recorded_by: Option<UserId>,
) -> DomainResult<StockMovement> {
    if order.item_id != item.id {
        return Err(DomainError::validation(format!(
            "order {} is for item {}, not {}",
            order.id, order.item_id, item.id
        )));
    }
    if order.status != OrderStatus::Pending {
        return Err(DomainError::conflict(format!(
            "order {} is already {}",
            order.id,
            order.status.as_str()
        )));
    }
    if order.qty_ordered <= 0 {
        return Err(DomainError::validation("qty_ordered must be greater than zero"));
    }
    if received_date < order.order_placed_date {
        return Err(DomainError::validation(format!(
            "order cannot be received ({received_date}) before it was placed ({})",
            order.order_placed_date
        )));
    }
    let new_qty = item
        .qty_in_stock
        .checked_add(order.qty_ordered)
        .ok_or_else(|| DomainError::validation("received quantity overflows the stock count"))?;

    Ok(StockMovement {
        item_id: item.id,
        observed_qty: item.qty_in_stock,
        new_qty,
        record: NewUsageRecord {
            id: UsageRecordId::new(),
            item_id: item.id,
            qty_change: order.qty_ordered,
            update_type: UpdateType::Received,
            update_date: received_date,
            remarks: "Order received".to_string(),
            recorded_by,
        },
    })
}
