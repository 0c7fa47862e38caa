use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use chrono::NaiveDate;

use stockroom_core::Expected;
use stockroom_inventory::{
    Brand, Category, Item, ItemDetails, ItemId, ItemPage, ItemQuery, Location, NewOrder,
    NewUsageRecord, Order, OrderId, OrderStatus, StockSummary, UsageRecord,
};

/// Store operation error.
///
/// These are **infrastructure errors** (storage, concurrency, constraints) as
/// opposed to domain errors (validation, invariants).
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("record not found")]
    NotFound,

    /// A conditional write found a different value than expected.
    #[error("conflict: {0}")]
    Conflict(String),

    /// A different record already exists under the same identifier.
    #[error("duplicate record: {0}")]
    Duplicate(String),

    /// The backend rejected the data (check / foreign key constraint).
    #[error("constraint violated: {0}")]
    Constraint(String),

    /// Connectivity, pool or driver failure.
    #[error("storage backend error: {0}")]
    Backend(String),
}

/// Remote tabular inventory store.
///
/// ## Write semantics
///
/// - `set_stock` is a **conditional update by identifier**: it only writes when the
///   stored quantity satisfies `expected`, and reports `Conflict` otherwise.
///   Quantities below zero are rejected with `Constraint`.
/// - `insert_usage_record` appends to an **append-only** table. Records carry a
///   caller-generated id, and re-inserting an identical record is a no-op that
///   returns the stored row, so an insert whose response was lost can be retried.
///   A *different* record under an existing id is `Duplicate`.
/// - `set_order_status` is conditional on the order's current status in the same
///   way `set_stock` is conditional on the quantity.
///
/// Implementations must be safe to share across tasks.
#[async_trait]
pub trait InventoryStore: Send + Sync {
    async fn get_item(&self, id: ItemId) -> Result<Option<Item>, StoreError>;

    async fn list_items(&self, query: &ItemQuery) -> Result<ItemPage, StoreError>;

    /// Insert a new item; `details` must already be validated.
    async fn create_item(&self, details: ItemDetails) -> Result<Item, StoreError>;

    /// Replace an item's editable fields; `details` must already be validated.
    async fn update_item(&self, id: ItemId, details: ItemDetails) -> Result<Item, StoreError>;

    /// Conditionally set an item's stock quantity, returning the updated item.
    async fn set_stock(
        &self,
        id: ItemId,
        expected: Expected<i64>,
        new_qty: i64,
    ) -> Result<Item, StoreError>;

    async fn insert_usage_record(&self, record: NewUsageRecord) -> Result<UsageRecord, StoreError>;

    async fn list_categories(&self) -> Result<Vec<Category>, StoreError>;

    async fn list_brands(&self) -> Result<Vec<Brand>, StoreError>;

    async fn list_locations(&self) -> Result<Vec<Location>, StoreError>;

    /// Place an order; `order` must already be validated. Unknown items are `Constraint`.
    async fn create_order(&self, order: NewOrder) -> Result<Order, StoreError>;

    async fn get_order(&self, id: OrderId) -> Result<Option<Order>, StoreError>;

    /// All orders, most recently placed first.
    async fn list_orders(&self) -> Result<Vec<Order>, StoreError>;

    /// Conditionally move an order to `status`, setting its received date.
    async fn set_order_status(
        &self,
        id: OrderId,
        expected: Expected<OrderStatus>,
        status: OrderStatus,
        received_date: Option<NaiveDate>,
    ) -> Result<Order, StoreError>;

    async fn stock_summary(&self) -> Result<StockSummary, StoreError>;

    /// Up to `limit` items with `qty_in_stock <= threshold`, emptiest first.
    async fn low_stock_items(&self, threshold: i64, limit: u32) -> Result<Vec<Item>, StoreError>;

    /// Up to `limit` items expiring on or before `on_or_before`, soonest first.
    async fn expiring_items(
        &self,
        on_or_before: NaiveDate,
        limit: u32,
    ) -> Result<Vec<Item>, StoreError>;
}

#[async_trait]
impl<S> InventoryStore for Arc<S>
where
    S: InventoryStore + ?Sized,
{
    async fn get_item(&self, id: ItemId) -> Result<Option<Item>, StoreError> {
        (**self).get_item(id).await
    }

    async fn list_items(&self, query: &ItemQuery) -> Result<ItemPage, StoreError> {
        (**self).list_items(query).await
    }

    async fn create_item(&self, details: ItemDetails) -> Result<Item, StoreError> {
        (**self).create_item(details).await
    }

    async fn update_item(&self, id: ItemId, details: ItemDetails) -> Result<Item, StoreError> {
        (**self).update_item(id, details).await
    }

    async fn set_stock(
        &self,
        id: ItemId,
        expected: Expected<i64>,
        new_qty: i64,
    ) -> Result<Item, StoreError> {
        (**self).set_stock(id, expected, new_qty).await
    }

    async fn insert_usage_record(&self, record: NewUsageRecord) -> Result<UsageRecord, StoreError> {
        (**self).insert_usage_record(record).await
    }

    async fn list_categories(&self) -> Result<Vec<Category>, StoreError> {
        (**self).list_categories().await
    }

    async fn list_brands(&self) -> Result<Vec<Brand>, StoreError> {
        (**self).list_brands().await
    }

    async fn list_locations(&self) -> Result<Vec<Location>, StoreError> {
        (**self).list_locations().await
    }

    async fn create_order(&self, order: NewOrder) -> Result<Order, StoreError> {
        (**self).create_order(order).await
    }

    async fn get_order(&self, id: OrderId) -> Result<Option<Order>, StoreError> {
        (**self).get_order(id).await
    }

    async fn list_orders(&self) -> Result<Vec<Order>, StoreError> {
        (**self).list_orders().await
    }

    async fn set_order_status(
        &self,
        id: OrderId,
        expected: Expected<OrderStatus>,
        status: OrderStatus,
        received_date: Option<NaiveDate>,
    ) -> Result<Order, StoreError> {
        (**self).set_order_status(id, expected, status, received_date).await
    }

    async fn stock_summary(&self) -> Result<StockSummary, StoreError> {
        (**self).stock_summary().await
    }

    async fn low_stock_items(&self, threshold: i64, limit: u32) -> Result<Vec<Item>, StoreError> {
        (**self).low_stock_items(threshold, limit).await
    }

    async fn expiring_items(
        &self,
        on_or_before: NaiveDate,
        limit: u32,
    ) -> Result<Vec<Item>, StoreError> {
        (**self).expiring_items(on_or_before, limit).await
    }
}
