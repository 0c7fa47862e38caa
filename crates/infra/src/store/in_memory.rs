use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};

use stockroom_core::Expected;
use stockroom_inventory::dashboard;
use stockroom_inventory::{
    Brand, BrandId, Category, CategoryId, Item, ItemDetails, ItemId, ItemPage, ItemQuery,
    Location, LocationId, NewOrder, NewUsageRecord, Order, OrderId, OrderStatus, StockSummary,
    UsageRecord,
};

use super::r#trait::{InventoryStore, StoreError};

#[derive(Debug, Default)]
struct State {
    items: HashMap<ItemId, Item>,
    usage_records: Vec<UsageRecord>,
    orders: HashMap<OrderId, Order>,
    categories: Vec<Category>,
    brands: Vec<Brand>,
    locations: Vec<Location>,
}

/// In-memory inventory store.
///
/// Intended for tests/dev. Not optimized for performance. Every write is applied
/// under a single lock, so conditional updates are atomic.
#[derive(Debug, Default)]
pub struct InMemoryInventoryStore {
    state: RwLock<State>,
}

fn poisoned<T>(_: T) -> StoreError {
    StoreError::Backend("lock poisoned".to_string())
}

impl InMemoryInventoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_category(&self, name: impl Into<String>) -> Result<Category, StoreError> {
        let category = Category {
            id: CategoryId::new(),
            name: name.into(),
        };
        self.state.write().map_err(poisoned)?.categories.push(category.clone());
        Ok(category)
    }

    pub fn add_brand(&self, name: impl Into<String>) -> Result<Brand, StoreError> {
        let brand = Brand {
            id: BrandId::new(),
            name: name.into(),
        };
        self.state.write().map_err(poisoned)?.brands.push(brand.clone());
        Ok(brand)
    }

    pub fn add_location(&self, name: impl Into<String>) -> Result<Location, StoreError> {
        let location = Location {
            id: LocationId::new(),
            name: name.into(),
        };
        self.state.write().map_err(poisoned)?.locations.push(location.clone());
        Ok(location)
    }

    /// Usage records for one item, in insertion order.
    pub fn usage_records_for(&self, item_id: ItemId) -> Result<Vec<UsageRecord>, StoreError> {
        let state = self.state.read().map_err(poisoned)?;
        Ok(state
            .usage_records
            .iter()
            .filter(|r| r.item_id == item_id)
            .cloned()
            .collect())
    }
}

impl State {
    /// Items must point at existing reference rows, as the Postgres foreign keys require.
    fn check_references(&self, details: &ItemDetails) -> Result<(), StoreError> {
        if !self.categories.iter().any(|c| c.id == details.category_id) {
            return Err(StoreError::Constraint(format!(
                "unknown category {}",
                details.category_id
            )));
        }
        if !self.brands.iter().any(|b| b.id == details.brand_id) {
            return Err(StoreError::Constraint(format!("unknown brand {}", details.brand_id)));
        }
        if !self.locations.iter().any(|l| l.id == details.location_id) {
            return Err(StoreError::Constraint(format!(
                "unknown location {}",
                details.location_id
            )));
        }
        Ok(())
    }
}

fn sorted_by_name<T: Clone>(rows: &[T], name: impl Fn(&T) -> &str) -> Vec<T> {
    let mut rows = rows.to_vec();
    rows.sort_by_key(|r| name(r).to_lowercase());
    rows
}

#[async_trait]
impl InventoryStore for InMemoryInventoryStore {
    async fn get_item(&self, id: ItemId) -> Result<Option<Item>, StoreError> {
        let state = self.state.read().map_err(poisoned)?;
        Ok(state.items.get(&id).cloned())
    }

    async fn list_items(&self, query: &ItemQuery) -> Result<ItemPage, StoreError> {
        let state = self.state.read().map_err(poisoned)?;
        Ok(query.run(state.items.values()))
    }

    async fn create_item(&self, details: ItemDetails) -> Result<Item, StoreError> {
        if details.qty_in_stock < 0 {
            return Err(StoreError::Constraint("qty_in_stock must be >= 0".to_string()));
        }

        let mut state = self.state.write().map_err(poisoned)?;
        state.check_references(&details)?;

        let item = Item::from_details(ItemId::new(), details);
        state.items.insert(item.id, item.clone());
        Ok(item)
    }

    async fn update_item(&self, id: ItemId, details: ItemDetails) -> Result<Item, StoreError> {
        if details.qty_in_stock < 0 {
            return Err(StoreError::Constraint("qty_in_stock must be >= 0".to_string()));
        }

        let mut state = self.state.write().map_err(poisoned)?;
        if !state.items.contains_key(&id) {
            return Err(StoreError::NotFound);
        }
        state.check_references(&details)?;

        let item = state.items.get_mut(&id).ok_or(StoreError::NotFound)?;
        item.apply_details(details);
        Ok(item.clone())
    }

    async fn set_stock(
        &self,
        id: ItemId,
        expected: Expected<i64>,
        new_qty: i64,
    ) -> Result<Item, StoreError> {
        if new_qty < 0 {
            return Err(StoreError::Constraint("qty_in_stock must be >= 0".to_string()));
        }

        let mut state = self.state.write().map_err(poisoned)?;
        let item = state.items.get_mut(&id).ok_or(StoreError::NotFound)?;

        if !expected.matches(&item.qty_in_stock) {
            return Err(StoreError::Conflict(format!(
                "expected qty_in_stock {expected:?}, found {}",
                item.qty_in_stock
            )));
        }

        item.qty_in_stock = new_qty;
        Ok(item.clone())
    }

    async fn insert_usage_record(&self, record: NewUsageRecord) -> Result<UsageRecord, StoreError> {
        let mut state = self.state.write().map_err(poisoned)?;

        if !state.items.contains_key(&record.item_id) {
            return Err(StoreError::Constraint(format!(
                "usage record references unknown item {}",
                record.item_id
            )));
        }

        if let Some(existing) = state.usage_records.iter().find(|r| r.id == record.id) {
            let same = existing.clone();
            let created_at = same.created_at;
            if same == record.into_record(created_at) {
                return Ok(same);
            }
            return Err(StoreError::Duplicate(format!("usage record {}", same.id)));
        }

        let stored = record.into_record(Utc::now());
        state.usage_records.push(stored.clone());
        Ok(stored)
    }

    async fn list_categories(&self) -> Result<Vec<Category>, StoreError> {
        let state = self.state.read().map_err(poisoned)?;
        Ok(sorted_by_name(&state.categories, |c| &c.name))
    }

    async fn list_brands(&self) -> Result<Vec<Brand>, StoreError> {
        let state = self.state.read().map_err(poisoned)?;
        Ok(sorted_by_name(&state.brands, |b| &b.name))
    }

    async fn list_locations(&self) -> Result<Vec<Location>, StoreError> {
        let state = self.state.read().map_err(poisoned)?;
        Ok(sorted_by_name(&state.locations, |l| &l.name))
    }

    async fn create_order(&self, order: NewOrder) -> Result<Order, StoreError> {
        if order.qty_ordered <= 0 {
            return Err(StoreError::Constraint("qty_ordered must be > 0".to_string()));
        }

        let mut state = self.state.write().map_err(poisoned)?;
        if !state.items.contains_key(&order.item_id) {
            return Err(StoreError::Constraint(format!(
                "order references unknown item {}",
                order.item_id
            )));
        }

        let order = order.into_order(OrderId::new(), Utc::now());
        state.orders.insert(order.id, order.clone());
        Ok(order)
    }

    async fn get_order(&self, id: OrderId) -> Result<Option<Order>, StoreError> {
        let state = self.state.read().map_err(poisoned)?;
        Ok(state.orders.get(&id).cloned())
    }

    async fn list_orders(&self) -> Result<Vec<Order>, StoreError> {
        let state = self.state.read().map_err(poisoned)?;
        let mut orders: Vec<Order> = state.orders.values().cloned().collect();
        orders.sort_by(|a, b| {
            b.order_placed_date
                .cmp(&a.order_placed_date)
                .then_with(|| b.created_at.cmp(&a.created_at))
                .then_with(|| b.id.cmp(&a.id))
        });
        Ok(orders)
    }

    async fn set_order_status(
        &self,
        id: OrderId,
        expected: Expected<OrderStatus>,
        status: OrderStatus,
        received_date: Option<NaiveDate>,
    ) -> Result<Order, StoreError> {
        if (status == OrderStatus::Received) != received_date.is_some() {
            return Err(StoreError::Constraint(
                "received orders need a received date, pending orders none".to_string(),
            ));
        }

        let mut state = self.state.write().map_err(poisoned)?;
        let order = state.orders.get_mut(&id).ok_or(StoreError::NotFound)?;

        if !expected.matches(&order.status) {
            return Err(StoreError::Conflict(format!(
                "expected order status {expected:?}, found {}",
                order.status.as_str()
            )));
        }

        order.status = status;
        order.order_received_date = received_date;
        Ok(order.clone())
    }

    async fn stock_summary(&self) -> Result<StockSummary, StoreError> {
        let state = self.state.read().map_err(poisoned)?;
        Ok(StockSummary::from_items(state.items.values()))
    }

    async fn low_stock_items(&self, threshold: i64, limit: u32) -> Result<Vec<Item>, StoreError> {
        let state = self.state.read().map_err(poisoned)?;
        Ok(dashboard::low_stock(state.items.values(), threshold, limit))
    }

    async fn expiring_items(
        &self,
        on_or_before: NaiveDate,
        limit: u32,
    ) -> Result<Vec<Item>, StoreError> {
        let state = self.state.read().map_err(poisoned)?;
        Ok(dashboard::expiring(state.items.values(), on_or_before, limit))
    }
}
