//! Inventory domain module.
//!
//! This crate contains business rules for stock items, usage records and purchase
//! orders, implemented purely as deterministic domain logic (no IO, no HTTP, no storage).

pub mod dashboard;
pub mod ids;
pub mod item;
pub mod order;
pub mod query;
pub mod reference;
pub mod usage;

pub use dashboard::StockSummary;
pub use ids::{BrandId, CategoryId, ItemId, LocationId, OrderId, UsageRecordId};
pub use item::{Item, ItemDetails};
pub use order::{NewOrder, Order, OrderStatus, plan_receipt};
pub use query::{InventoryFilters, ItemPage, ItemQuery, ItemSort, Page, SortDirection, SortField};
pub use reference::{Brand, Category, Location};
pub use usage::{NewUsageRecord, StockMovement, UpdateType, UsagePeriod, UsageRecord, plan_usage};
