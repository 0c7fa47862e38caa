//! Infrastructure layer: inventory stores and the stock adjustment pipeline
//! (usage entries and order receipts).

pub mod adjuster;
pub mod store;

mod integration_tests;

pub use adjuster::{
    AdjustError, AdjusterConfig, AdjustmentReceipt, OrderReceipt, StockAdjuster, UsageRequest,
};
pub use store::{InMemoryInventoryStore, InventoryStore, PostgresInventoryStore, StoreError};
