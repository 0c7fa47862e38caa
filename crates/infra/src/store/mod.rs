//! Inventory data store boundary.
//!
//! This module defines the persistence capability the rest of the system is
//! handed explicitly (no global client handle), plus two implementations:
//! in-memory (tests/dev) and Postgres.

pub mod in_memory;
pub mod postgres;
pub mod r#trait;

pub use in_memory::InMemoryInventoryStore;
pub use postgres::PostgresInventoryStore;
pub use r#trait::{InventoryStore, StoreError};
