//! `stockroom-core`: domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns).

pub mod concurrency;
pub mod entity;
pub mod error;
pub mod id;

pub use concurrency::Expected;
pub use entity::Entity;
pub use error::{DomainError, DomainResult};
pub use id::UserId;

#[doc(hidden)]
pub use uuid;
