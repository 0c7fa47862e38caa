//! `stockroom-auth`: authenticated user context.
//!
//! Roles are carried and displayed; nothing in this workspace enforces them.
//! This crate is intentionally decoupled from HTTP and storage.

pub mod claims;
pub mod jwt;
pub mod roles;
pub mod user;

pub use claims::{JwtClaims, TokenValidationError, validate_claims};
pub use jwt::{Hs256JwtValidator, JwtError, JwtValidator};
pub use roles::Role;
pub use stockroom_core::UserId;
pub use user::CurrentUser;
