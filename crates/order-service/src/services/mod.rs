//! Business logic services.
//!
//! # Services
//!
//! - `auth` - Bearer token verification and role checks
//! - `orders` - Order creation and guarded store operations

pub mod auth;
pub mod orders;

pub use orders::{OrderError, OrderService, Resource};
