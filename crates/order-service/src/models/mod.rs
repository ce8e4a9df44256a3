//! Domain models for the order service.
//!
//! - [`order`] - Persisted order snapshots and the candidate row handed to the store
//! - [`identity`] - Request-scoped caller identity and bearer credential

pub mod identity;
pub mod order;

pub use identity::{AuthenticatedIdentity, BearerToken};
pub use order::{Order, OrderSnapshot};
