//! Domain types returned by the upstream clients.
//!
//! These are converted from the generated GraphQL response types so the rest
//! of the service never depends on codegen output.

use order_service_core::{Money, ProductId, UserId};

/// Minimal user profile from the user service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserProfile {
    pub id: UserId,
    pub name: String,
    pub email: String,
}

/// Catalog view of a product at read time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogProduct {
    pub id: ProductId,
    pub name: String,
    /// Unit price, already converted to an exact decimal.
    pub price: Money,
    /// Units available according to the catalog. Advisory only.
    pub stock: i64,
}
