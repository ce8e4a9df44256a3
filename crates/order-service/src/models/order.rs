//! Order domain types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use order_service_core::{Money, OrderId, OrderStatus, ProductId, UserId};

/// A persisted order.
///
/// User and product fields are copied at creation time and never refreshed.
/// Only `status` changes after the row is written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    /// Server-generated order ID.
    pub id: OrderId,
    /// Owner's ID in the user service.
    pub user_id: UserId,
    /// Owner's name when the order was placed.
    pub user_name: String,
    /// Owner's email when the order was placed.
    pub user_email: String,
    /// Product ID in the product service.
    pub product_id: ProductId,
    /// Product name when the order was placed.
    pub product_name: String,
    /// Unit price when the order was placed.
    pub product_price: Money,
    /// Units ordered (always positive).
    pub quantity: i32,
    /// `quantity * product_price`, computed once at creation.
    pub total_price: Money,
    /// Lifecycle status.
    pub status: OrderStatus,
    /// When the order was created.
    pub created_at: DateTime<Utc>,
}

/// Everything needed to insert an order, as decided by the orchestrator.
///
/// The store writes these values verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderSnapshot {
    pub user_id: UserId,
    pub user_name: String,
    pub user_email: String,
    pub product_id: ProductId,
    pub product_name: String,
    pub product_price: Money,
    pub quantity: i32,
    pub total_price: Money,
}
