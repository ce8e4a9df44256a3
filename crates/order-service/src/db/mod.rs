//! Database operations for the order service `PostgreSQL`.
//!
//! ## Tables
//!
//! - `orders` - Order snapshots (the only table this service owns)
//!
//! # Migrations
//!
//! Migrations are stored in `crates/order-service/migrations/` and run via:
//! ```bash
//! cargo run -p order-cli -- migrate
//! ```

pub mod orders;

use std::future::Future;
use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

use order_service_core::{OrderId, OrderStatus, UserId};

use crate::models::{Order, OrderSnapshot};

pub use orders::OrderRepository;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),
}

/// Persistence for orders.
///
/// Each method is a single atomic statement. Nothing here spans more than one
/// call, so the create flow is not wrapped in a transaction.
pub trait OrderStore: Send + Sync {
    /// Insert a new order with status `CREATED`, returning the stored row.
    ///
    /// Snapshot values are written exactly as given.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the insert fails.
    fn insert(
        &self,
        snapshot: &OrderSnapshot,
    ) -> impl Future<Output = Result<Order, RepositoryError>> + Send;

    /// All orders owned by a user, most recent first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the query fails.
    fn list_by_user(
        &self,
        user_id: &UserId,
    ) -> impl Future<Output = Result<Vec<Order>, RepositoryError>> + Send;

    /// Look up a single order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the query fails.
    fn get_by_id(
        &self,
        id: OrderId,
    ) -> impl Future<Output = Result<Option<Order>, RepositoryError>> + Send;

    /// Overwrite an order's status. Returns `None` if the order does not exist.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the update fails.
    fn update_status(
        &self,
        id: OrderId,
        status: OrderStatus,
    ) -> impl Future<Output = Result<Option<Order>, RepositoryError>> + Send;

    /// Delete an order. Returns whether a row was removed.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the delete fails.
    fn delete(&self, id: OrderId) -> impl Future<Output = Result<bool, RepositoryError>> + Send;

    /// Verify the store can serve queries. Backs the readiness probe.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the store is unreachable.
    fn health_check(&self) -> impl Future<Output = Result<(), RepositoryError>> + Send;
}

/// Create a `PostgreSQL` connection pool.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
/// * `max_connections` - Upper bound on pooled connections; callers wait when exhausted
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(
    database_url: &secrecy::SecretString,
    max_connections: u32,
) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .min_connections(1)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}
