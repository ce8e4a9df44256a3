//! Order repository for database operations.
//!
//! Queries are checked at runtime (`query_as` + `FromRow`) so the crate builds
//! without a live database.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::instrument;

use order_service_core::{Money, OrderId, OrderStatus, ProductId, UserId};

use super::{OrderStore, RepositoryError};
use crate::models::{Order, OrderSnapshot};

/// Raw `orders` row. `status` is text in the database.
#[derive(Debug, sqlx::FromRow)]
struct OrderRow {
    id: OrderId,
    user_id: UserId,
    user_name: String,
    user_email: String,
    product_id: ProductId,
    product_name: String,
    product_price: Money,
    quantity: i32,
    total_price: Money,
    status: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<OrderRow> for Order {
    type Error = RepositoryError;

    fn try_from(row: OrderRow) -> Result<Self, Self::Error> {
        let status = row.status.parse::<OrderStatus>().map_err(|e| {
            RepositoryError::DataCorruption(format!("order {}: {e}", row.id))
        })?;

        Ok(Self {
            id: row.id,
            user_id: row.user_id,
            user_name: row.user_name,
            user_email: row.user_email,
            product_id: row.product_id,
            product_name: row.product_name,
            product_price: row.product_price,
            quantity: row.quantity,
            total_price: row.total_price,
            status,
            created_at: row.created_at,
        })
    }
}

/// `PostgreSQL`-backed [`OrderStore`].
#[derive(Debug, Clone)]
pub struct OrderRepository {
    pool: PgPool,
}

impl OrderRepository {
    /// Create a new order repository.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl OrderStore for OrderRepository {
    #[instrument(
        skip(self, snapshot),
        fields(user_id = %snapshot.user_id, product_id = %snapshot.product_id)
    )]
    async fn insert(&self, snapshot: &OrderSnapshot) -> Result<Order, RepositoryError> {
        let row = sqlx::query_as::<_, OrderRow>(
            r"
            INSERT INTO orders (
                user_id, user_name, user_email,
                product_id, product_name, product_price,
                quantity, total_price, status
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING id, user_id, user_name, user_email,
                      product_id, product_name, product_price,
                      quantity, total_price, status, created_at
            ",
        )
        .bind(&snapshot.user_id)
        .bind(&snapshot.user_name)
        .bind(&snapshot.user_email)
        .bind(&snapshot.product_id)
        .bind(&snapshot.product_name)
        .bind(snapshot.product_price)
        .bind(snapshot.quantity)
        .bind(snapshot.total_price)
        .bind(OrderStatus::Created.as_str())
        .fetch_one(&self.pool)
        .await?;

        Order::try_from(row)
    }

    #[instrument(skip(self), fields(user_id = %user_id))]
    async fn list_by_user(&self, user_id: &UserId) -> Result<Vec<Order>, RepositoryError> {
        let rows = sqlx::query_as::<_, OrderRow>(
            r"
            SELECT id, user_id, user_name, user_email,
                   product_id, product_name, product_price,
                   quantity, total_price, status, created_at
            FROM orders
            WHERE user_id = $1
            ORDER BY created_at DESC, id DESC
            ",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Order::try_from).collect()
    }

    #[instrument(skip(self))]
    async fn get_by_id(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        let row = sqlx::query_as::<_, OrderRow>(
            r"
            SELECT id, user_id, user_name, user_email,
                   product_id, product_name, product_price,
                   quantity, total_price, status, created_at
            FROM orders
            WHERE id = $1
            ",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Order::try_from).transpose()
    }

    #[instrument(skip(self))]
    async fn update_status(
        &self,
        id: OrderId,
        status: OrderStatus,
    ) -> Result<Option<Order>, RepositoryError> {
        let row = sqlx::query_as::<_, OrderRow>(
            r"
            UPDATE orders
            SET status = $1
            WHERE id = $2
            RETURNING id, user_id, user_name, user_email,
                      product_id, product_name, product_price,
                      quantity, total_price, status, created_at
            ",
        )
        .bind(status.as_str())
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Order::try_from).transpose()
    }

    #[instrument(skip(self))]
    async fn delete(&self, id: OrderId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM orders WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn health_check(&self) -> Result<(), RepositoryError> {
        sqlx::query("SELECT 1").fetch_one(&self.pool).await?;
        Ok(())
    }
}
