//! Order route handlers.
//!
//! Handlers only translate HTTP to service calls; authorization happens in
//! [`OrderService`](crate::services::OrderService).

use axum::{
    Json,
    extract::{
        Path, State,
        rejection::{JsonRejection, PathRejection},
    },
    http::StatusCode,
};
use serde::{Deserialize, Serialize};

use order_service_core::{OrderId, OrderStatus, ProductId};

use crate::db::OrderStore;
use crate::error::Result;
use crate::middleware::AuthContext;
use crate::models::Order;
use crate::state::AppState;
use crate::upstream::{CatalogProvider, IdentityProvider};

/// Body of `POST /orders`.
#[derive(Debug, Deserialize)]
pub struct CreateOrderInput {
    pub product_id: ProductId,
    pub quantity: i32,
}

/// Body of `PATCH /orders/{id}/status`.
#[derive(Debug, Deserialize)]
pub struct UpdateStatusInput {
    pub status: OrderStatus,
}

/// Response of `DELETE /orders/{id}`.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct DeleteOrderResponse {
    /// Always `true`: deleting a missing order is not an error.
    pub success: bool,
    /// Whether a row was actually removed.
    pub removed: bool,
}

/// `GET /orders/mine`
pub async fn my_orders<U, P, S>(
    State(state): State<AppState<U, P, S>>,
    auth: AuthContext,
) -> Result<Json<Vec<Order>>>
where
    U: IdentityProvider,
    P: CatalogProvider,
    S: OrderStore,
{
    let orders = state.orders().my_orders(auth.identity()).await?;
    Ok(Json(orders))
}

/// `GET /orders/{id}`: the order, or `null` if it does not exist.
pub async fn order_by_id<U, P, S>(
    State(state): State<AppState<U, P, S>>,
    auth: AuthContext,
    id: std::result::Result<Path<i32>, PathRejection>,
) -> Result<Json<Option<Order>>>
where
    U: IdentityProvider,
    P: CatalogProvider,
    S: OrderStore,
{
    let Path(id) = id?;
    let order = state
        .orders()
        .order_by_id(auth.identity(), OrderId::new(id))
        .await?;
    Ok(Json(order))
}

/// `POST /orders`
pub async fn create_order<U, P, S>(
    State(state): State<AppState<U, P, S>>,
    auth: AuthContext,
    input: std::result::Result<Json<CreateOrderInput>, JsonRejection>,
) -> Result<(StatusCode, Json<Order>)>
where
    U: IdentityProvider,
    P: CatalogProvider,
    S: OrderStore,
{
    let Json(input) = input?;
    let order = state
        .orders()
        .create_order(auth.credential(), &input.product_id, input.quantity)
        .await?;
    Ok((StatusCode::CREATED, Json(order)))
}

/// `PATCH /orders/{id}/status`
pub async fn update_order_status<U, P, S>(
    State(state): State<AppState<U, P, S>>,
    auth: AuthContext,
    id: std::result::Result<Path<i32>, PathRejection>,
    input: std::result::Result<Json<UpdateStatusInput>, JsonRejection>,
) -> Result<Json<Order>>
where
    U: IdentityProvider,
    P: CatalogProvider,
    S: OrderStore,
{
    let Path(id) = id?;
    let Json(input) = input?;
    let order = state
        .orders()
        .update_order_status(auth.identity(), OrderId::new(id), input.status)
        .await?;
    Ok(Json(order))
}

/// `DELETE /orders/{id}`
pub async fn delete_order<U, P, S>(
    State(state): State<AppState<U, P, S>>,
    auth: AuthContext,
    id: std::result::Result<Path<i32>, PathRejection>,
) -> Result<Json<DeleteOrderResponse>>
where
    U: IdentityProvider,
    P: CatalogProvider,
    S: OrderStore,
{
    let Path(id) = id?;
    let removed = state
        .orders()
        .delete_order(auth.identity(), OrderId::new(id))
        .await?;
    Ok(Json(DeleteOrderResponse {
        success: true,
        removed,
    }))
}
