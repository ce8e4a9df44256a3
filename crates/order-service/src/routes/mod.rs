//! HTTP route handlers for the order service.
//!
//! # Route Structure
//!
//! ```text
//! GET    /health               - Liveness
//! GET    /health/ready         - Readiness (store reachable)
//!
//! # Orders (bearer token in Authorization header)
//! GET    /orders/mine          - Caller's orders, newest first
//! GET    /orders/{id}          - Any order by ID, or null
//! POST   /orders               - Create an order
//! PATCH  /orders/{id}/status   - Overwrite status (admin)
//! DELETE /orders/{id}          - Delete (admin)
//! ```

pub mod orders;

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    routing::{get, patch, post},
};

use crate::db::OrderStore;
use crate::state::AppState;
use crate::upstream::{CatalogProvider, IdentityProvider};

/// Create the main router with all routes.
pub fn routes<U, P, S>() -> Router<AppState<U, P, S>>
where
    U: IdentityProvider + 'static,
    P: CatalogProvider + 'static,
    S: OrderStore + 'static,
{
    Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(readiness::<U, P, S>))
        .route("/orders", post(orders::create_order::<U, P, S>))
        .route("/orders/mine", get(orders::my_orders::<U, P, S>))
        .route(
            "/orders/{id}",
            get(orders::order_by_id::<U, P, S>).delete(orders::delete_order::<U, P, S>),
        )
        .route(
            "/orders/{id}/status",
            patch(orders::update_order_status::<U, P, S>),
        )
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Returns 503 Service Unavailable if the order store is not reachable.
async fn readiness<U, P, S>(State(state): State<AppState<U, P, S>>) -> StatusCode
where
    U: IdentityProvider,
    P: CatalogProvider,
    S: OrderStore,
{
    match state.orders().store().health_check().await {
        Ok(()) => StatusCode::OK,
        Err(e) => {
            tracing::warn!(error = %e, "Readiness check failed");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}
