//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use crate::config::ServiceConfig;
use crate::db::OrderRepository;
use crate::services::OrderService;
use crate::services::auth::TokenVerifier;
use crate::upstream::{ProductServiceClient, UpstreamError, UserServiceClient};

/// State used by the production binary.
pub type ServiceState = AppState<UserServiceClient, ProductServiceClient, OrderRepository>;

/// Application state shared across all handlers.
///
/// Generic over the user service, the product service and the order store so
/// the router can run against in-memory doubles. Cheaply cloneable via `Arc`.
pub struct AppState<U, P, S> {
    inner: Arc<AppStateInner<U, P, S>>,
}

struct AppStateInner<U, P, S> {
    orders: OrderService<U, P, S>,
    verifier: TokenVerifier,
}

impl<U, P, S> Clone for AppState<U, P, S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<U, P, S> AppState<U, P, S> {
    /// Create application state from its parts.
    #[must_use]
    pub fn new(orders: OrderService<U, P, S>, verifier: TokenVerifier) -> Self {
        Self {
            inner: Arc::new(AppStateInner { orders, verifier }),
        }
    }

    /// Get a reference to the order service.
    #[must_use]
    pub fn orders(&self) -> &OrderService<U, P, S> {
        &self.inner.orders
    }

    /// Get a reference to the bearer token verifier.
    #[must_use]
    pub fn verifier(&self) -> &TokenVerifier {
        &self.inner.verifier
    }
}

impl ServiceState {
    /// Wire the HTTP clients and `PostgreSQL` store from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if an upstream HTTP client cannot be built.
    pub fn from_config(config: &ServiceConfig, pool: PgPool) -> Result<Self, UpstreamError> {
        let users = UserServiceClient::new(
            config.upstream.user_service_url.clone(),
            config.upstream.timeout,
        )?;
        let catalog = ProductServiceClient::new(
            config.upstream.product_service_url.clone(),
            config.upstream.timeout,
        )?;
        let store = OrderRepository::new(pool);

        Ok(Self::new(
            OrderService::new(users, catalog, store),
            TokenVerifier::new(config.jwt_secret.clone()),
        ))
    }
}
