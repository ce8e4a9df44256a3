//! In-memory doubles for the store and both upstream services.
//!
//! Compiled for this crate's tests and, with the `testing` feature, for other
//! crates in the workspace. Each double is cheaply cloneable and shares its
//! state between clones, so a test can keep a handle while the service owns
//! another.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use chrono::Utc;

use order_service_core::{Money, OrderId, OrderStatus, ProductId, UserId};

use crate::db::{OrderStore, RepositoryError};
use crate::models::{BearerToken, Order, OrderSnapshot};
use crate::services::auth::{Algorithm, encode};
use crate::upstream::{CatalogProduct, CatalogProvider, IdentityProvider, UpstreamError, UserProfile};

/// Mint an HS256 bearer token for `claims`, signed with `secret`.
#[must_use]
pub fn sign_token(secret: &str, claims: &serde_json::Value) -> String {
    encode(Algorithm::Hs256, secret, claims)
}

// =============================================================================
// InMemoryOrderStore
// =============================================================================

#[derive(Debug, Default)]
struct StoreState {
    orders: Vec<Order>,
    last_id: i32,
}

/// [`OrderStore`] backed by a vector.
#[derive(Debug, Clone, Default)]
pub struct InMemoryOrderStore {
    state: Arc<Mutex<StoreState>>,
}

impl InMemoryOrderStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored orders.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().orders.len()
    }

    /// Whether no orders are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().orders.is_empty()
    }

    /// Copy of every stored order, in insertion order.
    #[must_use]
    pub fn orders(&self) -> Vec<Order> {
        self.lock().orders.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, StoreState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl OrderStore for InMemoryOrderStore {
    async fn insert(&self, snapshot: &OrderSnapshot) -> Result<Order, RepositoryError> {
        let mut state = self.lock();
        state.last_id += 1;

        let order = Order {
            id: OrderId::new(state.last_id),
            user_id: snapshot.user_id.clone(),
            user_name: snapshot.user_name.clone(),
            user_email: snapshot.user_email.clone(),
            product_id: snapshot.product_id.clone(),
            product_name: snapshot.product_name.clone(),
            product_price: snapshot.product_price,
            quantity: snapshot.quantity,
            total_price: snapshot.total_price,
            status: OrderStatus::Created,
            created_at: Utc::now(),
        };
        state.orders.push(order.clone());
        Ok(order)
    }

    async fn list_by_user(&self, user_id: &UserId) -> Result<Vec<Order>, RepositoryError> {
        let mut orders: Vec<Order> = self
            .lock()
            .orders
            .iter()
            .filter(|order| &order.user_id == user_id)
            .cloned()
            .collect();
        orders.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.as_i32().cmp(&a.id.as_i32()))
        });
        Ok(orders)
    }

    async fn get_by_id(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        Ok(self.lock().orders.iter().find(|order| order.id == id).cloned())
    }

    async fn update_status(
        &self,
        id: OrderId,
        status: OrderStatus,
    ) -> Result<Option<Order>, RepositoryError> {
        let mut state = self.lock();
        Ok(state
            .orders
            .iter_mut()
            .find(|order| order.id == id)
            .map(|order| {
                order.status = status;
                order.clone()
            }))
    }

    async fn delete(&self, id: OrderId) -> Result<bool, RepositoryError> {
        let mut state = self.lock();
        let before = state.orders.len();
        state.orders.retain(|order| order.id != id);
        Ok(state.orders.len() < before)
    }

    async fn health_check(&self) -> Result<(), RepositoryError> {
        Ok(())
    }
}

// =============================================================================
// StaticIdentityProvider
// =============================================================================

#[derive(Debug, Default)]
struct IdentityState {
    default_profile: Option<UserProfile>,
    by_token: HashMap<String, UserProfile>,
    unavailable: bool,
    calls: AtomicUsize,
    last_token: Mutex<Option<String>>,
}

/// [`IdentityProvider`] answering from fixed profiles.
#[derive(Debug, Clone, Default)]
pub struct StaticIdentityProvider {
    state: Arc<IdentityState>,
}

impl StaticIdentityProvider {
    /// A provider that knows no one (`me` is `null`).
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// A provider that returns `profile` for any token.
    #[must_use]
    pub fn with_profile(profile: UserProfile) -> Self {
        Self {
            state: Arc::new(IdentityState {
                default_profile: Some(profile),
                ..IdentityState::default()
            }),
        }
    }

    /// A provider that resolves each listed token to its profile.
    #[must_use]
    pub fn with_tokens(entries: impl IntoIterator<Item = (String, UserProfile)>) -> Self {
        Self {
            state: Arc::new(IdentityState {
                by_token: entries.into_iter().collect(),
                ..IdentityState::default()
            }),
        }
    }

    /// A provider whose every call fails as if the service were down.
    #[must_use]
    pub fn unavailable() -> Self {
        Self {
            state: Arc::new(IdentityState {
                unavailable: true,
                ..IdentityState::default()
            }),
        }
    }

    /// Number of `fetch_profile` calls so far.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.state.calls.load(Ordering::SeqCst)
    }

    /// The token forwarded by the most recent call.
    #[must_use]
    pub fn last_token(&self) -> Option<String> {
        self.state
            .last_token
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl IdentityProvider for StaticIdentityProvider {
    async fn fetch_profile(&self, token: &BearerToken) -> Result<Option<UserProfile>, UpstreamError> {
        self.state.calls.fetch_add(1, Ordering::SeqCst);
        *self
            .state
            .last_token
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(token.expose().to_owned());

        if self.state.unavailable {
            return Err(UpstreamError::Status {
                service: "user-service",
                status: 503,
            });
        }

        Ok(self
            .state
            .by_token
            .get(token.expose())
            .or(self.state.default_profile.as_ref())
            .cloned())
    }
}

// =============================================================================
// StaticCatalog
// =============================================================================

#[derive(Debug, Default)]
struct CatalogState {
    products: Mutex<HashMap<ProductId, CatalogProduct>>,
    unavailable: bool,
    calls: AtomicUsize,
}

/// [`CatalogProvider`] answering from a mutable product map.
#[derive(Debug, Clone, Default)]
pub struct StaticCatalog {
    state: Arc<CatalogState>,
}

impl StaticCatalog {
    /// A catalog with no products.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// A catalog holding `products`.
    #[must_use]
    pub fn with_products(products: impl IntoIterator<Item = CatalogProduct>) -> Self {
        let products = products
            .into_iter()
            .map(|product| (product.id.clone(), product))
            .collect();
        Self {
            state: Arc::new(CatalogState {
                products: Mutex::new(products),
                ..CatalogState::default()
            }),
        }
    }

    /// A catalog whose every call fails as if the service were down.
    #[must_use]
    pub fn unavailable() -> Self {
        Self {
            state: Arc::new(CatalogState {
                unavailable: true,
                ..CatalogState::default()
            }),
        }
    }

    /// Change a product's price. No-op for unknown products.
    pub fn set_price(&self, id: &ProductId, price: Money) {
        if let Some(product) = self.lock().get_mut(id) {
            product.price = price;
        }
    }

    /// Change a product's stock. No-op for unknown products.
    pub fn set_stock(&self, id: &ProductId, stock: i64) {
        if let Some(product) = self.lock().get_mut(id) {
            product.stock = stock;
        }
    }

    /// Number of `fetch_product` calls so far.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.state.calls.load(Ordering::SeqCst)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<ProductId, CatalogProduct>> {
        self.state
            .products
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl CatalogProvider for StaticCatalog {
    async fn fetch_product(&self, id: &ProductId) -> Result<Option<CatalogProduct>, UpstreamError> {
        self.state.calls.fetch_add(1, Ordering::SeqCst);

        if self.state.unavailable {
            return Err(UpstreamError::Status {
                service: "product-service",
                status: 503,
            });
        }

        Ok(self.lock().get(id).cloned())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn snapshot(user: &str) -> OrderSnapshot {
        OrderSnapshot {
            user_id: UserId::new(user),
            user_name: "Ada".to_string(),
            user_email: "ada@example.com".to_string(),
            product_id: ProductId::new("p1"),
            product_name: "Widget".to_string(),
            product_price: "2.50".parse().unwrap(),
            quantity: 2,
            total_price: "5.00".parse().unwrap(),
        }
    }

    #[tokio::test]
    async fn test_in_memory_store_lists_newest_first() {
        let store = InMemoryOrderStore::new();
        let first = store.insert(&snapshot("u1")).await.unwrap();
        let second = store.insert(&snapshot("u1")).await.unwrap();
        store.insert(&snapshot("u2")).await.unwrap();

        let ids: Vec<OrderId> = store
            .list_by_user(&UserId::new("u1"))
            .await
            .unwrap()
            .into_iter()
            .map(|order| order.id)
            .collect();
        assert_eq!(ids, vec![second.id, first.id]);
        assert_eq!(store.len(), 3);
    }

    #[tokio::test]
    async fn test_in_memory_store_delete_reports_removal() {
        let store = InMemoryOrderStore::new();
        let order = store.insert(&snapshot("u1")).await.unwrap();
        assert!(store.delete(order.id).await.unwrap());
        assert!(!store.delete(order.id).await.unwrap());
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_identity_provider_records_forwarded_token() {
        let provider = StaticIdentityProvider::empty();
        let profile = provider
            .fetch_profile(&BearerToken::new("abc"))
            .await
            .unwrap();
        assert!(profile.is_none());
        assert_eq!(provider.calls(), 1);
        assert_eq!(provider.last_token().as_deref(), Some("abc"));
    }
}
