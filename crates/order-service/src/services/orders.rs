//! Order orchestration.
//!
//! `create_order` aggregates the caller's profile and the catalog product into
//! a frozen snapshot and persists it. Every other operation is a guarded
//! pass-through to the [`OrderStore`].
//!
//! Stock is checked, not reserved: two concurrent orders may both pass the
//! check against the same catalog state.

use std::fmt;

use thiserror::Error;
use tracing::{info, instrument};

use order_service_core::{OrderId, OrderStatus, ProductId};

use super::auth::{self, AuthError};
use crate::db::{OrderStore, RepositoryError};
use crate::models::{AuthenticatedIdentity, BearerToken, Order, OrderSnapshot};
use crate::upstream::{CatalogProvider, IdentityProvider, UpstreamError};

/// The entity a `NotFound` refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    User,
    Product,
    Order,
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::User => write!(f, "user"),
            Self::Product => write!(f, "product"),
            Self::Order => write!(f, "order"),
        }
    }
}

/// Errors surfaced by order operations.
#[derive(Debug, Error)]
pub enum OrderError {
    /// No verified identity or credential.
    #[error("authentication required")]
    Unauthorized,

    /// Identity lacks the required role.
    #[error("insufficient permissions")]
    Forbidden,

    /// Referenced entity does not exist.
    #[error("{0} not found")]
    NotFound(Resource),

    /// Catalog stock is below the requested quantity.
    #[error("insufficient stock: requested {requested}, available {available}")]
    InsufficientStock { requested: i32, available: i64 },

    /// Quantity is not positive, or the total does not fit.
    #[error("invalid quantity: {0}")]
    InvalidQuantity(i32),

    /// User or product service failed.
    #[error("upstream unavailable: {0}")]
    Upstream(#[from] UpstreamError),

    /// Order store failed.
    #[error("store error: {0}")]
    Store(#[from] RepositoryError),
}

impl From<AuthError> for OrderError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::Unauthorized => Self::Unauthorized,
            AuthError::Forbidden => Self::Forbidden,
        }
    }
}

/// Order operations over an identity source, a catalog and a store.
pub struct OrderService<U, P, S> {
    users: U,
    catalog: P,
    store: S,
}

impl<U, P, S> OrderService<U, P, S>
where
    U: IdentityProvider,
    P: CatalogProvider,
    S: OrderStore,
{
    /// Create a new order service.
    #[must_use]
    pub const fn new(users: U, catalog: P, store: S) -> Self {
        Self {
            users,
            catalog,
            store,
        }
    }

    /// The underlying order store.
    #[must_use]
    pub const fn store(&self) -> &S {
        &self.store
    }

    /// Create an order for the caller holding `credential`.
    ///
    /// The profile and product are fetched concurrently; the user is checked
    /// before the product. Nothing is persisted unless every check passes.
    ///
    /// # Errors
    ///
    /// - `Unauthorized` without a credential (no upstream calls are made)
    /// - `InvalidQuantity` for a non-positive quantity or an overflowing total
    /// - `NotFound(User)` / `NotFound(Product)` when an upstream has no record
    /// - `InsufficientStock` when the catalog stock is below `quantity`
    /// - `Upstream` / `Store` when a dependency fails
    #[instrument(skip(self, credential, product_id), fields(product_id = %product_id))]
    pub async fn create_order(
        &self,
        credential: Option<&BearerToken>,
        product_id: &ProductId,
        quantity: i32,
    ) -> Result<Order, OrderError> {
        let credential = credential.ok_or(OrderError::Unauthorized)?;

        let units = u32::try_from(quantity)
            .ok()
            .filter(|&units| units > 0)
            .ok_or(OrderError::InvalidQuantity(quantity))?;

        let (profile, product) = tokio::join!(
            self.users.fetch_profile(credential),
            self.catalog.fetch_product(product_id),
        );

        let user = profile?.ok_or(OrderError::NotFound(Resource::User))?;
        let product = product?.ok_or(OrderError::NotFound(Resource::Product))?;

        if product.stock < i64::from(quantity) {
            return Err(OrderError::InsufficientStock {
                requested: quantity,
                available: product.stock,
            });
        }

        let total_price = product
            .price
            .checked_mul_quantity(units)
            .ok_or(OrderError::InvalidQuantity(quantity))?;

        let snapshot = OrderSnapshot {
            user_id: user.id,
            user_name: user.name,
            user_email: user.email,
            product_id: product.id,
            product_name: product.name,
            product_price: product.price,
            quantity,
            total_price,
        };

        let order = self.store.insert(&snapshot).await?;

        info!(
            order_id = %order.id,
            user_id = %order.user_id,
            total_price = %order.total_price,
            "Order created"
        );

        Ok(order)
    }

    /// All orders of the calling user, newest first.
    ///
    /// # Errors
    ///
    /// Returns `Unauthorized` without an identity, `Store` on store failure.
    #[instrument(skip_all)]
    pub async fn my_orders(
        &self,
        identity: Option<&AuthenticatedIdentity>,
    ) -> Result<Vec<Order>, OrderError> {
        let identity = auth::require_identity(identity)?;
        Ok(self.store.list_by_user(&identity.id).await?)
    }

    /// Any order by ID. Ownership is not checked.
    ///
    /// # Errors
    ///
    /// Returns `Unauthorized` without an identity, `Store` on store failure.
    #[instrument(skip(self, identity))]
    pub async fn order_by_id(
        &self,
        identity: Option<&AuthenticatedIdentity>,
        id: OrderId,
    ) -> Result<Option<Order>, OrderError> {
        auth::require_identity(identity)?;
        Ok(self.store.get_by_id(id).await?)
    }

    /// Overwrite an order's status. Admin only.
    ///
    /// # Errors
    ///
    /// Returns `Unauthorized`/`Forbidden` from the guard, `NotFound(Order)` for
    /// an unknown ID, `Store` on store failure.
    #[instrument(skip(self, identity))]
    pub async fn update_order_status(
        &self,
        identity: Option<&AuthenticatedIdentity>,
        id: OrderId,
        status: OrderStatus,
    ) -> Result<Order, OrderError> {
        auth::require_admin(identity)?;
        let order = self
            .store
            .update_status(id, status)
            .await?
            .ok_or(OrderError::NotFound(Resource::Order))?;

        info!(order_id = %order.id, status = %order.status, "Order status updated");
        Ok(order)
    }

    /// Delete an order. Admin only.
    ///
    /// Returns whether a row was removed; deleting a missing order is not an error.
    ///
    /// # Errors
    ///
    /// Returns `Unauthorized`/`Forbidden` from the guard, `Store` on store failure.
    #[instrument(skip(self, identity))]
    pub async fn delete_order(
        &self,
        identity: Option<&AuthenticatedIdentity>,
        id: OrderId,
    ) -> Result<bool, OrderError> {
        auth::require_admin(identity)?;
        let removed = self.store.delete(id).await?;
        info!(order_id = %id, removed, "Order deleted");
        Ok(removed)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal::Decimal;

    use order_service_core::{Money, Role, UserId};

    use super::*;
    use crate::testing::{InMemoryOrderStore, StaticCatalog, StaticIdentityProvider};
    use crate::upstream::{CatalogProduct, UserProfile};

    fn profile(id: &str) -> UserProfile {
        UserProfile {
            id: UserId::new(id),
            name: format!("User {id}"),
            email: format!("{id}@example.com"),
        }
    }

    fn product(id: &str, price: &str, stock: i64) -> CatalogProduct {
        CatalogProduct {
            id: ProductId::new(id),
            name: format!("Product {id}"),
            price: price.parse::<Money>().unwrap(),
            stock,
        }
    }

    fn identity(id: &str, role: Role) -> AuthenticatedIdentity {
        AuthenticatedIdentity {
            id: UserId::new(id),
            role,
        }
    }

    fn service(
        users: StaticIdentityProvider,
        catalog: StaticCatalog,
    ) -> OrderService<StaticIdentityProvider, StaticCatalog, InMemoryOrderStore> {
        OrderService::new(users, catalog, InMemoryOrderStore::new())
    }

    #[tokio::test]
    async fn test_create_order_snapshots_upstream_data() {
        let svc = service(
            StaticIdentityProvider::with_profile(profile("u1")),
            StaticCatalog::with_products([product("p1", "10.0", 5)]),
        );
        let token = BearerToken::new("token");

        let order = svc
            .create_order(Some(&token), &ProductId::new("p1"), 3)
            .await
            .unwrap();

        assert_eq!(order.user_id, UserId::new("u1"));
        assert_eq!(order.user_email, "u1@example.com");
        assert_eq!(order.product_name, "Product p1");
        assert_eq!(order.quantity, 3);
        assert_eq!(order.total_price.amount(), Decimal::new(30, 0));
        assert_eq!(order.status, OrderStatus::Created);
    }

    #[tokio::test]
    async fn test_create_order_without_credential() {
        let users = StaticIdentityProvider::with_profile(profile("u1"));
        let catalog = StaticCatalog::with_products([product("p1", "10", 5)]);
        let svc = service(users.clone(), catalog.clone());

        let err = svc
            .create_order(None, &ProductId::new("p1"), 1)
            .await
            .unwrap_err();

        assert!(matches!(err, OrderError::Unauthorized));
        assert_eq!(users.calls(), 0);
        assert_eq!(catalog.calls(), 0);
    }

    #[tokio::test]
    async fn test_create_order_rejects_non_positive_quantity() {
        let catalog = StaticCatalog::with_products([product("p1", "10", 5)]);
        let svc = service(
            StaticIdentityProvider::with_profile(profile("u1")),
            catalog.clone(),
        );
        let token = BearerToken::new("token");

        for quantity in [0, -1] {
            let err = svc
                .create_order(Some(&token), &ProductId::new("p1"), quantity)
                .await
                .unwrap_err();
            assert!(matches!(err, OrderError::InvalidQuantity(q) if q == quantity));
        }
        assert_eq!(catalog.calls(), 0);
    }

    #[tokio::test]
    async fn test_create_order_user_checked_before_product() {
        let svc = service(StaticIdentityProvider::empty(), StaticCatalog::empty());
        let token = BearerToken::new("token");

        let err = svc
            .create_order(Some(&token), &ProductId::new("missing"), 1)
            .await
            .unwrap_err();

        assert!(matches!(err, OrderError::NotFound(Resource::User)));
    }

    #[tokio::test]
    async fn test_create_order_unknown_product() {
        let svc = service(
            StaticIdentityProvider::with_profile(profile("u1")),
            StaticCatalog::empty(),
        );
        let token = BearerToken::new("token");

        let err = svc
            .create_order(Some(&token), &ProductId::new("missing"), 1)
            .await
            .unwrap_err();

        assert!(matches!(err, OrderError::NotFound(Resource::Product)));
    }

    #[tokio::test]
    async fn test_create_order_insufficient_stock_persists_nothing() {
        let svc = service(
            StaticIdentityProvider::with_profile(profile("u1")),
            StaticCatalog::with_products([product("p1", "10", 2)]),
        );
        let token = BearerToken::new("token");

        let err = svc
            .create_order(Some(&token), &ProductId::new("p1"), 3)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            OrderError::InsufficientStock {
                requested: 3,
                available: 2
            }
        ));
        assert!(svc.store().is_empty());
    }

    #[tokio::test]
    async fn test_create_order_upstream_failure() {
        let svc = service(
            StaticIdentityProvider::unavailable(),
            StaticCatalog::with_products([product("p1", "10", 5)]),
        );
        let token = BearerToken::new("token");

        let err = svc
            .create_order(Some(&token), &ProductId::new("p1"), 1)
            .await
            .unwrap_err();

        assert!(matches!(err, OrderError::Upstream(_)));
        assert!(svc.store().is_empty());
    }

    #[tokio::test]
    async fn test_my_orders_requires_identity() {
        let svc = service(StaticIdentityProvider::empty(), StaticCatalog::empty());
        let err = svc.my_orders(None).await.unwrap_err();
        assert!(matches!(err, OrderError::Unauthorized));
    }

    #[tokio::test]
    async fn test_update_status_guard_and_not_found() {
        let svc = service(
            StaticIdentityProvider::with_profile(profile("u1")),
            StaticCatalog::with_products([product("p1", "10", 5)]),
        );
        let token = BearerToken::new("token");
        let order = svc
            .create_order(Some(&token), &ProductId::new("p1"), 1)
            .await
            .unwrap();

        let user = identity("u1", Role::User);
        let err = svc
            .update_order_status(Some(&user), order.id, OrderStatus::Paid)
            .await
            .unwrap_err();
        assert!(matches!(err, OrderError::Forbidden));

        let admin = identity("a1", Role::Admin);
        let updated = svc
            .update_order_status(Some(&admin), order.id, OrderStatus::Paid)
            .await
            .unwrap();
        assert_eq!(updated.status, OrderStatus::Paid);
        assert_eq!(updated.total_price, order.total_price);

        let err = svc
            .update_order_status(Some(&admin), OrderId::new(9999), OrderStatus::Paid)
            .await
            .unwrap_err();
        assert!(matches!(err, OrderError::NotFound(Resource::Order)));
    }

    #[tokio::test]
    async fn test_delete_order_reports_removal() {
        let svc = service(
            StaticIdentityProvider::with_profile(profile("u1")),
            StaticCatalog::with_products([product("p1", "10", 5)]),
        );
        let token = BearerToken::new("token");
        let order = svc
            .create_order(Some(&token), &ProductId::new("p1"), 1)
            .await
            .unwrap();

        let admin = identity("a1", Role::Admin);
        assert!(svc.delete_order(Some(&admin), order.id).await.unwrap());
        assert!(!svc.delete_order(Some(&admin), order.id).await.unwrap());

        let err = svc.delete_order(None, order.id).await.unwrap_err();
        assert!(matches!(err, OrderError::Unauthorized));
    }

    #[test]
    fn test_auth_error_conversion() {
        assert!(matches!(
            OrderError::from(AuthError::Forbidden),
            OrderError::Forbidden
        ));
        assert_eq!(
            OrderError::NotFound(Resource::Product).to_string(),
            "product not found"
        );
    }
}
