//! Integration tests for the order service.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p order-service-integration-tests
//! ```
//!
//! No database or upstream services are needed: the service runs against the
//! in-memory doubles from `order_service::testing`.
//!
//! # Test Categories
//!
//! - `order_lifecycle` - Orchestrator and guard behavior through `OrderService`
//! - `http_api` - The full router, including error bodies and request IDs

use axum::Router;
use axum::body::Body;
use axum::http::{HeaderMap, Method, Request, StatusCode, header};
use secrecy::SecretString;
use serde_json::{Value, json};
use tower::ServiceExt;

use order_service::models::AuthenticatedIdentity;
use order_service::services::OrderService;
use order_service::services::auth::TokenVerifier;
use order_service::state::AppState;
use order_service::testing::{
    InMemoryOrderStore, StaticCatalog, StaticIdentityProvider, sign_token,
};
use order_service::upstream::{CatalogProduct, UserProfile};
use order_service_core::{Money, ProductId, Role, UserId};

/// Shared secret used to sign every test token.
pub const TEST_SECRET: &str = "kT9#mQ2$vL8@xR4!pW6^nZ1&cF3*hJ7%";

/// Order service wired to the in-memory doubles.
pub type TestService = OrderService<StaticIdentityProvider, StaticCatalog, InMemoryOrderStore>;

/// Application state wired to the in-memory doubles.
pub type TestState = AppState<StaticIdentityProvider, StaticCatalog, InMemoryOrderStore>;

/// A service plus handles on each of its doubles.
pub struct TestContext {
    pub users: StaticIdentityProvider,
    pub catalog: StaticCatalog,
    pub store: InMemoryOrderStore,
    pub state: TestState,
}

impl TestContext {
    /// Wire a fresh store with the given upstream doubles.
    #[must_use]
    pub fn new(users: StaticIdentityProvider, catalog: StaticCatalog) -> Self {
        let store = InMemoryOrderStore::new();
        let service = OrderService::new(users.clone(), catalog.clone(), store.clone());
        let verifier = TokenVerifier::new(SecretString::from(TEST_SECRET.to_string()));

        Self {
            users,
            catalog,
            store,
            state: AppState::new(service, verifier),
        }
    }

    /// The order service under test.
    #[must_use]
    pub fn service(&self) -> &TestService {
        self.state.orders()
    }

    /// The complete HTTP application.
    #[must_use]
    pub fn app(&self) -> Router {
        order_service::app(self.state.clone())
    }
}

/// A user service profile for `id`.
#[must_use]
pub fn profile(id: &str) -> UserProfile {
    UserProfile {
        id: UserId::new(id),
        name: format!("User {id}"),
        email: format!("{id}@example.com"),
    }
}

/// A catalog product. `price` is a decimal string such as `"10.0"`.
///
/// # Panics
///
/// Panics if `price` is not a valid non-negative decimal.
#[must_use]
pub fn product(id: &str, price: &str, stock: i64) -> CatalogProduct {
    CatalogProduct {
        id: ProductId::new(id),
        name: format!("Product {id}"),
        price: price.parse::<Money>().unwrap_or_else(|e| panic!("bad test price {price}: {e}")),
        stock,
    }
}

/// A request-scoped identity.
#[must_use]
pub fn identity(id: &str, role: Role) -> AuthenticatedIdentity {
    AuthenticatedIdentity {
        id: UserId::new(id),
        role,
    }
}

/// A signed token for a regular user.
#[must_use]
pub fn user_token(id: &str) -> String {
    sign_token(TEST_SECRET, &json!({ "id": id, "role": "user" }))
}

/// A signed token for an administrator.
#[must_use]
pub fn admin_token(id: &str) -> String {
    sign_token(TEST_SECRET, &json!({ "id": id, "role": "admin" }))
}

/// Response parts of a test request.
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    /// Parsed JSON body, or `Value::Null` for empty or non-JSON bodies.
    pub body: Value,
}

/// Send one request through `app`.
///
/// # Panics
///
/// Panics if the request cannot be built or the body cannot be read.
pub async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> TestResponse {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string())),
        None => builder.body(Body::empty()),
    }
    .unwrap_or_else(|e| panic!("invalid test request: {e}"));

    let response = app
        .clone()
        .oneshot(request)
        .await
        .unwrap_or_else(|e| match e {});

    let status = response.status();
    let headers = response.headers().clone();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap_or_else(|e| panic!("unreadable response body: {e}"));

    TestResponse {
        status,
        headers,
        body: serde_json::from_slice(&bytes).unwrap_or(Value::Null),
    }
}
