//! Order service library.
//!
//! Builds orders from the caller's profile (user service) and a catalog
//! product (product service), persists them as frozen snapshots in
//! `PostgreSQL`, and serves them over JSON HTTP routes.
//!
//! The binary in `main.rs` only loads configuration, initializes telemetry and
//! serves [`app`]; everything else lives here so it can be tested.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
pub mod upstream;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

use axum::Router;
use tower_http::trace::{DefaultOnResponse, OnResponse, TraceLayer};
use tracing::Span;

use crate::db::OrderStore;
use crate::middleware::request_id_middleware;
use crate::state::AppState;
use crate::upstream::{CatalogProvider, IdentityProvider};

/// Build the complete application: routes, request IDs, tracing and Sentry.
pub fn app<U, P, S>(state: AppState<U, P, S>) -> Router
where
    U: IdentityProvider + 'static,
    P: CatalogProvider + 'static,
    S: OrderStore + 'static,
{
    routes::routes::<U, P, S>()
        .layer(axum::middleware::from_fn(request_id_middleware))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &axum::http::Request<_>| {
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        uri = %request.uri(),
                        status = tracing::field::Empty,
                        latency_ms = tracing::field::Empty,
                        request_id = tracing::field::Empty,
                        user_id = tracing::field::Empty,
                    )
                })
                .on_response(
                    |response: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     span: &Span| {
                        span.record("status", response.status().as_u16());
                        span.record(
                            "latency_ms",
                            u64::try_from(latency.as_millis()).unwrap_or(u64::MAX),
                        );
                        DefaultOnResponse::default().on_response(response, latency, span);
                    },
                ),
        )
        .with_state(state)
        // Sentry layers (outermost for full request coverage)
        .layer(sentry_tower::NewSentryLayer::new_from_top())
        .layer(sentry_tower::SentryHttpLayer::new().enable_transaction())
}
