//! Clients for the user and product services.
//!
//! # Architecture
//!
//! - Uses `graphql-client` for type-safe GraphQL queries, `reqwest` for HTTP
//! - No caching: stock and price must reflect the catalog at order time
//! - Both clients share [`GraphQLTransport`] for request/response handling
//!
//! # Absent vs. unavailable
//!
//! A response whose `data` names the requested object as `null` is a clean
//! "not found" (`Ok(None)`). Transport failures, timeouts, non-2xx statuses,
//! unparsable bodies, and responses without any `data` are [`UpstreamError`]s.

mod products;
pub mod queries;
mod types;
mod users;

use std::future::Future;
use std::time::Duration;

use graphql_client::{GraphQLQuery, Response};
use thiserror::Error;
use tracing::debug;
use url::Url;

use order_service_core::ProductId;

use crate::models::BearerToken;

pub use products::ProductServiceClient;
pub use types::{CatalogProduct, UserProfile};
pub use users::UserServiceClient;

/// Errors talking to an upstream service.
#[derive(Debug, Error)]
pub enum UpstreamError {
    /// HTTP request failed (connect, timeout, body read).
    #[error("{service}: HTTP error: {source}")]
    Http {
        service: &'static str,
        #[source]
        source: reqwest::Error,
    },

    /// Non-success status code.
    #[error("{service}: HTTP {status}")]
    Status { service: &'static str, status: u16 },

    /// Body was not a GraphQL response.
    #[error("{service}: JSON parse error: {source}")]
    Parse {
        service: &'static str,
        #[source]
        source: serde_json::Error,
    },

    /// Response carried errors and no data.
    #[error("{service}: GraphQL errors: {}", format_graphql_errors(.errors))]
    GraphQL {
        service: &'static str,
        errors: Vec<GraphQLError>,
    },

    /// Response data violated the expected contract.
    #[error("{service}: invalid data: {reason}")]
    InvalidData {
        service: &'static str,
        reason: String,
    },
}

/// A GraphQL error returned by an upstream service.
#[derive(Debug, Clone)]
pub struct GraphQLError {
    /// Error message.
    pub message: String,
    /// Source locations in the query.
    pub locations: Vec<GraphQLErrorLocation>,
    /// Path to the error in the response.
    pub path: Vec<serde_json::Value>,
}

/// Location in a GraphQL query where an error occurred.
#[derive(Debug, Clone)]
pub struct GraphQLErrorLocation {
    /// Line number (1-indexed).
    pub line: i64,
    /// Column number (1-indexed).
    pub column: i64,
}

impl From<graphql_client::Error> for GraphQLError {
    fn from(e: graphql_client::Error) -> Self {
        Self {
            message: e.message,
            locations: e.locations.map_or_else(Vec::new, |locs| {
                locs.into_iter()
                    .map(|l| GraphQLErrorLocation {
                        line: i64::from(l.line),
                        column: i64::from(l.column),
                    })
                    .collect()
            }),
            path: e.path.map_or_else(Vec::new, |p| {
                p.into_iter()
                    .map(|fragment| match fragment {
                        graphql_client::PathFragment::Key(s) => serde_json::Value::String(s),
                        graphql_client::PathFragment::Index(i) => {
                            serde_json::Value::Number(i.into())
                        }
                    })
                    .collect()
            }),
        }
    }
}

fn format_graphql_errors(errors: &[GraphQLError]) -> String {
    if errors.is_empty() {
        return "(no error details provided)".to_string();
    }

    errors
        .iter()
        .enumerate()
        .map(|(i, e)| {
            let mut parts = Vec::new();

            if !e.message.is_empty() {
                parts.push(e.message.clone());
            }

            if !e.path.is_empty() {
                let path_str = e
                    .path
                    .iter()
                    .map(|p| match p {
                        serde_json::Value::String(s) => s.clone(),
                        other => other.to_string(),
                    })
                    .collect::<Vec<_>>()
                    .join(".");
                parts.push(format!("path: {path_str}"));
            }

            if let Some(loc) = e.locations.first() {
                parts.push(format!("at line {}:{}", loc.line, loc.column));
            }

            if parts.is_empty() {
                format!("[error {}]: (no details)", i + 1)
            } else {
                parts.join(" ")
            }
        })
        .collect::<Vec<_>>()
        .join("; ")
}

// =============================================================================
// Provider traits
// =============================================================================

/// Source of caller profiles (the user service).
pub trait IdentityProvider: Send + Sync {
    /// Resolve the profile of the caller holding `token`.
    ///
    /// The token is forwarded so the user service performs its own verification.
    /// Returns `Ok(None)` when the service answers with no profile.
    ///
    /// # Errors
    ///
    /// Returns `UpstreamError` when the service cannot be reached or answers
    /// outside the GraphQL contract.
    fn fetch_profile(
        &self,
        token: &BearerToken,
    ) -> impl Future<Output = Result<Option<UserProfile>, UpstreamError>> + Send;
}

/// Source of product data (the product service).
pub trait CatalogProvider: Send + Sync {
    /// Look up a product. No credential is forwarded; catalog reads are public.
    ///
    /// Returns `Ok(None)` when the product does not exist.
    ///
    /// # Errors
    ///
    /// Returns `UpstreamError` when the service cannot be reached or answers
    /// outside the GraphQL contract.
    fn fetch_product(
        &self,
        id: &ProductId,
    ) -> impl Future<Output = Result<Option<CatalogProduct>, UpstreamError>> + Send;
}

// =============================================================================
// GraphQLTransport
// =============================================================================

/// POSTs GraphQL operations to a single endpoint.
#[derive(Debug, Clone)]
pub(crate) struct GraphQLTransport {
    client: reqwest::Client,
    endpoint: Url,
    service: &'static str,
}

impl GraphQLTransport {
    /// Build a transport with a per-request timeout.
    pub(crate) fn new(
        service: &'static str,
        endpoint: Url,
        timeout: Duration,
    ) -> Result<Self, UpstreamError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|source| UpstreamError::Http { service, source })?;

        Ok(Self {
            client,
            endpoint,
            service,
        })
    }

    pub(crate) const fn service(&self) -> &'static str {
        self.service
    }

    /// Execute a GraphQL operation, optionally forwarding a bearer token.
    pub(crate) async fn execute<Q: GraphQLQuery>(
        &self,
        variables: Q::Variables,
        bearer: Option<&BearerToken>,
    ) -> Result<Q::ResponseData, UpstreamError>
    where
        Q::Variables: serde::Serialize,
    {
        let service = self.service;
        let request_body = Q::build_query(variables);

        let mut request = self
            .client
            .post(self.endpoint.clone())
            .header("Content-Type", "application/json")
            .json(&request_body);

        if let Some(token) = bearer {
            request = request.bearer_auth(token.expose());
        }

        let response = request
            .send()
            .await
            .map_err(|source| UpstreamError::Http { service, source })?;

        let status = response.status();

        // Get response body as text first for better error diagnostics
        let response_text = response
            .text()
            .await
            .map_err(|source| UpstreamError::Http { service, source })?;

        if !status.is_success() {
            tracing::error!(
                service,
                status = %status,
                body = %response_text.chars().take(500).collect::<String>(),
                "Upstream returned non-success status"
            );
            return Err(UpstreamError::Status {
                service,
                status: status.as_u16(),
            });
        }

        let response: Response<Q::ResponseData> = match serde_json::from_str(&response_text) {
            Ok(r) => r,
            Err(source) => {
                tracing::error!(
                    service,
                    error = %source,
                    body = %response_text.chars().take(500).collect::<String>(),
                    "Failed to parse upstream GraphQL response"
                );
                return Err(UpstreamError::Parse { service, source });
            }
        };

        let errors: Vec<GraphQLError> = response
            .errors
            .unwrap_or_default()
            .into_iter()
            .map(GraphQLError::from)
            .collect();

        match response.data {
            Some(data) => {
                // Field-level errors (e.g. the user service rejecting the token)
                // come back as `null` data; the caller decides what null means.
                if !errors.is_empty() {
                    debug!(
                        service,
                        errors = %format_graphql_errors(&errors),
                        "GraphQL errors alongside data"
                    );
                }
                Ok(data)
            }
            None => Err(UpstreamError::GraphQL { service, errors }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upstream_error_display() {
        let err = UpstreamError::Status {
            service: "user-service",
            status: 503,
        };
        assert_eq!(err.to_string(), "user-service: HTTP 503");
    }

    #[test]
    fn test_graphql_error_formatting() {
        let err = UpstreamError::GraphQL {
            service: "product-service",
            errors: vec![
                GraphQLError {
                    message: "Field not found".to_string(),
                    locations: vec![],
                    path: vec![],
                },
                GraphQLError {
                    message: "Invalid ID".to_string(),
                    locations: vec![],
                    path: vec![],
                },
            ],
        };
        assert_eq!(
            err.to_string(),
            "product-service: GraphQL errors: Field not found; Invalid ID"
        );
    }

    #[test]
    fn test_graphql_error_path_and_location() {
        let errors = vec![GraphQLError {
            message: String::new(),
            locations: vec![GraphQLErrorLocation { line: 2, column: 3 }],
            path: vec![
                serde_json::Value::String("productById".to_string()),
                serde_json::Value::Number(0.into()),
            ],
        }];
        assert_eq!(
            format_graphql_errors(&errors),
            "path: productById.0 at line 2:3"
        );
    }

    #[test]
    fn test_graphql_error_no_details() {
        let errors = vec![GraphQLError {
            message: String::new(),
            locations: vec![],
            path: vec![],
        }];
        assert_eq!(format_graphql_errors(&errors), "[error 1]: (no details)");
        assert_eq!(format_graphql_errors(&[]), "(no error details provided)");
    }
}
