//! HTTP middleware and extractors.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (hub per request, transaction)
//! 2. `TraceLayer` (`http_request` span)
//! 3. Request ID (records into the span, echoes `x-request-id`)
//!
//! Authentication is an extractor ([`AuthContext`]), not a layer.

pub mod auth;
pub mod request_id;

pub use auth::{AuthContext, bearer_token};
pub use request_id::{REQUEST_ID_HEADER, RequestId, request_id_middleware};
