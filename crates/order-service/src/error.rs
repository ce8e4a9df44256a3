//! Unified error handling with Sentry integration.
//!
//! Every handler returns `Result<T, AppError>`. Errors render as
//! `{"error": {"code": "...", "message": "..."}}`; server-side failures are
//! captured to Sentry and their details are not exposed to clients.

use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use order_service_core::UserId;

use crate::services::{OrderError, Resource};

/// Application-level error type for the order service.
#[derive(Debug, Error)]
pub enum AppError {
    /// Order operation failed.
    #[error(transparent)]
    Order(#[from] OrderError),

    /// Malformed path or body.
    #[error("Bad request: {0}")]
    BadRequest(String),
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: ErrorDetail<'a>,
}

#[derive(Serialize)]
struct ErrorDetail<'a> {
    code: &'a str,
    message: String,
}

impl AppError {
    /// Stable machine-readable error code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Order(err) => match err {
                OrderError::Unauthorized => "UNAUTHORIZED",
                OrderError::Forbidden => "FORBIDDEN",
                OrderError::NotFound(_) => "NOT_FOUND",
                OrderError::InsufficientStock { .. } => "INSUFFICIENT_STOCK",
                OrderError::InvalidQuantity(_) => "INVALID_QUANTITY",
                OrderError::Upstream(_) => "UPSTREAM_UNAVAILABLE",
                OrderError::Store(_) => "STORE_ERROR",
            },
            Self::BadRequest(_) => "BAD_REQUEST",
        }
    }

    /// HTTP status for this error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Order(err) => match err {
                OrderError::Unauthorized => StatusCode::UNAUTHORIZED,
                OrderError::Forbidden => StatusCode::FORBIDDEN,
                OrderError::NotFound(_) => StatusCode::NOT_FOUND,
                OrderError::InsufficientStock { .. } => StatusCode::CONFLICT,
                OrderError::InvalidQuantity(_) => StatusCode::BAD_REQUEST,
                OrderError::Upstream(_) => StatusCode::BAD_GATEWAY,
                OrderError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }

    const fn is_server_error(&self) -> bool {
        matches!(
            self,
            Self::Order(OrderError::Upstream(_) | OrderError::Store(_))
        )
    }

    fn public_message(&self) -> String {
        match self {
            Self::Order(OrderError::Store(_)) => "Internal server error".to_string(),
            Self::Order(OrderError::Upstream(_)) => "Upstream service unavailable".to_string(),
            Self::Order(OrderError::NotFound(Resource::User)) => {
                "User not found for the supplied credential".to_string()
            }
            other => other.to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Capture server errors to Sentry
        if self.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                code = self.code(),
                sentry_event_id = %event_id,
                "Request error"
            );
        } else {
            tracing::debug!(error = %self, code = self.code(), "Request rejected");
        }

        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code(),
                message: self.public_message(),
            },
        };

        (self.status(), Json(body)).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context from a verified user ID.
///
/// Associates errors captured later in the request with the caller.
pub fn set_sentry_user(user_id: &UserId) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            ..Default::default()
        }));
    });
}
