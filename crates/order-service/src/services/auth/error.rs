//! Authorization error types.

use thiserror::Error;

/// Errors from the authorization guard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AuthError {
    /// No verified identity on the request.
    #[error("authentication required")]
    Unauthorized,

    /// Identity present but lacks the required role.
    #[error("insufficient permissions")]
    Forbidden,
}

/// Reasons a bearer token fails verification.
///
/// These never reach callers; [`super::TokenVerifier::authenticate`] logs them
/// and treats the request as unauthenticated.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenError {
    /// Not three base64url segments of JSON.
    #[error("malformed token: {0}")]
    Malformed(&'static str),

    /// `alg` is `none` or not an HMAC algorithm.
    #[error("unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),

    /// Signature does not match the shared secret.
    #[error("invalid signature")]
    InvalidSignature,

    /// `exp` is in the past.
    #[error("token expired")]
    Expired,

    /// `nbf` is in the future.
    #[error("token not yet valid")]
    NotYetValid,

    /// Payload is missing or mistypes a required claim.
    #[error("invalid claims: {0}")]
    InvalidClaims(String),
}
