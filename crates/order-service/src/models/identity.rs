//! Caller identity types.
//!
//! Neither type is persisted; both live for a single request.

use std::fmt;

use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;

use order_service_core::{Role, UserId};

/// Identity proven by a verified bearer token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthenticatedIdentity {
    /// User ID claim.
    pub id: UserId,
    /// Role claim.
    pub role: Role,
}

impl AuthenticatedIdentity {
    /// Whether this identity carries the given role.
    #[must_use]
    pub fn has_role(&self, role: Role) -> bool {
        self.role == role
    }
}

/// The caller's raw bearer token, kept so it can be forwarded to the user service.
#[derive(Clone)]
pub struct BearerToken(SecretString);

impl BearerToken {
    /// Wrap a raw token.
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self(SecretString::from(token.into()))
    }

    /// Expose the raw token for forwarding.
    #[must_use]
    pub fn expose(&self) -> &str {
        self.0.expose_secret()
    }
}

impl fmt::Debug for BearerToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("BearerToken([REDACTED])")
    }
}
