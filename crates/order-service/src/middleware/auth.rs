//! Bearer token extraction.
//!
//! [`AuthContext`] never rejects a request. Handlers pass its contents to the
//! order service, which decides whether a missing identity is an error.

use std::convert::Infallible;

use axum::{
    extract::FromRequestParts,
    http::{HeaderMap, header::AUTHORIZATION, request::Parts},
};
use tracing::Span;

use crate::error::set_sentry_user;
use crate::models::{AuthenticatedIdentity, BearerToken};
use crate::services::auth::TokenVerifier;
use crate::state::AppState;

/// Verified caller identity and the credential it came from.
///
/// Both are present only when the bearer token verified locally; a
/// malformed, expired or forged token yields an empty context.
#[derive(Debug, Clone, Default)]
pub struct AuthContext {
    identity: Option<AuthenticatedIdentity>,
    credential: Option<BearerToken>,
}

impl AuthContext {
    /// Build a context from request headers.
    #[must_use]
    pub fn from_headers(verifier: &TokenVerifier, headers: &HeaderMap) -> Self {
        let Some(token) = bearer_token(headers) else {
            return Self::default();
        };

        match verifier.authenticate(token) {
            Some(identity) => Self {
                identity: Some(identity),
                credential: Some(BearerToken::new(token)),
            },
            None => Self::default(),
        }
    }

    /// The verified identity, if any.
    #[must_use]
    pub const fn identity(&self) -> Option<&AuthenticatedIdentity> {
        self.identity.as_ref()
    }

    /// The raw credential, kept for forwarding to the user service.
    #[must_use]
    pub const fn credential(&self) -> Option<&BearerToken> {
        self.credential.as_ref()
    }
}

impl<U, P, S> FromRequestParts<AppState<U, P, S>> for AuthContext
where
    U: Send + Sync,
    P: Send + Sync,
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState<U, P, S>,
    ) -> Result<Self, Self::Rejection> {
        let context = Self::from_headers(state.verifier(), &parts.headers);

        if let Some(identity) = context.identity() {
            Span::current().record("user_id", identity.id.as_str());
            set_sentry_user(&identity.id);
        }

        Ok(context)
    }
}

/// The token from an `Authorization: Bearer <token>` header.
///
/// The scheme is matched case-insensitively.
#[must_use]
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::http::HeaderValue;
    use secrecy::SecretString;
    use serde_json::json;

    use order_service_core::{Role, UserId};

    use super::*;
    use crate::testing::sign_token;

    const SECRET: &str = "kT9#mQ2$vL8@xR4!pW6^nZ1&cF3*hJ7%";

    fn headers(authorization: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_str(authorization).unwrap());
        headers
    }

    fn verifier() -> TokenVerifier {
        TokenVerifier::new(SecretString::from(SECRET.to_string()))
    }

    #[test]
    fn test_bearer_token_parsing() {
        assert_eq!(bearer_token(&headers("Bearer abc")), Some("abc"));
        assert_eq!(bearer_token(&headers("bearer abc")), Some("abc"));
        assert_eq!(bearer_token(&headers("Basic abc")), None);
        assert_eq!(bearer_token(&headers("Bearer ")), None);
        assert_eq!(bearer_token(&headers("abc")), None);
        assert_eq!(bearer_token(&HeaderMap::new()), None);
    }

    #[test]
    fn test_context_from_valid_token() {
        let token = sign_token(SECRET, &json!({ "id": "u1", "role": "admin" }));
        let context = AuthContext::from_headers(&verifier(), &headers(&format!("Bearer {token}")));

        let identity = context.identity().unwrap();
        assert_eq!(identity.id, UserId::new("u1"));
        assert_eq!(identity.role, Role::Admin);
        assert_eq!(context.credential().unwrap().expose(), token);
    }

    #[test]
    fn test_context_from_invalid_token_is_empty() {
        let token = sign_token("some-other-secret", &json!({ "id": "u1" }));
        let context = AuthContext::from_headers(&verifier(), &headers(&format!("Bearer {token}")));

        assert!(context.identity().is_none());
        assert!(context.credential().is_none());
    }
}
