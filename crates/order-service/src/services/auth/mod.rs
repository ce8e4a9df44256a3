//! Authorization guard.
//!
//! Identity comes from a locally verified bearer token ([`TokenVerifier`]).
//! Reads require any identity; status changes and deletion require `admin`.
//! A missing identity is always a hard failure, never an anonymous caller.

mod error;
mod token;

pub use error::{AuthError, TokenError};
pub use token::TokenVerifier;

#[cfg(any(test, feature = "testing"))]
pub(crate) use token::{Algorithm, encode};

use order_service_core::Role;

use crate::models::AuthenticatedIdentity;

/// Require a verified identity.
///
/// # Errors
///
/// Returns `AuthError::Unauthorized` when no identity is present.
pub const fn require_identity(
    identity: Option<&AuthenticatedIdentity>,
) -> Result<&AuthenticatedIdentity, AuthError> {
    match identity {
        Some(identity) => Ok(identity),
        None => Err(AuthError::Unauthorized),
    }
}

/// True iff an identity is present and carries `role`.
#[must_use]
pub fn require_role(identity: Option<&AuthenticatedIdentity>, role: Role) -> bool {
    identity.is_some_and(|identity| identity.has_role(role))
}

/// Require an identity with the `admin` role.
///
/// # Errors
///
/// Returns `AuthError::Unauthorized` when no identity is present and
/// `AuthError::Forbidden` when the identity is not an administrator.
pub fn require_admin(
    identity: Option<&AuthenticatedIdentity>,
) -> Result<&AuthenticatedIdentity, AuthError> {
    let identity = require_identity(identity)?;
    if require_role(Some(identity), Role::Admin) {
        Ok(identity)
    } else {
        Err(AuthError::Forbidden)
    }
}

#[cfg(test)]
mod tests {
    use order_service_core::UserId;

    use super::*;

    fn identity(role: Role) -> AuthenticatedIdentity {
        AuthenticatedIdentity {
            id: UserId::new("u1"),
            role,
        }
    }

    #[test]
    fn test_require_identity() {
        assert_eq!(require_identity(None), Err(AuthError::Unauthorized));
        let user = identity(Role::User);
        assert_eq!(require_identity(Some(&user)), Ok(&user));
    }

    #[test]
    fn test_require_role() {
        let admin = identity(Role::Admin);
        let user = identity(Role::User);
        assert!(require_role(Some(&admin), Role::Admin));
        assert!(!require_role(Some(&user), Role::Admin));
        assert!(require_role(Some(&user), Role::User));
        assert!(!require_role(None, Role::User));
    }

    #[test]
    fn test_require_admin() {
        let admin = identity(Role::Admin);
        let user = identity(Role::User);
        assert_eq!(require_admin(None), Err(AuthError::Unauthorized));
        assert_eq!(require_admin(Some(&user)), Err(AuthError::Forbidden));
        assert_eq!(require_admin(Some(&admin)), Ok(&admin));
    }
}
