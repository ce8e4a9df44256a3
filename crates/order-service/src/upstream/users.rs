//! User service client.

use std::time::Duration;

use tracing::instrument;
use url::Url;

use order_service_core::UserId;

use super::queries::{CurrentUser, current_user};
use super::{GraphQLTransport, IdentityProvider, UpstreamError, UserProfile};
use crate::models::BearerToken;

const SERVICE: &str = "user-service";

/// Resolves the caller's profile by forwarding their bearer token.
#[derive(Debug, Clone)]
pub struct UserServiceClient {
    transport: GraphQLTransport,
}

impl UserServiceClient {
    /// Create a client for the user service's GraphQL endpoint.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(endpoint: Url, timeout: Duration) -> Result<Self, UpstreamError> {
        Ok(Self {
            transport: GraphQLTransport::new(SERVICE, endpoint, timeout)?,
        })
    }
}

impl IdentityProvider for UserServiceClient {
    #[instrument(skip_all, fields(service = SERVICE))]
    async fn fetch_profile(&self, token: &BearerToken) -> Result<Option<UserProfile>, UpstreamError> {
        let data = self
            .transport
            .execute::<CurrentUser>(current_user::Variables, Some(token))
            .await?;

        Ok(data.me.map(|me| UserProfile {
            id: UserId::new(me.id),
            name: me.name,
            email: me.email,
        }))
    }
}
