//! Configuration checks.
//!
//! Loads the service configuration exactly as the server does, so a bad
//! deployment fails here instead of at startup.

use order_service::config::{ConfigError, ServiceConfig};

/// Validate the service environment and log the effective settings.
///
/// Secrets are never logged.
///
/// # Errors
///
/// Returns the first configuration error the server would hit.
pub fn check() -> Result<(), ConfigError> {
    let config = ServiceConfig::from_env()?;

    tracing::info!(
        listen = %config.socket_addr(),
        max_connections = config.max_connections,
        user_service = %config.upstream.user_service_url,
        product_service = %config.upstream.product_service_url,
        upstream_timeout_secs = config.upstream.timeout.as_secs(),
        sentry = config.sentry_dsn.is_some(),
        "Configuration OK"
    );

    Ok(())
}
