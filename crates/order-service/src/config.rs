//! Order service configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `JWT_SECRET` - Shared secret for verifying bearer tokens (min 32 chars, high entropy)
//! - `USER_SERVICE_URL` - GraphQL endpoint of the user service
//! - `PRODUCT_SERVICE_URL` - GraphQL endpoint of the product service
//! - `DATABASE_URL` - `PostgreSQL` connection string, or all of
//!   `DB_HOST`, `DB_USER`, `DB_PASS`, `DB_NAME` to build one
//!
//! ## Optional
//! - `DB_PORT` - Database port when building the URL from parts (default: 5432)
//! - `DB_MAX_CONNECTIONS` - Connection pool size (default: 10)
//! - `HOST` - Bind address (default: 127.0.0.1)
//! - `PORT` - Listen port (default: 4003)
//! - `UPSTREAM_TIMEOUT_SECS` - Timeout for user/product service calls (default: 10)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name
//!
//! There is no fallback for `JWT_SECRET`: a missing or weak secret is a
//! startup error.
//!
//! # Secret requirements
//!
//! `JWT_SECRET` is shared with the token issuer, so the issuer's secret must
//! also pass these checks or the service will not start:
//!
//! - at least 32 characters
//! - no placeholder text (`secret`, `changeme`, `example`, ... case-insensitive)
//! - at least 3.3 bits of Shannon entropy per character
//!
//! Rotate a weak issuer secret rather than relaxing the checks; `order-cli
//! config check` reports which rule a candidate secret fails.

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;
use url::Url;

const MIN_JWT_SECRET_LENGTH: usize = 32;
const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "secret",
    "password",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "enter-",
    "put-your",
    "add-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Order service configuration.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// Maximum pooled database connections
    pub max_connections: u32,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Shared secret for bearer token signatures
    pub jwt_secret: SecretString,
    /// User and product service endpoints
    pub upstream: UpstreamConfig,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment name
    pub sentry_environment: Option<String>,
}

/// Endpoints and timeouts for the services orders are built from.
#[derive(Debug, Clone)]
pub struct UpstreamConfig {
    /// User service GraphQL endpoint
    pub user_service_url: Url,
    /// Product service GraphQL endpoint
    pub product_service_url: Url,
    /// Per-request timeout
    pub timeout: Duration,
}

impl ServiceConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if secrets fail validation (length, placeholder detection, entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    ///
    /// # Errors
    ///
    /// Same as [`ServiceConfig::from_env`].
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = Env(&lookup);

        let database_url = env.database_url()?;
        let max_connections = env.parsed_or_default("DB_MAX_CONNECTIONS", 10_u32)?;
        let host = env.parsed_or_default("HOST", IpAddr::from([127, 0, 0, 1]))?;
        let port = env.parsed_or_default("PORT", 4003_u16)?;

        let jwt_secret = env.validated_secret("JWT_SECRET")?;

        let upstream = UpstreamConfig {
            user_service_url: env.service_url("USER_SERVICE_URL")?,
            product_service_url: env.service_url("PRODUCT_SERVICE_URL")?,
            timeout: Duration::from_secs(env.parsed_or_default("UPSTREAM_TIMEOUT_SECS", 10_u64)?),
        };

        Ok(Self {
            database_url,
            max_connections,
            host,
            port,
            jwt_secret,
            upstream,
            sentry_dsn: env.optional("SENTRY_DSN"),
            sentry_environment: env.optional("SENTRY_ENVIRONMENT"),
        })
    }

    /// Resolve only the database URL, for tools that need nothing else.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if neither `DATABASE_URL` nor the full set of
    /// `DB_*` parts is available.
    pub fn database_url_from_env() -> Result<SecretString, ConfigError> {
        let _ = dotenvy::dotenv();

        Self::database_url_from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolve only the database URL from an arbitrary key lookup.
    ///
    /// # Errors
    ///
    /// Same as [`ServiceConfig::database_url_from_env`].
    pub fn database_url_from_lookup<F>(lookup: F) -> Result<SecretString, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        Env(&lookup).database_url()
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

struct Env<'a, F>(&'a F);

impl<F> Env<'_, F>
where
    F: Fn(&str) -> Option<String>,
{
    /// Get an optional, non-empty variable.
    fn optional(&self, key: &str) -> Option<String> {
        (self.0)(key).filter(|v| !v.trim().is_empty())
    }

    /// Get a required variable.
    fn required(&self, key: &str) -> Result<String, ConfigError> {
        self.optional(key)
            .ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))
    }

    /// Parse a variable, falling back to a default when unset.
    fn parsed_or_default<T>(&self, key: &str, default: T) -> Result<T, ConfigError>
    where
        T: std::str::FromStr,
        T::Err: std::fmt::Display,
    {
        self.optional(key).map_or(Ok(default), |raw| {
            raw.trim()
                .parse::<T>()
                .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
        })
    }

    /// Use `DATABASE_URL` if set, otherwise assemble one from `DB_*` parts.
    fn database_url(&self) -> Result<SecretString, ConfigError> {
        if let Some(url) = self.optional("DATABASE_URL") {
            return Ok(SecretString::from(url));
        }

        let host = self.required("DB_HOST")?;
        let user = self.required("DB_USER")?;
        let password = self.required("DB_PASS")?;
        let name = self.required("DB_NAME")?;
        let port = self.parsed_or_default("DB_PORT", 5432_u16)?;

        build_database_url(&host, port, &user, &password, &name)
            .map(SecretString::from)
            .map_err(|reason| ConfigError::InvalidEnvVar("DB_HOST".to_string(), reason))
    }

    /// Load and validate an absolute `http(s)` URL.
    fn service_url(&self, key: &str) -> Result<Url, ConfigError> {
        let raw = self.required(key)?;
        let url = Url::parse(raw.trim())
            .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))?;

        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::InvalidEnvVar(
                key.to_string(),
                format!("unsupported scheme '{}', expected http or https", url.scheme()),
            ));
        }

        Ok(url)
    }

    /// Load and validate a secret.
    fn validated_secret(&self, key: &str) -> Result<SecretString, ConfigError> {
        let value = SecretString::from(self.required(key)?);
        validate_secret_length(&value, key)?;
        validate_secret_strength(value.expose_secret(), key)?;
        Ok(value)
    }
}

/// Assemble a `postgres://` URL, percent-encoding credentials.
fn build_database_url(
    host: &str,
    port: u16,
    user: &str,
    password: &str,
    name: &str,
) -> Result<String, String> {
    let mut url = Url::parse("postgres://localhost").map_err(|e| e.to_string())?;
    url.set_host(Some(host)).map_err(|e| e.to_string())?;
    url.set_port(Some(port))
        .map_err(|()| "cannot set port".to_string())?;
    url.set_username(user)
        .map_err(|()| "cannot set username".to_string())?;
    url.set_password(Some(password))
        .map_err(|()| "cannot set password".to_string())?;
    url.set_path(name);
    Ok(url.into())
}

/// Validate that a secret meets minimum length requirements.
fn validate_secret_length(secret: &SecretString, var_name: &str) -> Result<(), ConfigError> {
    let value = secret.expose_secret();
    if value.len() < MIN_JWT_SECRET_LENGTH {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "must be at least {} characters (got {})",
                MIN_JWT_SECRET_LENGTH,
                value.len()
            ),
        ));
    }
    Ok(())
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.chars().count() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)] // Character count will never exceed f64 precision
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    // Check blocklist
    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Use a randomly generated secret."
            ),
        ));
    }

    Ok(())
}
