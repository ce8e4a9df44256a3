//! Database migration commands.
//!
//! # Usage
//!
//! ```bash
//! # Apply pending migrations
//! order-cli migrate
//!
//! # List migrations and whether each has been applied
//! order-cli migrate --status
//! ```
//!
//! # Environment Variables
//!
//! - `DATABASE_URL` - `PostgreSQL` connection string, or
//! - `DB_HOST`, `DB_USER`, `DB_PASS`, `DB_NAME` (and optionally `DB_PORT`)
//!
//! # Migration Files
//!
//! `crates/order-service/migrations/`, embedded at compile time.

use std::collections::HashSet;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::migrate::{Migrate, MigrateError, Migrator};
use thiserror::Error;

use order_service::config::{ConfigError, ServiceConfig};

static MIGRATOR: Migrator = sqlx::migrate!("../order-service/migrations");

/// Errors that can occur while migrating.
#[derive(Debug, Error)]
pub enum MigrationError {
    /// Database location could not be resolved.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Database connection error.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Migration failed.
    #[error("Migration error: {0}")]
    Migration(#[from] MigrateError),
}

async fn connect() -> Result<PgPool, MigrationError> {
    let database_url = ServiceConfig::database_url_from_env()?;

    tracing::info!("Connecting to order database...");
    Ok(PgPool::connect(database_url.expose_secret()).await?)
}

/// Apply all pending migrations.
///
/// # Errors
///
/// Returns an error if the database cannot be reached or a migration fails.
pub async fn run() -> Result<(), MigrationError> {
    let pool = connect().await?;

    tracing::info!("Running order service migrations...");
    MIGRATOR.run(&pool).await?;

    tracing::info!("Order service migrations complete!");
    Ok(())
}

/// Log every embedded migration and whether it has been applied.
///
/// # Errors
///
/// Returns an error if the database cannot be reached.
pub async fn status() -> Result<(), MigrationError> {
    let pool = connect().await?;
    let mut conn = pool.acquire().await?;

    conn.ensure_migrations_table().await?;
    let applied: HashSet<i64> = conn
        .list_applied_migrations()
        .await?
        .into_iter()
        .map(|m| m.version)
        .collect();

    for migration in MIGRATOR.iter() {
        let state = if applied.contains(&migration.version) {
            "applied"
        } else {
            "pending"
        };
        tracing::info!(
            version = migration.version,
            description = %migration.description,
            state,
            "Migration"
        );
    }

    Ok(())
}
