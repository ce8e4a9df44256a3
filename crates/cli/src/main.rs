//! Order service CLI - Database migrations and operational checks.
//!
//! # Usage
//!
//! ```bash
//! # Run database migrations
//! order-cli migrate
//!
//! # Show migration status
//! order-cli migrate --status
//!
//! # Validate the service environment without starting it
//! order-cli config check
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "order-cli")]
#[command(author, version, about = "Order service CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate {
        /// List migrations and their state instead of applying them
        #[arg(long)]
        status: bool,
    },
    /// Inspect service configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Load and validate configuration from the environment
    Check,
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Migrate { status: true } => commands::migrate::status().await?,
        Commands::Migrate { status: false } => commands::migrate::run().await?,
        Commands::Config { action } => match action {
            ConfigAction::Check => commands::config::check()?,
        },
    }
    Ok(())
}
