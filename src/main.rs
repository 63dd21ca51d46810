//! # Leadbook Main Entry Point
//!
//! Serves the API by default; `migrate` and `seed-demo-user` run the
//! corresponding maintenance step and exit.

use anyhow::Context;
use clap::{Parser, Subcommand};
use leadbook::{config::ConfigLoader, db, seeds, server::run_server, telemetry};

#[derive(Debug, Parser)]
#[command(name = "leadbook", version, about = "Buyer lead management API")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Apply migrations and serve the HTTP API (default)
    Serve,
    /// Apply pending database migrations and exit
    Migrate,
    /// Create the demo user if it does not exist and exit
    SeedDemoUser,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Load configuration from layered env files and variables
    let config = ConfigLoader::new().load()?;
    config.validate()?;

    telemetry::init_tracing(&config)?;

    tracing::info!(profile = %config.profile, "Loaded configuration");
    if let Ok(redacted_json) = config.redacted_json() {
        tracing::debug!(config = %redacted_json, "Effective configuration");
    }

    let db = db::init_pool(&config)
        .await
        .context("initializing database connection pool")?;
    db::run_migrations(&db).await?;

    match cli.command.unwrap_or(Command::Serve) {
        Command::Migrate => Ok(()),
        Command::SeedDemoUser => {
            seeds::seed_demo_user(&db).await?;
            Ok(())
        }
        Command::Serve => {
            if config.seed_demo_user {
                seeds::seed_demo_user(&db).await?;
            }
            run_server(config, db).await
        }
    }
}
