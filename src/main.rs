//! # Tenant Notes Main Entry Point
//!
//! This is the main entry point for the notes service.

use anyhow::Context;
use clap::{Parser, Subcommand};
use tenant_notes::{
    config::ConfigLoader,
    repositories::UserRepository,
    seeds::SEED_PASSWORD,
    server::run_server,
    store::{LoadOutcome, Store},
    telemetry::init_tracing,
};

#[derive(Debug, Parser)]
#[command(name = "tenant-notes", version, about = "Multi-tenant notes service")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the HTTP API (default)
    Serve,
    /// Create the data file with the demo tenants and accounts
    Seed {
        /// Discard the existing data file first
        #[arg(long)]
        reset: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration from layered env files and variables
    let config = ConfigLoader::new()
        .load()
        .context("loading configuration")?;

    init_tracing(&config).context("initializing telemetry")?;

    tracing::info!(profile = %config.profile, "Loaded configuration");
    if let Ok(redacted_json) = config.redacted_json() {
        tracing::debug!(config = %redacted_json, "Effective configuration");
    }
    if config.uses_default_jwt_secret() {
        tracing::warn!(
            "Using the built-in development JWT secret; set NOTES_JWT_SECRET outside local use"
        );
    }

    let data_path = config.data_path();

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => {
            let store = Store::open(&data_path)
                .await
                .with_context(|| format!("opening data file {}", data_path.display()))?;
            if let LoadOutcome::Recovered { backup } = store.load_outcome() {
                tracing::warn!(
                    backup = %backup.display(),
                    "Started from seed data after recovering a corrupt data file"
                );
            }
            run_server(config, store).await
        }
        Command::Seed { reset } => {
            let opened = if reset {
                Store::recreate(&data_path).await
            } else {
                Store::open(&data_path).await
            };
            let store =
                opened.with_context(|| format!("seeding data file {}", data_path.display()))?;

            let snapshot = store.snapshot().await;
            println!("Data file: {}", data_path.display());
            for tenant in &snapshot.tenants {
                let users = UserRepository::new(&store).list_by_tenant(tenant.id).await;
                println!("{} ({}, {} plan)", tenant.name, tenant.slug, tenant.subscription_plan);
                for user in users {
                    println!("  {:<24} {}", user.email, user.role);
                }
            }
            println!("Seeded accounts use the password '{SEED_PASSWORD}'.");
            Ok(())
        }
    }
}
