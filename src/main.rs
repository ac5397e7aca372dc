//! PickPad Worker - electoral roll import/export backend
//!
//! This worker connects to NATS and handles messages from the frontend.
//! The same binary runs one-shot roll commands from the terminal.

mod auth;
mod cli;
mod commands;
mod config;
mod db;
mod error;
mod handlers;
mod services;
mod store;
mod types;

use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing::{error, info};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::cli::{Cli, Command};
use crate::services::roll_import::{ImportOptions, RollImporter};
use crate::store::{PgRollStore, RollStore};

#[tokio::main]
async fn main() -> Result<()> {
    // Logs directory - use LOGS_DIR env var or default to ../logs (relative to worker)
    let logs_dir = std::env::var("LOGS_DIR").unwrap_or_else(|_| "../logs".to_string());
    std::fs::create_dir_all(&logs_dir).ok();

    // File appender for persistent logs (daily rotation)
    let file_appender = RollingFileAppender::new(Rotation::DAILY, &logs_dir, "worker.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    // Initialize logging - both stdout and file
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,pickpad_worker=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer()) // stdout
        .with(tracing_subscriber::fmt::layer().with_writer(non_blocking).with_ansi(false)) // file
        .init();

    let cli = Cli::parse();

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve().await,
        Command::Migrate => {
            let config = config::Config::from_env()?;
            let pool = db::create_pool(&config.database_url).await?;
            db::run_migrations(&pool).await
        }
        Command::Template { output } => commands::write_template(output).map(|_| ()),
        Command::Import { file, user, dry_run, yes, report } => {
            let config = config::Config::from_env()?;
            let store = connect_store(&config).await?;
            let importer = RollImporter::new(
                Arc::clone(&store),
                ImportOptions {
                    batch_pause: config.batch_pause,
                    ..Default::default()
                },
            );
            let cmd = commands::ImportCommand {
                file: &file,
                user,
                dry_run,
                yes,
                report: report.as_deref(),
            };
            commands::import(store, &importer, &cmd, &mut std::io::stdin().lock()).await
        }
        Command::Export(args) => {
            let config = config::Config::from_env()?;
            let store = connect_store(&config).await?;
            commands::export(store, &args, &mut std::io::stdin().lock()).await.map(|_| ())
        }
    }
}

async fn connect_store(config: &config::Config) -> Result<Arc<dyn RollStore>> {
    let pool = db::create_pool(&config.database_url).await?;
    info!("Connected to PostgreSQL");
    Ok(Arc::new(PgRollStore::new(pool)))
}

async fn serve() -> Result<()> {
    info!("Starting PickPad Worker...");

    // Load configuration
    let config = config::Config::from_env()?;
    info!("Configuration loaded");

    // Connect to database
    let pool = db::create_pool(&config.database_url).await?;
    info!("Connected to PostgreSQL");

    // Run migrations
    db::run_migrations(&pool).await?;

    // Connect to NATS (supports optional NATS_USER/NATS_PASSWORD auth).
    let nats_client = match (std::env::var("NATS_USER"), std::env::var("NATS_PASSWORD")) {
        (Ok(user), Ok(password)) if !user.is_empty() => {
            async_nats::ConnectOptions::new()
                .user_and_password(user, password)
                .connect(&config.nats_url)
                .await?
        }
        _ => async_nats::connect(&config.nats_url).await?,
    };
    info!("Connected to NATS at {}", config.nats_url);

    // Start message handlers
    let store: Arc<dyn RollStore> = Arc::new(PgRollStore::new(pool));
    let handler_result = handlers::start_handlers(nats_client, store, &config).await;

    if let Err(e) = handler_result {
        error!("Handler error: {}", e);
        return Err(e);
    }

    Ok(())
}
