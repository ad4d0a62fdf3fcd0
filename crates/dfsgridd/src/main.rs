//! dfsgridd — the dfsgrid daemon.
//!
//! Single binary that assembles the control plane:
//! - Node registry + JSON snapshot storage
//! - Scheduler (offer decision loop, task-status handling)
//! - REST API
//!
//! # Usage
//!
//! ```text
//! dfsgridd scheduler --api 0.0.0.0:7000 --storage /var/lib/dfsgrid/nodes.json
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::info;

use dfsgrid_core::DaemonConfig;
use dfsgrid_node::{FileStorage, Nodes};
use dfsgrid_scheduler::{LogDriver, Scheduler};

#[derive(Parser)]
#[command(name = "dfsgridd", about = "dfsgrid daemon")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the scheduler and its REST API.
    Scheduler {
        /// Listen address for the REST API.
        #[arg(long)]
        api: Option<String>,

        /// Path of the node-registry snapshot file.
        #[arg(long)]
        storage: Option<PathBuf>,

        /// Optional TOML config file; flags override its values.
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,dfsgridd=debug,dfsgrid=debug".parse().unwrap()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Scheduler {
            api,
            storage,
            config,
        } => {
            let mut config = match config {
                Some(path) => DaemonConfig::from_file(&path)?,
                None => DaemonConfig::default(),
            };
            if let Some(api) = api {
                config.api.addr = api;
            }
            if let Some(storage) = storage {
                config.storage.path = storage;
            }
            run_scheduler(config).await
        }
    }
}

async fn run_scheduler(config: DaemonConfig) -> anyhow::Result<()> {
    info!(framework = %config.framework.name, "dfsgrid daemon starting");

    let storage = FileStorage::new(&config.storage.path);
    let nodes = match storage.load()? {
        Some(nodes) => {
            info!(path = ?config.storage.path, count = nodes.len(), "registry snapshot loaded");
            nodes
        }
        None => {
            info!(path = ?config.storage.path, "no registry snapshot, starting empty");
            Nodes::default()
        }
    };

    let scheduler = Arc::new(Scheduler::new(Arc::new(LogDriver), nodes, Some(storage)));
    info!("scheduler initialized");

    let router = dfsgrid_api::build_router(scheduler);

    info!(addr = %config.api.addr, "API server starting");
    let listener = tokio::net::TcpListener::bind(&config.api.addr).await?;

    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "failed to install CTRL+C handler");
            }
            info!("shutdown signal received");
        })
        .await?;

    info!("dfsgrid daemon stopped");
    Ok(())
}
