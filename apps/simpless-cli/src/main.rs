//! # Simpless Console
//!
//! Keeps a product list in sync with the remote catalog, falling back to the
//! local cache while offline, and lets the user delete products from stdin.
//!
//! ## Startup
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  1. init_tracing()               stderr, RUST_LOG or default filter    │
//! │  2. SyncConfig::load()           defaults → sync.toml → env → flags    │
//! │  3. Database::new()              open cache + run migrations           │
//! │  4. SyncController::start()      catalog client + cache repository     │
//! │  5. ConnectivityMonitor::start() callback enqueues into the controller │
//! │  6. print snapshots / read commands until quit, EOF or Ctrl+C          │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

mod commands;

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use simpless_db::{Database, DbConfig};
use simpless_sync::{
    CatalogClient, ConnectivityMonitor, SyncConfig, SyncControllerBuilder, SyncControllerHandle,
};

use crate::commands::{render_products, render_status, Command, HELP};

#[derive(Parser, Debug)]
#[command(name = "simpless")]
#[command(about = "Offline-tolerant product catalog sync")]
struct Args {
    /// Config file (defaults to the platform config dir's sync.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Catalog endpoint, overrides config and environment
    #[arg(long)]
    catalog_url: Option<String>,

    /// SQLite cache file, overrides config and environment
    #[arg(long)]
    db_path: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();
    let args = Args::parse();

    let mut config = SyncConfig::load(args.config)?;
    if let Some(url) = args.catalog_url {
        config.catalog.url = url;
    }
    if let Some(path) = args.db_path {
        config.cache.database_path = Some(path);
    }
    config.validate()?;

    let db_path = config.database_path();
    if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let db = Database::new(DbConfig::new(&db_path)).await?;

    info!(catalog = %config.catalog.url, db = %db_path.display(), "Starting Simpless");

    let controller = SyncControllerBuilder::new()
        .with_catalog(Arc::new(CatalogClient::from_config(&config)?))
        .with_cache(Arc::new(db.products()))
        .build()?
        .start();

    let printer = tokio::spawn(print_snapshots(controller.clone()));

    let sink = controller.clone();
    let monitor = ConnectivityMonitor::from_config(&config)?.start(move |status| {
        if let Err(e) = sink.connectivity_changed(status) {
            warn!(error = %e, "Dropped connectivity change");
        }
    });

    let interrupted = tokio::select! {
        _ = read_commands(&controller) => false,
        _ = shutdown_signal() => true,
    };

    monitor.shutdown().await;
    // the pool must outlive every sync the monitor already queued
    if let Err(e) = controller.flush().await {
        warn!(error = %e, "Sync controller stopped before draining");
    }
    let _ = controller.shutdown();
    printer.abort();
    db.close().await;

    info!("Goodbye");
    if interrupted {
        // the stdin reader is parked on a blocking thread the runtime would wait for
        std::process::exit(0);
    }
    Ok(())
}

/// Initializes the tracing subscriber on stderr.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,simpless=debug,sqlx=warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Prints the product list every time the controller publishes.
async fn print_snapshots(controller: SyncControllerHandle) {
    let mut rx = controller.subscribe();
    while rx.changed().await.is_ok() {
        let state = rx.borrow_and_update().clone();
        print!("{}", render_products(&state));
    }
}

/// Runs stdin commands until `quit` or EOF.
async fn read_commands(controller: &SyncControllerHandle) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    println!("type 'help' for commands");

    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                warn!(error = %e, "Failed to read stdin");
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        let command = match line.parse::<Command>() {
            Ok(command) => command,
            Err(e) => {
                println!("{e}");
                continue;
            }
        };

        let result = match command {
            Command::List => {
                print!("{}", render_products(&controller.snapshot()));
                Ok(())
            }
            Command::Status => {
                print!("{}", render_status(&controller.snapshot()));
                Ok(())
            }
            Command::Refresh => controller.refresh().await,
            Command::Delete(ids) => controller.delete_selected(ids).await,
            Command::DeleteAll => controller.delete_all_products().await,
            Command::Help => {
                println!("{HELP}");
                Ok(())
            }
            Command::Quit => break,
        };

        if let Err(e) = result {
            let hint = if e.is_retryable() { " (try again)" } else { "" };
            println!("error: {e}{hint}");
        }
    }
}

/// Resolves on Ctrl+C, or SIGTERM on unix.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
