//! # simpless-sync: Sync Engine for Simpless
//!
//! Keeps an in-memory product list consistent with a remote catalog and the
//! local cache, switching between them as connectivity changes.
//!
//! ## Sync Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Sync Architecture                                │
//! │                                                                         │
//! │  ┌──────────────────────┐   status    ┌───────────────────────────┐    │
//! │  │ ConnectivityMonitor  │ ──────────► │ SyncController            │    │
//! │  │ (TcpProbe, interval) │             │ (single writer)           │    │
//! │  └──────────────────────┘             │                           │    │
//! │                                       │  online ──► CatalogSource │    │
//! │  ┌──────────────────────┐  commands   │  offline ─► ProductCache  │    │
//! │  │ Consumer (CLI, UI)   │ ──────────► │                           │    │
//! │  │                      │ ◄────────── │  watch<SyncState>         │    │
//! │  └──────────────────────┘  snapshots  └───────────────────────────┘    │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`config`] - Configuration loading (TOML file + environment)
//! - [`error`] - Sync error types
//! - [`catalog`] - Remote catalog client
//! - [`cache`] - Product cache seam over simpless-db
//! - [`connectivity`] - Reachability monitor
//! - [`controller`] - Sync controller and its handle
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use simpless_sync::{CatalogClient, ConnectivityMonitor, SyncConfig, SyncController};
//!
//! let config = SyncConfig::load(None)?;
//! let db = simpless_db::Database::new(simpless_db::DbConfig::new(config.database_path())).await?;
//!
//! let controller = SyncController::new(
//!     Arc::new(CatalogClient::from_config(&config)?),
//!     Arc::new(db.products()),
//! )
//! .start();
//!
//! let sink = controller.clone();
//! let monitor = ConnectivityMonitor::from_config(&config)?.start(move |status| {
//!     let _ = sink.connectivity_changed(status);
//! });
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod cache;
pub mod catalog;
pub mod config;
pub mod connectivity;
pub mod controller;
pub mod error;

// =============================================================================
// Re-exports
// =============================================================================

pub use cache::ProductCache;
pub use catalog::{CatalogClient, CatalogSource};
pub use config::SyncConfig;
pub use connectivity::{ConnectivityHandle, ConnectivityMonitor, NetworkStatus, ReachabilityProbe, TcpProbe};
pub use controller::{
    NoOpEmitter, SyncController, SyncControllerBuilder, SyncControllerHandle, SyncEventEmitter,
    SyncState,
};
pub use error::{SyncError, SyncResult};
