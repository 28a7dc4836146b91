//! # simpless-db: Product Cache for Simpless
//!
//! This crate provides the persistent product cache used while offline.
//! It uses SQLite for local storage with sqlx for async operations.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Simpless Data Flow                               │
//! │                                                                         │
//! │  SyncController (offline reload / persist after fetch / deletes)       │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                   simpless-db (THIS CRATE)                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌─────────────────────┐  ┌──────────┐  │   │
//! │  │   │   Database    │    │    Repositories     │  │Migrations│  │   │
//! │  │   │   (pool.rs)   │    │    (product.rs)     │  │(embedded)│  │   │
//! │  │   │               │◄───│                     │  │          │  │   │
//! │  │   │ SqlitePool    │    │ CachedProductRepo   │  │ 001_...  │  │   │
//! │  │   └───────────────┘    └─────────────────────┘  └──────────┘  │   │
//! │  │                                                                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │            SQLite Database (cached_products table)              │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Repository implementations
//!
//! ## Usage
//!
//! ```rust,ignore
//! use simpless_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("path/to/cache.db")).await?;
//!
//! db.products().upsert_missing(&fetched).await?;
//! let offline = db.products().fetch_all().await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

pub use repository::product::CachedProductRepository;
