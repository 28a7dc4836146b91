//! # simpless-core: Pure Domain Logic for Simpless
//!
//! This crate holds the product entity and the identity rules every other
//! layer relies on. It has zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Simpless Architecture                            │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                 Consumer (console / any UI)                     │   │
//! │  │        subscribe ──► refresh ──► delete / delete-all            │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                 simpless-sync (SyncController)                  │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │              ★ simpless-core (THIS CRATE) ★                     │   │
//! │  │                                                                 │   │
//! │  │      ┌───────────┐              ┌───────────┐                  │   │
//! │  │      │   types   │              │  dedupe   │                  │   │
//! │  │      │  Product  │              │ first id  │                  │   │
//! │  │      │           │              │   wins    │                  │   │
//! │  │      └───────────┘              └───────────┘                  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                 simpless-db (Product cache)                     │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - The `Product` entity
//! - [`dedupe`] - Order-preserving removal of duplicate ids
//!
//! ## Example Usage
//!
//! ```rust
//! use simpless_core::{dedupe, Product};
//!
//! let items = vec![
//!     Product::new(5, "Backpack", "Fits 15 inch laptops", "https://img/5.jpg"),
//!     Product::new(5, "Backpack (dup)", "", ""),
//! ];
//!
//! let unique = dedupe(items);
//! assert_eq!(unique.len(), 1);
//! assert_eq!(unique[0].title, "Backpack");
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod dedupe;
pub mod types;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use dedupe::dedupe;
pub use types::{Product, ProductId};
