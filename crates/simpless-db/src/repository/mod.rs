//! # Repository Module
//!
//! Database repository implementations for the product cache.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repository Pattern                                   │
//! │                                                                         │
//! │  SyncController                                                        │
//! │       │                                                                 │
//! │       │  db.products().fetch_all()                                     │
//! │       ▼                                                                 │
//! │  CachedProductRepository                                               │
//! │  ├── upsert_missing(&self, products)                                   │
//! │  ├── fetch_all(&self)                                                  │
//! │  ├── delete_where(&self, ids)                                          │
//! │  ├── delete_all(&self)                                                 │
//! │  └── count(&self)                                                      │
//! │       │                                                                 │
//! │       │  SQL Query                                                      │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`product::CachedProductRepository`] - Cached catalog products

pub mod product;
