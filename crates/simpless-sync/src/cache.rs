//! # Product Cache Seam
//!
//! The controller talks to local storage only through [`ProductCache`], so
//! tests and alternative stores can stand in for SQLite.

use std::collections::HashSet;

use async_trait::async_trait;

use simpless_core::{Product, ProductId};
use simpless_db::{CachedProductRepository, DbResult};

/// Durable product storage used while offline.
///
/// Implementations keep at most one record per id and never overwrite an
/// existing record from `upsert_missing`.
#[async_trait]
pub trait ProductCache: Send + Sync {
    /// Inserts products whose id is not stored yet. Returns rows inserted.
    async fn upsert_missing(&self, products: &[Product]) -> DbResult<u64>;

    /// Every stored product.
    async fn fetch_all(&self) -> DbResult<Vec<Product>>;

    /// Removes the listed ids; unknown ids are ignored. Returns rows removed.
    async fn delete_where(&self, ids: &HashSet<ProductId>) -> DbResult<u64>;

    /// Removes everything. Returns rows removed.
    async fn delete_all(&self) -> DbResult<u64>;
}

#[async_trait]
impl ProductCache for CachedProductRepository {
    async fn upsert_missing(&self, products: &[Product]) -> DbResult<u64> {
        CachedProductRepository::upsert_missing(self, products).await
    }

    async fn fetch_all(&self) -> DbResult<Vec<Product>> {
        CachedProductRepository::fetch_all(self).await
    }

    async fn delete_where(&self, ids: &HashSet<ProductId>) -> DbResult<u64> {
        CachedProductRepository::delete_where(self, ids).await
    }

    async fn delete_all(&self) -> DbResult<u64> {
        CachedProductRepository::delete_all(self).await
    }
}
