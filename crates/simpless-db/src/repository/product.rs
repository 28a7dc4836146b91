//! # Cached Product Repository
//!
//! Database operations for the offline product cache.
//!
//! ## Write Rules
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Insert-If-Absent                                     │
//! │                                                                         │
//! │  cache:  { 1: "Backpack", 2: "Shirt" }                                 │
//! │  fetch:  [ 2: "Shirt v2", 3: "Jacket" ]                                │
//! │       │                                                                 │
//! │       ▼  upsert_missing (one transaction)                              │
//! │  cache:  { 1: "Backpack", 2: "Shirt", 3: "Jacket" }                    │
//! │                      ▲                                                  │
//! │                      └── existing row is kept as-is                    │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every multi-row write runs in a single transaction: either all of it is
//! visible afterwards or none of it is.

use std::collections::HashSet;

use chrono::Utc;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use simpless_core::{Product, ProductId};

/// Bound parameters per `DELETE ... IN (...)` statement.
const DELETE_CHUNK: usize = 500;

/// One row of `cached_products`.
#[derive(Debug, sqlx::FromRow)]
struct CachedProductRow {
    id: i64,
    title: String,
    product_description: String,
    image_url: String,
}

impl From<CachedProductRow> for Product {
    fn from(row: CachedProductRow) -> Self {
        Product {
            id: row.id,
            title: row.title,
            description: row.product_description,
            image: row.image_url,
        }
    }
}

/// Repository for cached product operations.
///
/// ## Usage
/// ```rust,ignore
/// let repo = CachedProductRepository::new(pool);
///
/// let inserted = repo.upsert_missing(&fetched).await?;
/// let offline = repo.fetch_all().await?;
/// ```
#[derive(Debug, Clone)]
pub struct CachedProductRepository {
    pool: SqlitePool,
}

impl CachedProductRepository {
    /// Creates a new CachedProductRepository.
    pub fn new(pool: SqlitePool) -> Self {
        CachedProductRepository { pool }
    }

    /// Inserts every product whose `id` is not cached yet.
    ///
    /// Rows that already exist are left untouched, even if the incoming
    /// product carries different fields. Returns the number of rows
    /// actually inserted.
    pub async fn upsert_missing(&self, products: &[Product]) -> DbResult<u64> {
        if products.is_empty() {
            return Ok(0);
        }

        let cached_at = Utc::now();
        let mut tx = self.pool.begin().await.map_err(DbError::transaction)?;
        let mut inserted = 0u64;

        for product in products {
            let result = sqlx::query(
                r#"
                INSERT INTO cached_products (id, title, product_description, image_url, cached_at)
                VALUES (?1, ?2, ?3, ?4, ?5)
                ON CONFLICT(id) DO NOTHING
                "#,
            )
            .bind(product.id)
            .bind(&product.title)
            .bind(&product.description)
            .bind(&product.image)
            .bind(cached_at)
            .execute(&mut *tx)
            .await?;

            inserted += result.rows_affected();
        }

        tx.commit().await.map_err(DbError::transaction)?;

        debug!(
            offered = products.len(),
            inserted = inserted,
            "Cached missing products"
        );
        Ok(inserted)
    }

    /// Returns every cached product, ordered by ascending `id`.
    pub async fn fetch_all(&self) -> DbResult<Vec<Product>> {
        let rows = sqlx::query_as::<_, CachedProductRow>(
            r#"
            SELECT id, title, product_description, image_url
            FROM cached_products
            ORDER BY id ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        debug!(count = rows.len(), "Loaded cached products");
        Ok(rows.into_iter().map(Product::from).collect())
    }

    /// Deletes every cached row whose `id` is in `ids`.
    ///
    /// Ids with no cached row are ignored. An empty set is a no-op that
    /// never touches the database. Returns the number of rows removed.
    pub async fn delete_where(&self, ids: &HashSet<ProductId>) -> DbResult<u64> {
        if ids.is_empty() {
            return Ok(0);
        }

        let ids: Vec<ProductId> = ids.iter().copied().collect();
        let mut tx = self.pool.begin().await.map_err(DbError::transaction)?;
        let mut deleted = 0u64;

        for chunk in ids.chunks(DELETE_CHUNK) {
            let mut builder: QueryBuilder<Sqlite> =
                QueryBuilder::new("DELETE FROM cached_products WHERE id IN (");
            let mut separated = builder.separated(", ");
            for id in chunk {
                separated.push_bind(*id);
            }
            separated.push_unseparated(")");

            let result = builder.build().execute(&mut *tx).await?;
            deleted += result.rows_affected();
        }

        tx.commit().await.map_err(DbError::transaction)?;

        debug!(requested = ids.len(), deleted = deleted, "Deleted cached products");
        Ok(deleted)
    }

    /// Removes every cached product. Returns the number of rows removed.
    pub async fn delete_all(&self) -> DbResult<u64> {
        let result = sqlx::query("DELETE FROM cached_products")
            .execute(&self.pool)
            .await?;

        debug!(deleted = result.rows_affected(), "Cleared product cache");
        Ok(result.rows_affected())
    }

    /// Number of cached products.
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM cached_products")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
