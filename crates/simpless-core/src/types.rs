//! # Domain Types
//!
//! The product entity shared by the cache, the catalog client and the sync
//! controller.
//!
//! ## Identity
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                            Product                                      │
//! │                                                                         │
//! │   id           ◄── identity key (stable across fetches)                 │
//! │   title                                                                 │
//! │   description      payload only, never part of equality                 │
//! │   image                                                                 │
//! │                                                                         │
//! │   Product { id: 1, title: "A" } == Product { id: 1, title: "B" }        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};
use std::hash::{Hash, Hasher};
use ts_rs::TS;

/// Catalog identifier of a product.
pub type ProductId = i64;

// =============================================================================
// Product
// =============================================================================

/// A product as served by the remote catalog.
///
/// Equality and hashing are keyed solely by `id`, so two snapshots of the
/// same catalog entry compare equal even if their text changed.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Product {
    /// Globally unique catalog identifier.
    pub id: ProductId,

    /// Display title.
    pub title: String,

    /// Long-form description.
    pub description: String,

    /// Thumbnail URL.
    pub image: String,
}

impl Product {
    /// Creates a product from its four fields.
    pub fn new(
        id: ProductId,
        title: impl Into<String>,
        description: impl Into<String>,
        image: impl Into<String>,
    ) -> Self {
        Product {
            id,
            title: title.into(),
            description: description.into(),
            image: image.into(),
        }
    }
}

impl PartialEq for Product {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Product {}

impl Hash for Product {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_equality_is_by_id_only() {
        let a = Product::new(1, "Jacket", "Warm", "https://img/1.jpg");
        let b = Product::new(1, "Jacket v2", "Warmer", "https://img/1b.jpg");
        let c = Product::new(2, "Jacket", "Warm", "https://img/1.jpg");

        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_hash_is_by_id_only() {
        let mut set = HashSet::new();
        set.insert(Product::new(7, "Ring", "", ""));
        set.insert(Product::new(7, "Ring (renamed)", "", ""));

        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_deserialize_ignores_extra_catalog_fields() {
        let json = r#"{
            "id": 3,
            "title": "Mens Cotton Jacket",
            "price": 55.99,
            "description": "great outerwear",
            "category": "men's clothing",
            "image": "https://fakestoreapi.com/img/3.jpg",
            "rating": { "rate": 4.7, "count": 500 }
        }"#;

        let product: Product = serde_json::from_str(json).unwrap();
        assert_eq!(product.id, 3);
        assert_eq!(product.title, "Mens Cotton Jacket");
        assert_eq!(product.image, "https://fakestoreapi.com/img/3.jpg");
    }

    #[test]
    fn test_deserialize_rejects_missing_fields() {
        let json = r#"{ "id": 3, "title": "No image" }"#;
        assert!(serde_json::from_str::<Product>(json).is_err());
    }
}
