//! # Deduplication
//!
//! Removes products that share an `id`, keeping the first occurrence.
//!
//! ```text
//!   input:   [5a, 1, 5b, 2, 1]
//!   seen:    {5} {5,1} skip {5,1,2} skip
//!   output:  [5a, 1, 2]
//! ```

use std::collections::HashSet;

use crate::types::{Product, ProductId};

/// Returns `items` with every repeated `id` dropped after its first
/// appearance. Relative order of the kept items is unchanged.
///
/// Idempotent: `dedupe(dedupe(x)) == dedupe(x)`.
pub fn dedupe(items: impl IntoIterator<Item = Product>) -> Vec<Product> {
    let mut seen: HashSet<ProductId> = HashSet::new();
    items
        .into_iter()
        .filter(|product| seen.insert(product.id))
        .collect()
}
