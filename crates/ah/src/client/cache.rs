//! Cache types for read-only API responses.

use super::types::Product;

/// Cached value types.
#[derive(Debug, Clone)]
pub(crate) enum CacheValue {
    Product(Box<Product>),
    Products(Vec<Product>),
}
