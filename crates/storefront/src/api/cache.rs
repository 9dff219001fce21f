//! Cache types for catalogue responses.

use shopeasy_core::ProductId;

use super::types::{ProductDetail, ProductPage};

/// Cache key for catalogue reads.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub enum CacheKey {
    /// Normalized `GET /api/product/all` parameters.
    Listing(Vec<(&'static str, String)>),
    Product(ProductId),
}

/// Cached value types.
#[derive(Debug, Clone)]
pub enum CacheValue {
    Listing(Box<ProductPage>),
    Product(Box<ProductDetail>),
}
