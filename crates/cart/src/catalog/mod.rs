//! Catalog and stock lookups.
//!
//! # Architecture
//!
//! - The catalog service is the source of truth for product details and stock
//! - Product details may be cached (see [`HttpCatalog`]); stock never is
//! - [`MemoryCatalog`] serves tests and offline demos
//!
//! # Endpoints
//!
//! - `GET /products/{id}` - product record
//! - `GET /stock/{id}` - `{ "id": n, "amount": n }`

mod http;
mod memory;

pub use http::HttpCatalog;
pub use memory::MemoryCatalog;

use async_trait::async_trait;
use rocketshoes_core::{Product, ProductId, StockInfo};
use thiserror::Error;

/// Errors that can occur when talking to the catalog service.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Service returned a non-success status.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Rate limited by the service.
    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),

    /// Client could not be built from the configuration.
    #[error("Invalid catalog configuration: {0}")]
    Config(String),
}

/// Read-only access to product details and stock.
#[async_trait]
pub trait Catalog: Send + Sync {
    /// Fetch product details.
    async fn product(&self, id: ProductId) -> Result<Product, CatalogError>;

    /// Fetch the current stock level.
    async fn stock(&self, id: ProductId) -> Result<StockInfo, CatalogError>;
}
