//! In-memory catalog for tests and offline demos.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use rocketshoes_core::{Product, ProductId, StockInfo};
use tokio::sync::RwLock;

use super::{Catalog, CatalogError};

/// A catalog backed by a map of products and stock levels.
#[derive(Debug, Default)]
pub struct MemoryCatalog {
    entries: RwLock<HashMap<ProductId, (Product, u32)>>,
    latency: Option<Duration>,
    offline: AtomicBool,
    stock_requests: AtomicUsize,
}

impl MemoryCatalog {
    /// Create an empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every lookup, to let concurrent callers interleave.
    #[must_use]
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Add a product with its stock level, consuming `self`.
    #[must_use]
    pub fn with_product(mut self, product: Product, stock: u32) -> Self {
        self.entries.get_mut().insert(product.id, (product, stock));
        self
    }

    /// Add or replace a product and its stock level.
    pub async fn insert(&self, product: Product, stock: u32) {
        self.entries.write().await.insert(product.id, (product, stock));
    }

    /// Change the stock level of a known product.
    ///
    /// Returns `false` if the product is unknown.
    pub async fn set_stock(&self, id: ProductId, stock: u32) -> bool {
        match self.entries.write().await.get_mut(&id) {
            Some(entry) => {
                entry.1 = stock;
                true
            }
            None => false,
        }
    }

    /// Make every lookup fail with a 503, as if the service were down.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Number of stock lookups served so far.
    pub fn stock_requests(&self) -> usize {
        self.stock_requests.load(Ordering::SeqCst)
    }

    async fn lookup(&self, id: ProductId, resource: &str) -> Result<(Product, u32), CatalogError> {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        if self.offline.load(Ordering::SeqCst) {
            return Err(CatalogError::Api {
                status: 503,
                message: "catalog offline".to_string(),
            });
        }

        self.entries
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or_else(|| CatalogError::NotFound(format!("{resource}/{id}")))
    }
}

#[async_trait]
impl Catalog for MemoryCatalog {
    async fn product(&self, id: ProductId) -> Result<Product, CatalogError> {
        self.lookup(id, "products").await.map(|(product, _)| product)
    }

    async fn stock(&self, id: ProductId) -> Result<StockInfo, CatalogError> {
        self.stock_requests.fetch_add(1, Ordering::SeqCst);
        self.lookup(id, "stock")
            .await
            .map(|(_, amount)| StockInfo::new(id, amount))
    }
}
