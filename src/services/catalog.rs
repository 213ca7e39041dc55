//! Catalog reads.
//!
//! Menu browsing goes through a short TTL cache; checkout-time resolution
//! deliberately bypasses it so admission always sees the live catalog.

use moka::future::Cache;
use std::sync::Arc;
use std::time::Duration;

use crate::entities::{categories, products};
use crate::store::{OrderStore, StoreError};

/// How long browsing snapshots stay fresh
const CATALOG_TTL_SECS: u64 = 60;

const CATEGORIES_KEY: &str = "active_categories";
const PRODUCTS_KEY: &str = "available_products";

#[derive(Clone)]
pub struct CatalogService {
    store: Arc<dyn OrderStore>,
    categories: Cache<&'static str, Arc<Vec<categories::Model>>>,
    products: Cache<&'static str, Arc<Vec<products::Model>>>,
}

impl CatalogService {
    pub fn new(store: Arc<dyn OrderStore>) -> CatalogService {
        CatalogService {
            store,
            categories: Cache::builder()
                .time_to_live(Duration::from_secs(CATALOG_TTL_SECS))
                .max_capacity(1)
                .build(),
            products: Cache::builder()
                .time_to_live(Duration::from_secs(CATALOG_TTL_SECS))
                .max_capacity(1)
                .build(),
        }
    }

    pub async fn active_categories(&self) -> Result<Arc<Vec<categories::Model>>, StoreError> {
        if let Some(cached) = self.categories.get(CATEGORIES_KEY).await {
            return Ok(cached);
        }
        let fresh = Arc::new(self.store.list_active_categories().await?);
        self.categories.insert(CATEGORIES_KEY, fresh.clone()).await;
        Ok(fresh)
    }

    pub async fn available_products(&self) -> Result<Arc<Vec<products::Model>>, StoreError> {
        if let Some(cached) = self.products.get(PRODUCTS_KEY).await {
            return Ok(cached);
        }
        let fresh = Arc::new(self.store.list_available_products().await?);
        self.products.insert(PRODUCTS_KEY, fresh.clone()).await;
        Ok(fresh)
    }

    /// Browsing-time lookup from the cached snapshot
    pub async fn find_available(&self, name: &str) -> Result<Option<products::Model>, StoreError> {
        let products = self.available_products().await?;
        Ok(products.iter().find(|p| p.name == name).cloned())
    }

    /// Checkout-time lookup, always against the live store
    pub async fn resolve_for_checkout(
        &self,
        name: &str,
    ) -> Result<Option<products::Model>, StoreError> {
        self.store.find_available_product(name).await
    }
}
