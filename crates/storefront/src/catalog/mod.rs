//! Product catalog.
//!
//! The catalog is fetched from `GET /products` once, normalized, and held as
//! an immutable [`Catalog`] snapshot shared behind an `Arc`. Handlers take a
//! snapshot per request; refreshes and local admin edits replace the snapshot
//! wholesale, so readers never observe a half-updated catalog.
//!
//! A failed first fetch leaves an empty catalog with the error recorded;
//! callers decide whether to offer a retry. A failed refresh of a catalog
//! that loaded cleanly keeps the previous snapshot. Nothing is retried
//! automatically.

pub mod normalize;

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use tokio::sync::Mutex;
use tracing::{info, instrument, warn};

use verdant_core::{Product, ProductId};

use crate::api::{ApiClient, ApiError};

pub use normalize::{NormalizeError, normalize_product, normalize_products};

// =============================================================================
// Catalog snapshot
// =============================================================================

/// Immutable set of normalized products with an id index.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    products: Vec<Product>,
    index: HashMap<ProductId, usize>,
}

impl Catalog {
    /// Build a catalog. Later duplicates of an id are dropped.
    #[must_use]
    pub fn new(products: Vec<Product>) -> Self {
        let mut index = HashMap::with_capacity(products.len());
        let mut unique = Vec::with_capacity(products.len());
        for product in products {
            if index.contains_key(&product.id) {
                warn!(product_id = %product.id, "Duplicate product id in catalog");
                continue;
            }
            index.insert(product.id, unique.len());
            unique.push(product);
        }
        Self {
            products: unique,
            index,
        }
    }

    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// All products, in backend order.
    #[must_use]
    pub fn all(&self) -> &[Product] {
        &self.products
    }

    #[must_use]
    pub fn by_id(&self, id: ProductId) -> Option<&Product> {
        self.index.get(&id).and_then(|&i| self.products.get(i))
    }

    /// Products whose category label matches, ignoring case.
    #[must_use]
    pub fn by_category(&self, category: &str) -> Vec<&Product> {
        let category = category.trim();
        self.products
            .iter()
            .filter(|p| p.category.eq_ignore_ascii_case(category))
            .collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.products.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }

    /// Copy of this catalog with `product` replacing the entry of the same id.
    /// Unknown ids are appended.
    #[must_use]
    pub fn with_product(&self, product: Product) -> Self {
        let mut products = self.products.clone();
        match self.index.get(&product.id).copied() {
            Some(i) => {
                if let Some(slot) = products.get_mut(i) {
                    *slot = product;
                }
            }
            None => products.push(product),
        }
        Self::new(products)
    }

    /// Copy of this catalog without `id`.
    #[must_use]
    pub fn without(&self, id: ProductId) -> Self {
        Self::new(
            self.products
                .iter()
                .filter(|p| p.id != id)
                .cloned()
                .collect(),
        )
    }
}

// =============================================================================
// CatalogStore
// =============================================================================

#[derive(Debug, Default)]
struct CatalogState {
    catalog: Arc<Catalog>,
    loading: bool,
    loaded: bool,
    last_error: Option<String>,
}

/// Shared owner of the current catalog snapshot.
#[derive(Clone)]
pub struct CatalogStore {
    api: ApiClient,
    state: Arc<RwLock<CatalogState>>,
    /// Serializes fetches so concurrent first requests share one load.
    fetch_lock: Arc<Mutex<()>>,
}

impl CatalogStore {
    /// Create an empty store; nothing is fetched until [`Self::load`].
    #[must_use]
    pub fn new(api: ApiClient) -> Self {
        Self {
            api,
            state: Arc::new(RwLock::new(CatalogState::default())),
            fetch_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Create a store that starts with `products` already loaded.
    #[must_use]
    pub fn with_products(api: ApiClient, products: Vec<Product>) -> Self {
        let store = Self::new(api);
        store.write(|state| {
            state.catalog = Arc::new(Catalog::new(products));
            state.loaded = true;
        });
        store
    }

    fn read<T>(&self, f: impl FnOnce(&CatalogState) -> T) -> T {
        let guard = self.state.read().unwrap_or_else(PoisonError::into_inner);
        f(&guard)
    }

    fn write<T>(&self, f: impl FnOnce(&mut CatalogState) -> T) -> T {
        let mut guard = self.state.write().unwrap_or_else(PoisonError::into_inner);
        f(&mut guard)
    }

    /// The current snapshot.
    #[must_use]
    pub fn snapshot(&self) -> Arc<Catalog> {
        self.read(|state| Arc::clone(&state.catalog))
    }

    /// Whether a fetch is in flight.
    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.read(|state| state.loading)
    }

    /// Error of the most recent fetch, if it failed.
    #[must_use]
    pub fn last_error(&self) -> Option<String> {
        self.read(|state| state.last_error.clone())
    }

    /// Fetch the catalog if it has never been fetched, then return the snapshot.
    pub async fn load(&self) -> Arc<Catalog> {
        if !self.read(|state| state.loaded) {
            let _guard = self.fetch_lock.lock().await;
            if !self.read(|state| state.loaded) {
                // The error is recorded in the store state.
                let _ = self.fetch().await;
            }
        }
        self.snapshot()
    }

    /// Re-fetch the catalog.
    ///
    /// # Errors
    ///
    /// Returns the fetch error. A snapshot that loaded cleanly is kept;
    /// otherwise the store holds an empty catalog.
    pub async fn refresh(&self) -> Result<usize, ApiError> {
        let _guard = self.fetch_lock.lock().await;
        self.fetch().await
    }

    /// Re-fetch only if the catalog is missing or its last fetch failed.
    ///
    /// # Errors
    ///
    /// Returns the fetch error.
    pub async fn retry(&self) -> Result<usize, ApiError> {
        let _guard = self.fetch_lock.lock().await;
        if self.read(|state| state.loaded && state.last_error.is_none()) {
            return Ok(self.snapshot().len());
        }
        self.fetch().await
    }

    #[instrument(skip(self))]
    async fn fetch(&self) -> Result<usize, ApiError> {
        self.write(|state| state.loading = true);
        let result = self.api.products().await;
        self.write(|state| {
            state.loading = false;
            match &result {
                Ok(raw) => {
                    let catalog = Catalog::new(normalize_products(raw));
                    info!(
                        received = raw.len(),
                        products = catalog.len(),
                        "Loaded product catalog"
                    );
                    state.catalog = Arc::new(catalog);
                    state.last_error = None;
                }
                Err(e) if state.loaded && state.last_error.is_none() => {
                    warn!(error = %e, "Catalog refresh failed; keeping previous snapshot");
                }
                Err(e) => {
                    warn!(error = %e, "Failed to load product catalog");
                    state.catalog = Arc::new(Catalog::empty());
                    state.last_error = Some(e.to_string());
                }
            }
            state.loaded = true;
        });
        result.map(|_| self.snapshot().len())
    }

    /// Replace (or add) a product in the snapshot after a confirmed update.
    pub fn update_local(&self, product: Product) {
        self.write(|state| state.catalog = Arc::new(state.catalog.with_product(product)));
    }

    /// Drop a product from the snapshot after a confirmed deletion.
    pub fn remove_local(&self, id: ProductId) {
        self.write(|state| state.catalog = Arc::new(state.catalog.without(id)));
    }

    /// Fetch one product fresh from the backend, bypassing the snapshot.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the record cannot be
    /// normalized.
    pub async fn fetch_product(&self, id: ProductId) -> Result<Product, ApiError> {
        fetch_product(&self.api, id).await
    }
}

/// `GET /products/{id}`, normalized.
///
/// # Errors
///
/// Returns an error if the request fails or the record cannot be normalized.
pub async fn fetch_product(api: &ApiClient, id: ProductId) -> Result<Product, ApiError> {
    let raw = api.product(id).await?;
    normalize_product(&raw).map_err(|e| ApiError::UnexpectedShape(e.to_string()))
}

#[cfg(test)]
pub(crate) mod fixtures {
    use rust_decimal::Decimal;
    use verdant_core::{CategoryId, Product, ProductId};

    /// Product in category 1 ("Face Care").
    pub fn product(id: i64, price: i64, stock: u32) -> Product {
        Product {
            id: ProductId::new(id),
            name: format!("Product {id}"),
            description: None,
            brand: None,
            price: Decimal::from(price),
            original_price: Decimal::from(price),
            stock,
            category: "Face Care".to_string(),
            category_id: Some(CategoryId::new(1)),
            images: Vec::new(),
            rating: 0.0,
            review_count: 0,
            variants: Vec::new(),
            created_at: None,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use url::Url;

    use super::fixtures::product;
    use super::*;

    fn store(products: Vec<Product>) -> CatalogStore {
        let api = ApiClient::new(&Url::parse("http://127.0.0.1:9/api").unwrap());
        CatalogStore::with_products(api, products)
    }

    #[test]
    fn test_lookup_helpers() {
        let mut body = product(2, 300, 1);
        body.category = "Body Care".to_string();
        let catalog = Catalog::new(vec![product(1, 100, 5), body, product(1, 999, 0)]);

        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.by_id(ProductId::new(1)).unwrap().stock, 5);
        assert!(catalog.by_id(ProductId::new(3)).is_none());
        assert_eq!(catalog.by_category("body care").len(), 1);
    }

    #[test]
    fn test_local_update_and_remove_replace_snapshot() {
        let store = store(vec![product(1, 100, 5), product(2, 200, 5)]);
        let before = store.snapshot();

        let mut updated = product(1, 100, 0);
        updated.name = "Restocked later".to_string();
        store.update_local(updated);
        store.remove_local(ProductId::new(2));

        let after = store.snapshot();
        assert_eq!(after.len(), 1);
        assert_eq!(after.by_id(ProductId::new(1)).unwrap().stock, 0);
        // Readers holding the old snapshot are unaffected.
        assert_eq!(before.len(), 2);
        assert_eq!(before.by_id(ProductId::new(1)).unwrap().stock, 5);
    }

    #[tokio::test]
    async fn test_failed_first_load_leaves_empty_catalog() {
        // Nothing listens on port 9.
        let api = ApiClient::new(&Url::parse("http://127.0.0.1:9/api").unwrap());
        let store = CatalogStore::new(api);
        assert!(store.load().await.is_empty());
        assert!(!store.is_loading());
        assert!(store.last_error().is_some());

        // Retrying a failed load fetches again, and fails again.
        assert!(store.retry().await.is_err());
        assert!(store.snapshot().is_empty());
    }

    #[tokio::test]
    async fn test_failed_refresh_keeps_previous_snapshot() {
        let store = store(vec![product(1, 100, 5)]);
        let before = store.snapshot();

        assert!(store.refresh().await.is_err());
        assert!(Arc::ptr_eq(&before, &store.snapshot()));
        assert!(store.last_error().is_none());
        assert!(!store.is_loading());
    }

    #[tokio::test]
    async fn test_retry_leaves_healthy_snapshot_alone() {
        let store = store(vec![product(1, 100, 5), product(2, 200, 5)]);
        // No fetch happens, so the unreachable backend is never asked.
        assert_eq!(store.retry().await.unwrap(), 2);
        assert_eq!(store.snapshot().len(), 2);
    }
}
