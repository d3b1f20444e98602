//! Application state shared across handlers.

use std::sync::Arc;

use verdant_core::CurrencyCode;

use crate::api::ApiClient;
use crate::catalog::CatalogStore;
use crate::config::StorefrontConfig;
use crate::images::ImageResolver;

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc`. Per-visitor state (cart,
/// auth, wishlist) is not held here; it lives in the session.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    api: ApiClient,
    catalog: CatalogStore,
    images: ImageResolver,
}

impl AppState {
    /// Create a new application state. The catalog starts empty and is
    /// fetched on first use.
    #[must_use]
    pub fn new(config: StorefrontConfig) -> Self {
        let api = ApiClient::new(&config.backend_api_url);
        let catalog = CatalogStore::new(api.clone());
        Self::with_catalog(config, api, catalog)
    }

    /// Create application state around an existing catalog store.
    #[must_use]
    pub fn with_catalog(config: StorefrontConfig, api: ApiClient, catalog: CatalogStore) -> Self {
        let images = ImageResolver::from_base_url(&config.base_url, config.uploads_port);
        Self {
            inner: Arc::new(AppStateInner {
                config,
                api,
                catalog,
                images,
            }),
        }
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get a reference to the backend API client.
    #[must_use]
    pub fn api(&self) -> &ApiClient {
        &self.inner.api
    }

    /// Get a reference to the shared product catalog.
    #[must_use]
    pub fn catalog(&self) -> &CatalogStore {
        &self.inner.catalog
    }

    /// Get a reference to the image URL resolver.
    #[must_use]
    pub fn images(&self) -> &ImageResolver {
        &self.inner.images
    }

    /// Currency prices are displayed in.
    #[must_use]
    pub fn currency(&self) -> CurrencyCode {
        self.inner.config.currency
    }
}
