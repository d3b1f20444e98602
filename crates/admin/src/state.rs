//! Application state shared across handlers.

use std::sync::Arc;

use verdant_storefront::api::ApiClient;
use verdant_storefront::catalog::CatalogStore;
use verdant_storefront::images::ImageResolver;

use crate::config::AdminConfig;
use crate::services::ProductLookup;

/// Application state shared across all handlers.
///
/// The admin keeps its own catalog store; changes made here reach the
/// storefront only when it next refreshes from the backend.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: AdminConfig,
    api: ApiClient,
    catalog: CatalogStore,
    images: ImageResolver,
    products: ProductLookup,
}

impl AppState {
    #[must_use]
    pub fn new(config: AdminConfig) -> Self {
        let api = ApiClient::new(&config.backend_api_url);
        let catalog = CatalogStore::new(api.clone());
        let images = ImageResolver::for_host(&config.uploads_host, config.uploads_port);
        let products = ProductLookup::new(api.clone());

        Self {
            inner: Arc::new(AppStateInner {
                config,
                api,
                catalog,
                images,
                products,
            }),
        }
    }

    #[must_use]
    pub fn config(&self) -> &AdminConfig {
        &self.inner.config
    }

    #[must_use]
    pub fn api(&self) -> &ApiClient {
        &self.inner.api
    }

    /// Service token for `/admin/*` calls.
    #[must_use]
    pub fn token(&self) -> &str {
        self.inner.config.api_token()
    }

    #[must_use]
    pub fn catalog(&self) -> &CatalogStore {
        &self.inner.catalog
    }

    #[must_use]
    pub fn images(&self) -> &ImageResolver {
        &self.inner.images
    }

    #[must_use]
    pub fn products(&self) -> &ProductLookup {
        &self.inner.products
    }
}
