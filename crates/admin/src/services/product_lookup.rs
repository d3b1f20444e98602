//! Product lookups for order enrichment.
//!
//! Order items carry only a product id. Lookups hit the admin catalog
//! snapshot first, then the backend, caching fetched products in `moka`
//! (5-minute TTL) so an order list does not refetch the same product for
//! every row.

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use tracing::{debug, instrument};

use verdant_core::{Order, Product, ProductId};
use verdant_storefront::api::ApiClient;
use verdant_storefront::catalog::{Catalog, fetch_product};
use verdant_storefront::services::{EnrichedItem, enrich_items};

/// Cached product lookups.
#[derive(Clone)]
pub struct ProductLookup {
    inner: Arc<ProductLookupInner>,
}

struct ProductLookupInner {
    api: ApiClient,
    cache: Cache<ProductId, Product>,
}

impl ProductLookup {
    #[must_use]
    pub fn new(api: ApiClient) -> Self {
        let cache = Cache::builder()
            .max_capacity(1000)
            .time_to_live(Duration::from_secs(300)) // 5 minutes
            .build();

        Self {
            inner: Arc::new(ProductLookupInner { api, cache }),
        }
    }

    /// Fetch a product, from the cache when possible. Failures are not cached.
    #[instrument(skip(self))]
    pub async fn get(&self, id: ProductId) -> Option<Product> {
        if let Some(product) = self.inner.cache.get(&id).await {
            return Some(product);
        }

        match fetch_product(&self.inner.api, id).await {
            Ok(product) => {
                self.inner.cache.insert(id, product.clone()).await;
                Some(product)
            }
            Err(e) => {
                debug!(product_id = %id, error = %e, "Product lookup failed");
                None
            }
        }
    }

    /// Drop a cached product after it changed on the backend.
    pub async fn invalidate(&self, id: ProductId) {
        self.inner.cache.invalidate(&id).await;
    }

    /// Join an order's items with their products, concurrently. Items whose
    /// product cannot be found keep the name stored on the order.
    pub async fn enrich(&self, order: &Order, catalog: &Catalog) -> Vec<EnrichedItem> {
        enrich_items(&order.items, |id| async move {
            match catalog.by_id(id) {
                Some(product) => Some(product.clone()),
                None => self.get(id).await,
            }
        })
        .await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal::Decimal;
    use url::Url;

    use super::*;
    use verdant_core::{OrderId, OrderItem, OrderStatus};

    fn offline_lookup() -> ProductLookup {
        ProductLookup::new(ApiClient::new(&Url::parse("http://127.0.0.1:9/api").unwrap()))
    }

    fn product(id: i64, name: &str) -> Product {
        serde_json::from_value(serde_json::json!({
            "id": id,
            "name": name,
            "price": "250",
            "original_price": "250",
            "category": "skincare",
            "stock": 3
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn test_enrich_prefers_catalog_and_falls_back_per_item() {
        let catalog = Catalog::new(vec![product(1, "Rose Toner")]);
        let order = Order {
            id: OrderId::new(9),
            customer_name: "Asha".to_string(),
            customer_email: None,
            shipping_address: None,
            payment_method: "cod".to_string(),
            status: OrderStatus::Pending,
            total: Decimal::from(500),
            items: vec![
                OrderItem {
                    product_id: ProductId::new(1),
                    product_name: None,
                    quantity: 1,
                    price: Decimal::from(250),
                    variant_size: None,
                },
                OrderItem {
                    product_id: ProductId::new(2),
                    product_name: Some("Neem Soap".to_string()),
                    quantity: 1,
                    price: Decimal::from(250),
                    variant_size: None,
                },
            ],
            created_at: None,
        };

        let items = offline_lookup().enrich(&order, &catalog).await;
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].name(), "Rose Toner");
        assert!(items[1].product.is_none());
        assert_eq!(items[1].name(), "Neem Soap");
    }
}
