//! Wishlist store.
//!
//! The wishlist lives on the backend; this store holds the product snapshots
//! it returned for the current request. Local state changes only after the
//! backend confirms a change.

use serde_json::Value;
use thiserror::Error;
use tracing::{debug, instrument, warn};

use verdant_core::{Product, ProductId};

use crate::api::{ApiClient, ApiError};
use crate::catalog::{Catalog, normalize_products};
use crate::notify::Toaster;

/// Errors from wishlist changes.
#[derive(Debug, Error)]
pub enum WishlistError {
    #[error("Please log in to use your wishlist")]
    NotAuthenticated,

    #[error("Could not update your wishlist")]
    Api(#[from] ApiError),
}

/// The logged-in user's wishlist.
#[derive(Debug, Clone, Default)]
pub struct WishlistStore {
    items: Vec<Product>,
}

impl WishlistStore {
    /// Fetch the wishlist. Without a token, or on failure, the list is empty.
    #[instrument(skip_all)]
    pub async fn fetch(api: &ApiClient, token: Option<&str>) -> Self {
        let Some(token) = token else {
            return Self::default();
        };
        match api.wishlist(token).await {
            Ok(raw) => Self::from_raw(&raw),
            Err(e) => {
                warn!(error = %e, "Failed to fetch wishlist");
                Self::default()
            }
        }
    }

    fn from_raw(raw: &[Value]) -> Self {
        // Entries may wrap the product: `{id, product_id, product: {...}}`.
        let unwrapped: Vec<Value> = raw
            .iter()
            .map(|entry| entry.get("product").cloned().unwrap_or_else(|| entry.clone()))
            .collect();
        Self {
            items: normalize_products(&unwrapped),
        }
    }

    #[must_use]
    pub fn items(&self) -> &[Product] {
        &self.items
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    #[must_use]
    pub fn is_member(&self, id: ProductId) -> bool {
        self.items.iter().any(|p| p.id == id)
    }

    /// Add a product. On success the returned list replaces local state, or
    /// the catalog's snapshot of the product is appended.
    ///
    /// # Errors
    ///
    /// Returns an error (and shows it) when logged out or when the backend
    /// refuses; local state is then unchanged.
    pub async fn add(
        &mut self,
        api: &ApiClient,
        token: Option<&str>,
        id: ProductId,
        catalog: &Catalog,
        toaster: &mut Toaster,
    ) -> Result<(), WishlistError> {
        let Some(token) = token else {
            return Self::reject(toaster, WishlistError::NotAuthenticated);
        };
        match api.add_to_wishlist(token, id).await {
            Ok(Some(list)) => *self = Self::from_raw(&list),
            Ok(None) => {
                if !self.is_member(id) {
                    match catalog.by_id(id) {
                        Some(product) => self.items.push(product.clone()),
                        None => debug!(product_id = %id, "Wishlisted product not in catalog"),
                    }
                }
            }
            Err(e) => {
                warn!(product_id = %id, error = %e, "Failed to add to wishlist");
                return Self::reject(toaster, e.into());
            }
        }
        toaster.success("Added to wishlist");
        Ok(())
    }

    /// Remove a product. On success the returned list replaces local state,
    /// or the product is dropped locally.
    ///
    /// # Errors
    ///
    /// Returns an error (and shows it) when logged out or when the backend
    /// refuses; local state is then unchanged.
    pub async fn remove(
        &mut self,
        api: &ApiClient,
        token: Option<&str>,
        id: ProductId,
        toaster: &mut Toaster,
    ) -> Result<(), WishlistError> {
        let Some(token) = token else {
            return Self::reject(toaster, WishlistError::NotAuthenticated);
        };
        match api.remove_from_wishlist(token, id).await {
            Ok(Some(list)) => *self = Self::from_raw(&list),
            Ok(None) => self.items.retain(|p| p.id != id),
            Err(e) => {
                warn!(product_id = %id, error = %e, "Failed to remove from wishlist");
                return Self::reject(toaster, e.into());
            }
        }
        toaster.info("Removed from wishlist");
        Ok(())
    }

    fn reject(toaster: &mut Toaster, error: WishlistError) -> Result<(), WishlistError> {
        toaster.error(error.to_string());
        Err(error)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;
    use url::Url;

    use super::*;
    use crate::catalog::fixtures::product;
    use crate::notify::ToastKind;

    fn offline_api() -> ApiClient {
        ApiClient::new(&Url::parse("http://127.0.0.1:9/api").unwrap())
    }

    #[test]
    fn test_from_raw_unwraps_entries() {
        let raw = vec![
            json!({"id": 10, "product_id": 1, "product": {"id": 1, "name": "Rose Toner", "price": 450}}),
            json!({"id": 2, "name": "Neem Soap", "price": "149"}),
        ];
        let wishlist = WishlistStore::from_raw(&raw);
        assert_eq!(wishlist.len(), 2);
        assert!(wishlist.is_member(ProductId::new(1)));
        assert!(wishlist.is_member(ProductId::new(2)));
        assert!(!wishlist.is_member(ProductId::new(10)));
    }

    #[tokio::test]
    async fn test_logged_out_changes_are_rejected() {
        let api = offline_api();
        let catalog = Catalog::new(vec![product(1, 100, 1)]);
        let mut toaster = Toaster::new();
        let mut wishlist = WishlistStore::default();

        let err = wishlist
            .add(&api, None, ProductId::new(1), &catalog, &mut toaster)
            .await
            .unwrap_err();
        assert!(matches!(err, WishlistError::NotAuthenticated));
        assert!(wishlist.is_empty());
        assert_eq!(toaster.current().unwrap().kind, ToastKind::Error);
    }

    #[tokio::test]
    async fn test_failed_change_leaves_state_unchanged() {
        let api = offline_api();
        let catalog = Catalog::new(vec![product(1, 100, 1)]);
        let mut toaster = Toaster::new();
        let mut wishlist = WishlistStore {
            items: vec![product(1, 100, 1)],
        };

        assert!(
            wishlist
                .remove(&api, Some("t"), ProductId::new(1), &mut toaster)
                .await
                .is_err()
        );
        assert!(wishlist.is_member(ProductId::new(1)));
        assert!(
            wishlist
                .add(&api, Some("t"), ProductId::new(2), &catalog, &mut toaster)
                .await
                .is_err()
        );
        assert_eq!(wishlist.len(), 1);
        assert_eq!(toaster.shown_count(), 2);
    }

    #[tokio::test]
    async fn test_fetch_without_token_is_empty() {
        let wishlist = WishlistStore::fetch(&offline_api(), None).await;
        assert!(wishlist.is_empty());
    }
}
