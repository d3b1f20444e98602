//! Shopping cart store.
//!
//! The cart lives in the visitor's durable storage under the `cart` key and is
//! rehydrated per request. Every mutation is written back immediately.
//!
//! Stock is checked optimistically against the catalog snapshot when lines
//! are added or changed; the authoritative check happens at checkout, when
//! each line is re-verified against the backend.

use std::sync::Arc;

use rust_decimal::Decimal;
use thiserror::Error;
use tracing::{debug, info};

use verdant_core::{CartLineItem, Product, Variant};

use crate::catalog::Catalog;
use crate::models::keys;
use crate::notify::Toaster;
use crate::storage::{LocalStorage, read_json, write_json};

/// Why a cart operation was refused.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CartError {
    #[error("{0} cannot be added to the cart")]
    InvalidProduct(String),

    #[error("Quantity must be at least 1")]
    InvalidQuantity,

    #[error("{name} is out of stock")]
    OutOfStock { name: String },

    #[error("Only {available} units of {name} available")]
    InsufficientStock { name: String, available: u32 },

    #[error(
        "Cannot add {requested} more. Only {available} units of {name} available and you already have {in_cart} in your cart"
    )]
    ExceedsStockWithCart {
        name: String,
        requested: u32,
        available: u32,
        in_cart: u32,
    },

    #[error("{name} is no longer available")]
    Unavailable { name: String },

    #[error("Item is not in your cart")]
    NotInCart,
}

/// The visitor's cart.
///
/// Borrows the storage it persists to and the toaster it reports through for
/// the duration of a request.
pub struct CartStore<'a> {
    lines: Vec<CartLineItem>,
    catalog: Arc<Catalog>,
    storage: &'a mut dyn LocalStorage,
    toaster: &'a mut Toaster,
}

impl<'a> CartStore<'a> {
    /// Rehydrate the cart from storage.
    ///
    /// Lines whose product has disappeared from the catalog or is out of
    /// stock are dropped. An empty catalog (not loaded, or failed to load)
    /// keeps every line, since nothing can be verified against it.
    pub fn restore(
        storage: &'a mut dyn LocalStorage,
        toaster: &'a mut Toaster,
        catalog: Arc<Catalog>,
    ) -> Self {
        let saved: Vec<CartLineItem> = read_json(storage, keys::CART).unwrap_or_default();
        let saved_count = saved.len();

        let lines: Vec<CartLineItem> = if catalog.is_empty() {
            saved
        } else {
            saved
                .into_iter()
                .filter(|line| {
                    catalog
                        .by_id(line.product_id())
                        .is_some_and(Product::is_in_stock)
                })
                .collect()
        };

        let mut store = Self {
            lines,
            catalog,
            storage,
            toaster,
        };
        if store.lines.len() != saved_count {
            info!(
                dropped = saved_count - store.lines.len(),
                "Dropped unavailable cart lines"
            );
            store.persist();
        }
        store
    }

    fn persist(&mut self) {
        write_json(&mut *self.storage, keys::CART, &self.lines);
    }

    fn position(&self, cart_item_id: &str) -> Option<usize> {
        self.lines
            .iter()
            .position(|line| line.cart_item_id == cart_item_id)
    }

    #[must_use]
    pub fn lines(&self) -> &[CartLineItem] {
        &self.lines
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    #[must_use]
    pub fn line(&self, cart_item_id: &str) -> Option<&CartLineItem> {
        self.lines
            .iter()
            .find(|line| line.cart_item_id == cart_item_id)
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Add `quantity` units of `product` (optionally a specific variant).
    ///
    /// Adding a product/variant pair already in the cart merges into the
    /// existing line. Exactly one notification is shown: a confirmation on
    /// success or the rejection reason on failure. A rejected add leaves the
    /// cart unchanged.
    ///
    /// # Errors
    ///
    /// Returns the rejection reason.
    pub fn add_to_cart(
        &mut self,
        product: &Product,
        variant: Option<&Variant>,
        quantity: u32,
    ) -> Result<(), CartError> {
        let result = self.try_add(product, variant, quantity);
        match &result {
            Ok(message) => self.toaster.success(message.clone()),
            Err(e) => {
                debug!(product_id = %product.id, error = %e, "Rejected add to cart");
                self.toaster.error(e.to_string());
            }
        }
        result.map(|_| ())
    }

    fn try_add(
        &mut self,
        product: &Product,
        variant: Option<&Variant>,
        quantity: u32,
    ) -> Result<String, CartError> {
        if product.name.trim().is_empty() || product.price.is_sign_negative() {
            return Err(CartError::InvalidProduct(format!("Product #{}", product.id)));
        }
        if variant.is_some_and(|v| product.variant(&v.size).is_none()) {
            return Err(CartError::InvalidProduct(product.name.clone()));
        }
        if quantity == 0 {
            return Err(CartError::InvalidQuantity);
        }
        if !product.is_in_stock() {
            return Err(CartError::OutOfStock {
                name: product.name.clone(),
            });
        }

        let key = CartLineItem::key_for(product.id, variant);
        if let Some(i) = self.position(&key) {
            let in_cart = self.lines.get(i).map_or(0, |line| line.quantity);
            let total = in_cart.saturating_add(quantity);
            if total > product.stock {
                return Err(CartError::ExceedsStockWithCart {
                    name: product.name.clone(),
                    requested: quantity,
                    available: product.stock,
                    in_cart,
                });
            }
            let mut message = String::new();
            if let Some(line) = self.lines.get_mut(i) {
                line.quantity = total;
                message = format!("Updated {} quantity in cart", line.display_name());
            }
            self.persist();
            return Ok(message);
        }

        if quantity > product.stock {
            return Err(CartError::InsufficientStock {
                name: product.name.clone(),
                available: product.stock,
            });
        }
        let line = CartLineItem::new(product, variant, quantity);
        let message = format!("{} added to cart", line.display_name());
        self.lines.push(line);
        self.persist();
        Ok(message)
    }

    /// Remove a line. Removing a line that is not in the cart does nothing.
    pub fn remove_from_cart(&mut self, cart_item_id: &str) -> Option<CartLineItem> {
        let i = self.position(cart_item_id)?;
        let line = self.lines.remove(i);
        self.persist();
        self.toaster
            .info(format!("{} removed from cart", line.display_name()));
        Some(line)
    }

    /// Set a line's quantity. A quantity below 1 removes the line.
    ///
    /// Stock is read from the live catalog, not the line's snapshot. A
    /// successful update is silent; a rejected one shows the reason.
    ///
    /// # Errors
    ///
    /// Returns the rejection reason; the line is left unchanged.
    pub fn update_quantity(&mut self, cart_item_id: &str, quantity: i64) -> Result<(), CartError> {
        let Ok(quantity) = u32::try_from(quantity) else {
            if quantity < 0 {
                self.remove_from_cart(cart_item_id);
                return Ok(());
            }
            return self.reject(CartError::InvalidQuantity);
        };
        if quantity == 0 {
            self.remove_from_cart(cart_item_id);
            return Ok(());
        }

        let Some(i) = self.position(cart_item_id) else {
            debug!(cart_item_id, "Quantity update for unknown cart line");
            return Err(CartError::NotInCart);
        };
        let Some(line) = self.lines.get(i) else {
            return Err(CartError::NotInCart);
        };
        let name = line.product.name.clone();

        let available = match self.catalog.by_id(line.product_id()) {
            Some(live) => live.stock,
            // Nothing to verify against when the catalog is not loaded.
            None if self.catalog.is_empty() => line.product.stock,
            None => return self.reject(CartError::Unavailable { name }),
        };
        if quantity > available {
            return self.reject(CartError::InsufficientStock { name, available });
        }

        if let Some(line) = self.lines.get_mut(i) {
            line.quantity = quantity;
        }
        self.persist();
        Ok(())
    }

    fn reject(&mut self, error: CartError) -> Result<(), CartError> {
        self.toaster.error(error.to_string());
        Err(error)
    }

    /// Empty the cart and confirm it.
    pub fn clear_cart(&mut self) {
        self.lines.clear();
        self.persist();
        self.toaster.info("Cart cleared");
    }

    /// Empty the cart after an order was placed, without a notification.
    pub fn complete_order(&mut self) {
        self.lines.clear();
        self.persist();
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Sum of `price * quantity` over all lines.
    #[must_use]
    pub fn cart_total(&self) -> Decimal {
        self.lines.iter().map(CartLineItem::line_total).sum()
    }

    /// Total units across all lines.
    #[must_use]
    pub fn cart_items_count(&self) -> u32 {
        self.lines.iter().map(|line| line.quantity).sum()
    }

    /// Human-readable problems with the cart against the live catalog.
    #[must_use]
    pub fn check_cart_stock(&self) -> Vec<String> {
        self.lines
            .iter()
            .filter_map(|line| {
                let name = line.display_name();
                match self.catalog.by_id(line.product_id()) {
                    None if self.catalog.is_empty() => None,
                    None => Some(format!("{name} is no longer available")),
                    Some(live) if !live.is_in_stock() => Some(format!("{name} is out of stock")),
                    Some(live) if line.quantity > live.stock => Some(format!(
                        "Only {} units of {name} available (you have {} in your cart)",
                        live.stock, line.quantity
                    )),
                    Some(_) => None,
                }
            })
            .collect()
    }

    /// Whether the cart can proceed to checkout. Shows the first problem
    /// when it cannot.
    pub fn validate_cart_for_checkout(&mut self) -> bool {
        if self.lines.is_empty() {
            self.toaster.error("Your cart is empty");
            return false;
        }
        match self.check_cart_stock().into_iter().next() {
            Some(issue) => {
                self.toaster.error(issue);
                false
            }
            None => true,
        }
    }
}
