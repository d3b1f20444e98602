//! Cart line items.
//!
//! A line is keyed by product and selected variant, so the same product in two
//! sizes occupies two lines. The product is snapshotted when the line is
//! created; stock is re-checked against the live catalog, never against the
//! snapshot.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::id::ProductId;
use super::product::{Product, Variant};

/// One line of the shopping cart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartLineItem {
    /// `"{product_id}"` or `"{product_id}-{variant_size}"`.
    pub cart_item_id: String,
    /// Product as it was when the line was added.
    pub product: Product,
    pub quantity: u32,
    #[serde(default)]
    pub selected_variant: Option<Variant>,
    /// Unit price: the variant price when one is selected, else the product price.
    pub price: Decimal,
}

impl CartLineItem {
    /// Build a new line for `product` with an optional variant.
    #[must_use]
    pub fn new(product: &Product, variant: Option<&Variant>, quantity: u32) -> Self {
        Self {
            cart_item_id: Self::key_for(product.id, variant),
            product: product.clone(),
            quantity,
            selected_variant: variant.cloned(),
            price: product.price_for(variant),
        }
    }

    /// Identity key of the line a product/variant pair lands in.
    ///
    /// ```
    /// use verdant_core::{CartLineItem, ProductId, Variant};
    /// use rust_decimal::Decimal;
    ///
    /// let size = Variant { size: "100ml".into(), price: Decimal::ONE };
    /// assert_eq!(CartLineItem::key_for(ProductId::new(7), None), "7");
    /// assert_eq!(CartLineItem::key_for(ProductId::new(7), Some(&size)), "7-100ml");
    /// ```
    #[must_use]
    pub fn key_for(product_id: ProductId, variant: Option<&Variant>) -> String {
        match variant {
            Some(variant) => format!("{product_id}-{}", variant.size),
            None => product_id.to_string(),
        }
    }

    #[must_use]
    pub const fn product_id(&self) -> ProductId {
        self.product.id
    }

    /// `price * quantity`.
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        self.price * Decimal::from(self.quantity)
    }

    /// Product name with the selected size appended, e.g. `"Rose Toner (200ml)"`.
    #[must_use]
    pub fn display_name(&self) -> String {
        match &self.selected_variant {
            Some(variant) => format!("{} ({})", self.product.name, variant.size),
            None => self.product.name.clone(),
        }
    }
}
