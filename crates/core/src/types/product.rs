//! Canonical product shape.
//!
//! The backend is inconsistent about field names; normalization into this
//! type happens once at ingestion, so these fields are always populated with
//! sane values (non-negative stock, rating in `0..=5`, `original_price >=
//! price`).

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};

use super::id::{CategoryId, ProductId};

/// A purchasable sub-option of a product (e.g. a 50ml or 100ml bottle).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Variant {
    /// Display label of the option, e.g. `"100ml"`.
    pub size: String,
    /// Price of this option; overrides the product price once selected.
    pub price: Decimal,
}

/// A product as the storefront sees it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub brand: Option<String>,
    /// Current selling price.
    pub price: Decimal,
    /// "Was" price. Equal to `price` when there is no discount.
    pub original_price: Decimal,
    /// Purchasable units; `0` means unavailable.
    pub stock: u32,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub category_id: Option<CategoryId>,
    /// Raw image references, resolved to URLs by the image resolver.
    #[serde(default)]
    pub images: Vec<String>,
    /// Average rating in `0.0..=5.0`.
    #[serde(default)]
    pub rating: f64,
    #[serde(default)]
    pub review_count: u32,
    #[serde(default)]
    pub variants: Vec<Variant>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl Product {
    /// Whether at least one unit can be purchased.
    #[must_use]
    pub const fn is_in_stock(&self) -> bool {
        self.stock > 0
    }

    /// Whether the product is sold below its original price.
    #[must_use]
    pub fn has_discount(&self) -> bool {
        self.original_price > self.price
    }

    /// Whole-number discount percentage, if discounted.
    #[must_use]
    pub fn discount_percent(&self) -> Option<u32> {
        if !self.has_discount() || self.original_price.is_zero() {
            return None;
        }
        let pct = (self.original_price - self.price) / self.original_price * Decimal::ONE_HUNDRED;
        pct.round().to_u32()
    }

    /// Look up a variant by its size label.
    #[must_use]
    pub fn variant(&self, size: &str) -> Option<&Variant> {
        self.variants.iter().find(|v| v.size == size)
    }

    /// Price of the product with an optional variant selected.
    #[must_use]
    pub fn price_for(&self, variant: Option<&Variant>) -> Decimal {
        variant.map_or(self.price, |v| v.price)
    }

    /// First image reference, if any.
    #[must_use]
    pub fn primary_image(&self) -> Option<&str> {
        self.images.first().map(String::as_str)
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    /// Minimal product used across core tests.
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
mod tests {
    use super::fixtures::product;
    use super::*;

    #[test]
    fn test_discount_percent() {
        let mut p = product(1, 750, 3);
        assert_eq!(p.discount_percent(), None);

        p.original_price = Decimal::from(1000);
        assert!(p.has_discount());
        assert_eq!(p.discount_percent(), Some(25));
    }

    #[test]
    fn test_variant_price_overrides_base() {
        let mut p = product(1, 500, 3);
        p.variants = vec![Variant {
            size: "100ml".to_string(),
            price: Decimal::from(900),
        }];

        assert_eq!(p.price_for(None), Decimal::from(500));
        assert_eq!(p.price_for(p.variant("100ml")), Decimal::from(900));
        assert!(p.variant("200ml").is_none());
    }

    #[test]
    fn test_stock_flags() {
        assert!(product(1, 10, 1).is_in_stock());
        assert!(!product(1, 10, 0).is_in_stock());
    }
}
