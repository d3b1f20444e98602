//! Order display helpers.
//!
//! Order items only carry a product id, so views join each item with the
//! product it refers to. Lookups run concurrently and a failed lookup leaves
//! the item unenriched.

use std::future::Future;

use futures::future::join_all;

use verdant_core::{OrderItem, Product, ProductId};

use crate::images::ImageResolver;

/// An order item joined with its product, when known.
#[derive(Debug, Clone)]
pub struct EnrichedItem {
    pub item: OrderItem,
    pub product: Option<Product>,
}

impl EnrichedItem {
    /// Product name, else the name stored on the order, else `Product #id`.
    #[must_use]
    pub fn name(&self) -> String {
        self.product
            .as_ref()
            .map(|p| p.name.clone())
            .or_else(|| self.item.product_name.clone())
            .unwrap_or_else(|| format!("Product #{}", self.item.product_id))
    }

    /// Display URL of the product's first image, or a placeholder.
    #[must_use]
    pub fn image(&self, images: &ImageResolver) -> String {
        let images_of = self.product.as_ref().map_or(&[][..], |p| p.images.as_slice());
        images.resolve_first(images_of, &self.name())
    }
}

/// Join every item with its product using `lookup`.
pub async fn enrich_items<F, Fut>(items: &[OrderItem], lookup: F) -> Vec<EnrichedItem>
where
    F: Fn(ProductId) -> Fut,
    Fut: Future<Output = Option<Product>>,
{
    let lookups = items.iter().map(|item| lookup(item.product_id));
    let products = join_all(lookups).await;
    items
        .iter()
        .cloned()
        .zip(products)
        .map(|(item, product)| EnrichedItem { item, product })
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal::Decimal;

    use super::*;
    use crate::catalog::fixtures::product;

    fn item(id: i64, name: Option<&str>) -> OrderItem {
        OrderItem {
            product_id: ProductId::new(id),
            product_name: name.map(str::to_string),
            quantity: 1,
            price: Decimal::from(100),
            variant_size: None,
        }
    }

    #[tokio::test]
    async fn test_enrich_falls_back_per_item() {
        let items = vec![item(1, Some("Old Name")), item(2, Some("Kept")), item(3, None)];
        let enriched = enrich_items(&items, |id| async move {
            (id == ProductId::new(1)).then(|| product(1, 100, 1))
        })
        .await;

        let names: Vec<String> = enriched.iter().map(EnrichedItem::name).collect();
        assert_eq!(names, vec!["Product 1", "Kept", "Product #3"]);
    }

    #[test]
    fn test_image_falls_back_to_placeholder() {
        let images = ImageResolver::for_host("localhost", 5000);
        let mut with_image = product(1, 100, 1);
        with_image.images = vec!["rose.jpg".to_string()];

        let enriched = EnrichedItem {
            item: item(1, None),
            product: Some(with_image),
        };
        assert_eq!(
            enriched.image(&images),
            "http://localhost:5000/uploads/rose.jpg"
        );

        let bare = EnrichedItem {
            item: item(9, None),
            product: None,
        };
        assert!(bare.image(&images).starts_with("data:image/svg+xml;base64,"));
    }
}
