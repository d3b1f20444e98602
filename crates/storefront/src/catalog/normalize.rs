//! Normalization from raw backend product records to [`Product`].
//!
//! Product records have been written by several generations of the backend,
//! so the same datum can live under different field names and numbers may be
//! JSON numbers or numeric strings. Each canonical field has a priority list
//! of raw field names; the first one present (and non-null) wins.
//!
//! | canonical        | raw fields                                             |
//! |------------------|--------------------------------------------------------|
//! | `id`             | `id`, `product_id`                                     |
//! | `name`           | `name`, `title`, `product_name`                        |
//! | `price`          | `price`, `sale_price`, `current_price`                 |
//! | `original_price` | `original_price`, `mrp`, `compare_at_price`            |
//! | `stock`          | `stock`, `stock_quantity`, `quantity`, `inventory`     |
//! | `category`       | `category` (string or `{name}`), `category_name`       |
//! | `category_id`    | `category_id`, `category.id`                           |
//! | `images`         | `images`, `image_url`, `image`, `thumbnail`            |
//! | `rating`         | `rating`, `average_rating`, `avg_rating`               |
//! | `review_count`   | `review_count`, `reviews_count`, `total_reviews`, ...  |
//! | `variants`       | `variants`                                             |
//! | `created_at`     | `created_at`, `createdAt`                              |

use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::warn;

use verdant_core::{CategoryId, Product, ProductId, Variant, parse_timestamp};

pub const ID_FIELDS: &[&str] = &["id", "product_id"];
pub const NAME_FIELDS: &[&str] = &["name", "title", "product_name"];
pub const DESCRIPTION_FIELDS: &[&str] = &["description", "short_description"];
pub const BRAND_FIELDS: &[&str] = &["brand", "brand_name", "vendor"];
pub const PRICE_FIELDS: &[&str] = &["price", "sale_price", "current_price"];
pub const ORIGINAL_PRICE_FIELDS: &[&str] = &["original_price", "mrp", "compare_at_price"];
pub const STOCK_FIELDS: &[&str] = &["stock", "stock_quantity", "quantity", "inventory"];
pub const CATEGORY_FIELDS: &[&str] = &["category", "category_name"];
pub const CATEGORY_ID_FIELDS: &[&str] = &["category_id"];
pub const IMAGE_LIST_FIELDS: &[&str] = &["images"];
pub const SINGLE_IMAGE_FIELDS: &[&str] = &["image_url", "image", "thumbnail"];
pub const RATING_FIELDS: &[&str] = &["rating", "average_rating", "avg_rating"];
pub const REVIEW_COUNT_FIELDS: &[&str] = &[
    "review_count",
    "reviews_count",
    "total_reviews",
    "num_reviews",
];
pub const VARIANT_FIELDS: &[&str] = &["variants"];
pub const CREATED_AT_FIELDS: &[&str] = &["created_at", "createdAt"];

/// Keys an image object may carry its URL under.
const IMAGE_OBJECT_FIELDS: &[&str] = &["url", "image_url", "path", "src"];

/// Keys a variant may carry its label under.
const VARIANT_LABEL_FIELDS: &[&str] = &["size", "name", "label"];

/// Highest rating a product can have.
const MAX_RATING: f64 = 5.0;

/// Reasons a raw record cannot become a [`Product`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum NormalizeError {
    #[error("product record is not a JSON object")]
    NotAnObject,

    #[error("product record has no usable id")]
    MissingId,
}

/// Normalize every record, skipping (and logging) the unusable ones.
#[must_use]
pub fn normalize_products(raw: &[Value]) -> Vec<Product> {
    raw.iter()
        .filter_map(|record| match normalize_product(record) {
            Ok(product) => Some(product),
            Err(e) => {
                warn!(error = %e, record = %record, "Skipping product record");
                None
            }
        })
        .collect()
}

/// Normalize a single raw record.
///
/// # Errors
///
/// Returns an error if the record is not an object or has no usable id.
pub fn normalize_product(raw: &Value) -> Result<Product, NormalizeError> {
    let obj = raw.as_object().ok_or(NormalizeError::NotAnObject)?;

    let id = first(obj, ID_FIELDS)
        .and_then(as_i64)
        .map(ProductId::new)
        .ok_or(NormalizeError::MissingId)?;

    let name = first(obj, NAME_FIELDS)
        .and_then(as_string)
        .unwrap_or_else(|| format!("Product #{id}"));

    let price = first(obj, PRICE_FIELDS)
        .and_then(as_decimal)
        .unwrap_or_default()
        .max(Decimal::ZERO);
    let original_price = first(obj, ORIGINAL_PRICE_FIELDS)
        .and_then(as_decimal)
        .map_or(price, |original| original.max(price));

    let stock = first(obj, STOCK_FIELDS).and_then(as_u32).unwrap_or(0);

    let rating = first(obj, RATING_FIELDS)
        .and_then(as_f64)
        .filter(|r| r.is_finite())
        .map_or(0.0, |r| r.clamp(0.0, MAX_RATING));

    Ok(Product {
        id,
        name,
        description: first(obj, DESCRIPTION_FIELDS).and_then(as_string),
        brand: first(obj, BRAND_FIELDS).and_then(as_string),
        price,
        original_price,
        stock,
        category: category_label(obj),
        category_id: category_id(obj),
        images: images(obj),
        rating,
        review_count: first(obj, REVIEW_COUNT_FIELDS)
            .and_then(as_u32)
            .unwrap_or(0),
        variants: variants(obj),
        created_at: created_at(obj),
    })
}

// =============================================================================
// Field lookup
// =============================================================================

/// First of `fields` that is present and not null.
fn first<'a>(obj: &'a Map<String, Value>, fields: &[&str]) -> Option<&'a Value> {
    fields
        .iter()
        .find_map(|field| obj.get(*field).filter(|value| !value.is_null()))
}

fn as_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.trim().to_owned()).filter(|s| !s.is_empty()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn as_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn as_decimal(value: &Value) -> Option<Decimal> {
    let text = match value {
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.trim().replace(',', ""),
        _ => return None,
    };
    Decimal::from_str(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .ok()
}

fn as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Non-negative count; negatives clamp to zero, fractions truncate.
fn as_u32(value: &Value) -> Option<u32> {
    let n = match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(truncate_f64))?,
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().map(truncate_f64))?
        }
        _ => return None,
    };
    Some(u32::try_from(n.max(0)).unwrap_or(u32::MAX))
}

#[allow(clippy::cast_possible_truncation)]
fn truncate_f64(f: f64) -> i64 {
    f.trunc() as i64
}

// =============================================================================
// Composite fields
// =============================================================================

fn category_label(obj: &Map<String, Value>) -> String {
    first(obj, CATEGORY_FIELDS)
        .and_then(|value| match value {
            Value::Object(category) => category.get("name").and_then(as_string),
            other => as_string(other),
        })
        .unwrap_or_default()
}

fn category_id(obj: &Map<String, Value>) -> Option<CategoryId> {
    first(obj, CATEGORY_ID_FIELDS)
        .and_then(as_i64)
        .or_else(|| obj.get("category").and_then(|c| c.get("id")).and_then(as_i64))
        .map(CategoryId::new)
}

fn images(obj: &Map<String, Value>) -> Vec<String> {
    let listed: Vec<String> = first(obj, IMAGE_LIST_FIELDS)
        .map(image_list)
        .unwrap_or_default();
    if !listed.is_empty() {
        return listed;
    }
    first(obj, SINGLE_IMAGE_FIELDS)
        .and_then(image_ref)
        .into_iter()
        .collect()
}

/// An `images` value: an array, a JSON-encoded array string, or a single image.
fn image_list(value: &Value) -> Vec<String> {
    match value {
        Value::Array(items) => items.iter().filter_map(image_ref).collect(),
        Value::String(s) if s.trim_start().starts_with('[') => {
            serde_json::from_str::<Value>(s).map_or_else(|_| Vec::new(), |v| image_list(&v))
        }
        other => image_ref(other).into_iter().collect(),
    }
}

/// A single image reference: a string or an object with a URL field.
fn image_ref(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.trim().to_owned()).filter(|s| !s.is_empty()),
        Value::Object(image) => first(image, IMAGE_OBJECT_FIELDS).and_then(as_string),
        _ => None,
    }
}

fn variants(obj: &Map<String, Value>) -> Vec<Variant> {
    let Some(value) = first(obj, VARIANT_FIELDS) else {
        return Vec::new();
    };
    let parsed;
    let items = match value {
        Value::Array(items) => items,
        Value::String(s) => match serde_json::from_str::<Value>(s) {
            Ok(Value::Array(items)) => {
                parsed = items;
                &parsed
            }
            _ => return Vec::new(),
        },
        _ => return Vec::new(),
    };
    items
        .iter()
        .filter_map(|item| {
            let variant = item.as_object()?;
            let size = first(variant, VARIANT_LABEL_FIELDS).and_then(as_string)?;
            let price = first(variant, PRICE_FIELDS)
                .and_then(as_decimal)?
                .max(Decimal::ZERO);
            Some(Variant { size, price })
        })
        .collect()
}

fn created_at(obj: &Map<String, Value>) -> Option<DateTime<Utc>> {
    first(obj, CREATED_AT_FIELDS)
        .and_then(Value::as_str)
        .and_then(parse_timestamp)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_canonical_record() {
        let raw = json!({
            "id": 7,
            "name": "Kumkumadi Face Oil",
            "description": "Saffron night oil",
            "brand": "Verdant",
            "price": 1299.5,
            "original_price": "1599",
            "stock": 12,
            "category": "Face Care",
            "category_id": 1,
            "images": ["/uploads/oil.jpg"],
            "rating": 4.6,
            "review_count": 31,
            "variants": [{"size": "30ml", "price": 1299.5}, {"size": "50ml", "price": "1899"}],
            "created_at": "2024-03-02T08:00:00Z"
        });

        let p = normalize_product(&raw).unwrap();
        assert_eq!(p.id, ProductId::new(7));
        assert_eq!(p.price, Decimal::new(12995, 1));
        assert_eq!(p.original_price, Decimal::from(1599));
        assert_eq!(p.stock, 12);
        assert_eq!(p.category_id, Some(CategoryId::new(1)));
        assert_eq!(p.images, vec!["/uploads/oil.jpg".to_string()]);
        assert_eq!(p.variants.len(), 2);
        assert_eq!(p.variants[1].price, Decimal::from(1899));
        assert!(p.created_at.is_some());
    }

    #[test]
    fn test_alternate_field_names() {
        let raw = json!({
            "product_id": "9",
            "title": "Neem Soap",
            "sale_price": "149.00",
            "mrp": 199,
            "stock_quantity": "4",
            "category": {"id": 2, "name": "Body Care"},
            "image_url": "neem.jpg",
            "average_rating": "3.5",
            "reviews_count": 8,
            "createdAt": "2024-01-10 12:00:00"
        });

        let p = normalize_product(&raw).unwrap();
        assert_eq!(p.id, ProductId::new(9));
        assert_eq!(p.name, "Neem Soap");
        assert_eq!(p.price, Decimal::from(149));
        assert_eq!(p.original_price, Decimal::from(199));
        assert_eq!(p.stock, 4);
        assert_eq!(p.category, "Body Care");
        assert_eq!(p.category_id, Some(CategoryId::new(2)));
        assert_eq!(p.images, vec!["neem.jpg".to_string()]);
        assert!((p.rating - 3.5).abs() < f64::EPSILON);
        assert_eq!(p.review_count, 8);
        assert!(p.created_at.is_some());
    }

    #[test]
    fn test_priority_order_first_present_wins() {
        let raw = json!({"id": 1, "name": null, "title": "Fallback Title", "price": 10, "sale_price": 5});
        let p = normalize_product(&raw).unwrap();
        assert_eq!(p.name, "Fallback Title");
        assert_eq!(p.price, Decimal::from(10));
    }

    #[test]
    fn test_sanitizes_values() {
        let raw = json!({
            "id": 3,
            "price": -20,
            "original_price": 0,
            "stock": -5,
            "rating": 9.2
        });
        let p = normalize_product(&raw).unwrap();
        assert_eq!(p.price, Decimal::ZERO);
        assert_eq!(p.original_price, Decimal::ZERO);
        assert_eq!(p.stock, 0);
        assert!((p.rating - 5.0).abs() < f64::EPSILON);
        assert_eq!(p.name, "Product #3");
        assert!(p.images.is_empty());
    }

    #[test]
    fn test_image_objects_and_encoded_lists() {
        let objects = json!({"id": 1, "images": [{"url": "a.jpg"}, {"path": "/uploads/b.jpg"}, 42]});
        assert_eq!(
            normalize_product(&objects).unwrap().images,
            vec!["a.jpg".to_string(), "/uploads/b.jpg".to_string()]
        );

        let encoded = json!({"id": 1, "images": "[\"c.jpg\", \"d.jpg\"]"});
        assert_eq!(normalize_product(&encoded).unwrap().images.len(), 2);

        let empty_list = json!({"id": 1, "images": [], "thumbnail": "t.jpg"});
        assert_eq!(
            normalize_product(&empty_list).unwrap().images,
            vec!["t.jpg".to_string()]
        );
    }

    #[test]
    fn test_records_without_id_are_skipped() {
        let raw = vec![
            json!({"name": "No id"}),
            json!("not an object"),
            json!({"id": 2, "name": "Kept"}),
        ];
        let products = normalize_products(&raw);
        assert_eq!(products.len(), 1);
        assert_eq!(products[0].name, "Kept");
        assert_eq!(
            normalize_product(&json!([])).unwrap_err(),
            NormalizeError::NotAnObject
        );
    }
}
