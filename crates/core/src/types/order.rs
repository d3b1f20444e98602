//! Orders as returned by the backend order endpoints.
//!
//! Order payloads are read-only on the client. Field aliases cover the name
//! variants the backend has used over time.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::id::{OrderId, ProductId};
use super::status::OrderStatus;
use super::timestamp::lenient;

/// A line of a placed order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    pub product_id: ProductId,
    #[serde(default, alias = "name")]
    pub product_name: Option<String>,
    pub quantity: u32,
    /// Unit price charged at order time.
    pub price: Decimal,
    #[serde(default, alias = "size")]
    pub variant_size: Option<String>,
}

impl OrderItem {
    /// `price * quantity`.
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        self.price * Decimal::from(self.quantity)
    }
}

/// A placed order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    #[serde(default, alias = "name")]
    pub customer_name: String,
    #[serde(default, alias = "email")]
    pub customer_email: Option<String>,
    #[serde(default, alias = "address")]
    pub shipping_address: Option<String>,
    #[serde(default)]
    pub payment_method: String,
    #[serde(default)]
    pub status: OrderStatus,
    #[serde(alias = "total_amount")]
    pub total: Decimal,
    #[serde(default, alias = "order_items")]
    pub items: Vec<OrderItem>,
    #[serde(default, deserialize_with = "lenient::deserialize")]
    pub created_at: Option<DateTime<Utc>>,
}

impl Order {
    /// Total units across all lines.
    #[must_use]
    pub fn unit_count(&self) -> u32 {
        self.items.iter().map(|item| item.quantity).sum()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_order_accepts_alias_fields() {
        let json = r#"{
            "id": 12,
            "name": "Meera",
            "email": "meera@example.com",
            "payment_method": "cod",
            "status": "processing",
            "total_amount": "1450.00",
            "created_at": "2024-05-01 10:30:00",
            "order_items": [
                {"product_id": 3, "quantity": 2, "price": 500},
                {"product_id": 4, "name": "Rose Toner", "quantity": 1, "price": "450", "size": "200ml"}
            ]
        }"#;

        let order: Order = serde_json::from_str(json).unwrap();
        assert_eq!(order.id, OrderId::new(12));
        assert_eq!(order.customer_name, "Meera");
        assert_eq!(order.status, OrderStatus::Processing);
        assert_eq!(order.total, Decimal::from(1450));
        assert_eq!(order.unit_count(), 3);
        assert!(order.created_at.is_some());
        assert_eq!(order.items[0].line_total(), Decimal::from(1000));
        assert_eq!(order.items[1].variant_size.as_deref(), Some("200ml"));
    }
}
