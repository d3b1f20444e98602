//! Checkout: form validation, stock re-verification and order submission.
//!
//! Cart stock checks are optimistic (against the catalog snapshot); here each
//! line is re-verified against a fresh `GET /products/{id}` before the order
//! is sent. A line that cannot be verified blocks checkout. If the backend
//! still rejects the order for stock, the cart is emptied so the visitor
//! starts again from current data.

use futures::future::join_all;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, instrument, warn};

use verdant_core::{CartLineItem, Email, OrderId, ProductId, UserId};

use crate::api::{ApiClient, ApiError};
use crate::cart::CartStore;
use crate::catalog::fetch_product;
use crate::models::SessionUser;

/// Payment methods offered at checkout: form value and label.
pub const PAYMENT_METHODS: &[(&str, &str)] = &[
    ("cod", "Cash on Delivery"),
    ("upi", "UPI"),
    ("card", "Credit / Debit Card"),
    ("netbanking", "Net Banking"),
];

/// Digits a phone number may have.
const PHONE_DIGITS: std::ops::RangeInclusive<usize> = 10..=15;

/// Characters a postal code may have.
const POSTAL_CODE_LEN: std::ops::RangeInclusive<usize> = 4..=10;

/// Errors that stop an order from being placed.
#[derive(Debug, Error)]
pub enum CheckoutError {
    #[error("Your cart is empty")]
    EmptyCart,

    #[error("{0}")]
    InvalidForm(String),

    #[error("{}", .0.join(". "))]
    StockIssues(Vec<String>),

    #[error("{0}. Your cart has been cleared; please add the items again")]
    StockRejected(String),

    #[error("We could not place your order. Please try again")]
    Api(#[from] ApiError),
}

// =============================================================================
// Form
// =============================================================================

/// Checkout form as posted.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CheckoutForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub postal_code: String,
    #[serde(default)]
    pub payment_method: String,
}

/// Validated customer details.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomerDetails {
    pub name: String,
    pub email: Email,
    pub phone: String,
    pub shipping_address: String,
    pub payment_method: String,
}

impl CheckoutForm {
    /// Validate the form.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError::InvalidForm` naming the first invalid field.
    pub fn validate(&self) -> Result<CustomerDetails, CheckoutError> {
        let invalid = |message: &str| CheckoutError::InvalidForm(message.to_owned());

        let name = required(&self.name).ok_or_else(|| invalid("Please enter your name"))?;
        let email = Email::parse(&self.email)
            .map_err(|_| invalid("Please enter a valid email address"))?;

        let phone = self.phone.trim();
        let digits = phone.chars().filter(char::is_ascii_digit).count();
        let phone_chars_ok = phone
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, ' ' | '-' | '+' | '(' | ')'));
        if !phone_chars_ok || !PHONE_DIGITS.contains(&digits) {
            return Err(invalid("Please enter a valid phone number"));
        }

        let address =
            required(&self.address).ok_or_else(|| invalid("Please enter your address"))?;
        let city = required(&self.city).ok_or_else(|| invalid("Please enter your city"))?;
        let postal_code = self.postal_code.trim();
        if !POSTAL_CODE_LEN.contains(&postal_code.len())
            || !postal_code
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == ' ')
        {
            return Err(invalid("Please enter a valid postal code"));
        }

        let payment_method = self.payment_method.trim();
        if !PAYMENT_METHODS
            .iter()
            .any(|(value, _)| *value == payment_method)
        {
            return Err(invalid("Please choose a payment method"));
        }

        let region = match required(&self.state) {
            Some(state) => format!("{city}, {state} {postal_code}"),
            None => format!("{city} {postal_code}"),
        };

        Ok(CustomerDetails {
            name: name.to_owned(),
            email,
            phone: phone.to_owned(),
            shipping_address: format!("{address}, {region}"),
            payment_method: payment_method.to_owned(),
        })
    }
}

fn required(value: &str) -> Option<&str> {
    Some(value.trim()).filter(|v| !v.is_empty())
}

// =============================================================================
// Payload
// =============================================================================

/// Body of `POST /orders`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderPayload {
    pub customer_name: String,
    pub customer_email: String,
    pub customer_phone: String,
    pub shipping_address: String,
    pub payment_method: String,
    pub items: Vec<OrderPayloadItem>,
    #[serde(with = "rust_decimal::serde::float")]
    pub total: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<UserId>,
}

/// One line of an order payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderPayloadItem {
    pub product_id: ProductId,
    pub product_name: String,
    pub quantity: u32,
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variant_size: Option<String>,
}

impl OrderPayload {
    /// Build the payload for the given cart lines.
    #[must_use]
    pub fn build(
        details: &CustomerDetails,
        lines: &[CartLineItem],
        user: Option<&SessionUser>,
    ) -> Self {
        Self {
            customer_name: details.name.clone(),
            customer_email: details.email.to_string(),
            customer_phone: details.phone.clone(),
            shipping_address: details.shipping_address.clone(),
            payment_method: details.payment_method.clone(),
            items: lines
                .iter()
                .map(|line| OrderPayloadItem {
                    product_id: line.product_id(),
                    product_name: line.product.name.clone(),
                    quantity: line.quantity,
                    price: line.price,
                    variant_size: line.selected_variant.as_ref().map(|v| v.size.clone()),
                })
                .collect(),
            total: lines.iter().map(CartLineItem::line_total).sum(),
            user_id: user.map(|u| u.id),
        }
    }
}

// =============================================================================
// Service
// =============================================================================

/// Places orders against the backend.
pub struct CheckoutService<'a> {
    api: &'a ApiClient,
}

impl<'a> CheckoutService<'a> {
    #[must_use]
    pub const fn new(api: &'a ApiClient) -> Self {
        Self { api }
    }

    /// Re-verify every line against the backend, concurrently.
    ///
    /// Returns one message per line that is short on stock or could not be
    /// verified.
    #[instrument(skip_all, fields(lines = lines.len()))]
    pub async fn verify_stock(&self, lines: &[CartLineItem]) -> Vec<String> {
        let checks = lines.iter().map(|line| async move {
            let name = line.display_name();
            match fetch_product(self.api, line.product_id()).await {
                Ok(live) if !live.is_in_stock() => Some(format!("{name} is out of stock")),
                Ok(live) if line.quantity > live.stock => Some(format!(
                    "Only {} units of {name} available (you have {} in your cart)",
                    live.stock, line.quantity
                )),
                Ok(_) => None,
                Err(e) => {
                    warn!(product_id = %line.product_id(), error = %e, "Stock verification failed");
                    Some(format!("Could not verify availability of {name}"))
                }
            }
        });
        join_all(checks).await.into_iter().flatten().collect()
    }

    /// Validate, verify and submit the cart as an order.
    ///
    /// On success the cart is emptied silently. On a backend stock rejection
    /// the cart is emptied as well and `CheckoutError::StockRejected` is
    /// returned; the caller should refresh the catalog.
    ///
    /// # Errors
    ///
    /// Returns the reason the order was not placed.
    #[instrument(skip_all)]
    pub async fn submit(
        &self,
        cart: &mut CartStore<'_>,
        details: &CustomerDetails,
        user: Option<&SessionUser>,
        token: Option<&str>,
    ) -> Result<OrderId, CheckoutError> {
        if cart.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }
        let local_issues = cart.check_cart_stock();
        if !local_issues.is_empty() {
            return Err(CheckoutError::StockIssues(local_issues));
        }
        let remote_issues = self.verify_stock(cart.lines()).await;
        if !remote_issues.is_empty() {
            return Err(CheckoutError::StockIssues(remote_issues));
        }

        let payload = OrderPayload::build(details, cart.lines(), user);
        match self.api.create_order(&payload, token).await {
            Ok(order_id) => {
                info!(order_id = %order_id, total = %payload.total, "Order placed");
                cart.complete_order();
                Ok(order_id)
            }
            Err(e) if e.is_stock_rejection() => {
                warn!(error = %e, "Order rejected for stock; clearing cart");
                cart.complete_order();
                let reason = e
                    .user_message()
                    .filter(|m| !m.trim().is_empty())
                    .unwrap_or("Some items in your order are no longer available");
                Err(CheckoutError::StockRejected(
                    reason.trim_end_matches('.').to_owned(),
                ))
            }
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use url::Url;
    use verdant_core::Variant;

    use super::*;
    use crate::catalog::Catalog;
    use crate::catalog::fixtures::product;
    use crate::notify::Toaster;
    use crate::storage::MemoryStorage;

    fn form() -> CheckoutForm {
        CheckoutForm {
            name: "Meera Iyer".to_string(),
            email: "Meera@Example.com".to_string(),
            phone: "+91 98765-43210".to_string(),
            address: "12 Lake Road".to_string(),
            city: "Chennai".to_string(),
            state: "TN".to_string(),
            postal_code: "600001".to_string(),
            payment_method: "cod".to_string(),
        }
    }

    #[test]
    fn test_valid_form() {
        let details = form().validate().unwrap();
        assert_eq!(details.email.as_str(), "meera@example.com");
        assert_eq!(details.shipping_address, "12 Lake Road, Chennai, TN 600001");
    }

    #[test]
    fn test_invalid_fields_are_named() {
        let cases: [(fn(&mut CheckoutForm), &str); 5] = [
            (|f| f.name = "  ".to_string(), "name"),
            (|f| f.email = "meera".to_string(), "email"),
            (|f| f.phone = "12345".to_string(), "phone"),
            (|f| f.postal_code = "6!".to_string(), "postal code"),
            (|f| f.payment_method = "barter".to_string(), "payment method"),
        ];
        for (break_form, field) in cases {
            let mut f = form();
            break_form(&mut f);
            let err = f.validate().unwrap_err();
            assert!(err.to_string().contains(field), "{err} should mention {field}");
        }
    }

    #[test]
    fn test_payload_uses_line_prices() {
        let mut p = product(5, 300, 10);
        p.variants = vec![Variant {
            size: "200ml".to_string(),
            price: Decimal::from(520),
        }];
        let lines = vec![
            CartLineItem::new(&p, p.variant("200ml"), 2),
            CartLineItem::new(&product(6, 99, 3), None, 1),
        ];
        let payload = OrderPayload::build(&form().validate().unwrap(), &lines, None);

        assert_eq!(payload.total, Decimal::from(1139));
        assert_eq!(payload.items[0].variant_size.as_deref(), Some("200ml"));
        assert_eq!(payload.items[0].price, Decimal::from(520));

        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["total"], 1139.0);
        assert!(json.get("user_id").is_none());
        assert!(json["items"][1].get("variant_size").is_none());
    }

    #[tokio::test]
    async fn test_empty_cart_cannot_be_submitted() {
        let api = ApiClient::new(&Url::parse("http://127.0.0.1:9/api").unwrap());
        let mut storage = MemoryStorage::new();
        let mut toaster = Toaster::new();
        let mut cart =
            CartStore::restore(&mut storage, &mut toaster, Arc::new(Catalog::empty()));

        let err = CheckoutService::new(&api)
            .submit(&mut cart, &form().validate().unwrap(), None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, CheckoutError::EmptyCart));
    }

    #[tokio::test]
    async fn test_unverifiable_lines_block_checkout() {
        let api = ApiClient::new(&Url::parse("http://127.0.0.1:9/api").unwrap());
        let lines = vec![CartLineItem::new(&product(1, 100, 5), None, 1)];
        let issues = CheckoutService::new(&api).verify_stock(&lines).await;
        assert_eq!(issues, vec!["Could not verify availability of Product 1"]);
    }
}
