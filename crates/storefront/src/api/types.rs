//! Request and response bodies for the backend REST API.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use verdant_core::{OrderStatus, ProductId, ReviewId};

use crate::models::SessionUser;

/// `POST /auth/login`
#[derive(Debug, Serialize)]
pub struct LoginRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

/// `POST /auth/signup`
#[derive(Debug, Clone, Serialize)]
pub struct SignupRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

/// Token and user returned by login and signup.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: SessionUser,
}

/// `PUT /auth/profile`; only the fields present are changed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProfileUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

impl ProfileUpdate {
    /// Whether the update changes nothing.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.name.is_none() && self.phone.is_none() && self.address.is_none()
    }
}

/// `POST /wishlist`
#[derive(Debug, Serialize)]
pub(crate) struct WishlistAddRequest {
    pub product_id: ProductId,
}

/// A product review.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Review {
    #[serde(default)]
    pub id: Option<ReviewId>,
    #[serde(default, alias = "user_name", alias = "reviewer_name", alias = "name")]
    pub author: Option<String>,
    #[serde(default)]
    pub rating: f64,
    #[serde(default, alias = "review", alias = "text")]
    pub comment: String,
    #[serde(default)]
    pub created_at: Option<String>,
}

/// `PUT /admin/orders/{id}/status`
#[derive(Debug, Serialize)]
pub(crate) struct StatusUpdateRequest {
    pub status: OrderStatus,
}

/// `PUT /admin/products/{id}`; only the fields present are changed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProductUpdate {
    #[serde(
        skip_serializing_if = "Option::is_none",
        with = "rust_decimal::serde::float_option"
    )]
    pub price: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stock: Option<u32>,
}
