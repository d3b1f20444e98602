//! Backend REST API client.
//!
//! # Architecture
//!
//! - One shared `reqwest` client behind an `Arc`, cheap to clone into state
//! - Responses are parsed as `serde_json::Value` first; the envelope helpers in
//!   [`envelope`] then locate the payload, because the backend is not
//!   consistent about response shapes
//! - Product records are returned raw: normalization into
//!   [`verdant_core::Product`] is the catalog's job
//! - Bearer tokens are passed per call (visitor token on the storefront,
//!   service token in the admin)

pub mod envelope;
pub mod types;

use std::sync::Arc;

use reqwest::{RequestBuilder, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, instrument, warn};
use url::Url;

use verdant_core::{Order, OrderId, OrderStatus, ProductId};

use crate::models::SessionUser;

pub use types::{
    AuthResponse, LoginRequest, ProductUpdate, ProfileUpdate, Review, SignupRequest,
};
use types::{StatusUpdateRequest, WishlistAddRequest};

/// Longest body excerpt written to logs.
const LOG_BODY_CHARS: usize = 500;

/// Errors that can occur when talking to the backend.
#[derive(Debug, Error)]
pub enum ApiError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Endpoint URL could not be built.
    #[error("Invalid endpoint: {0}")]
    Url(#[from] url::ParseError),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Missing or rejected credentials.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// The backend refused the request.
    #[error("Backend rejected request ({status}): {message}")]
    Rejected { status: u16, message: String },

    /// The payload was not where any known response shape puts it.
    #[error("Unexpected response shape: {0}")]
    UnexpectedShape(String),
}

impl ApiError {
    /// Message suitable for showing to the user, when the backend sent one.
    #[must_use]
    pub fn user_message(&self) -> Option<&str> {
        match self {
            Self::NotFound(message)
            | Self::Unauthorized(message)
            | Self::Rejected { message, .. } => Some(message.as_str()),
            _ => None,
        }
    }

    /// Whether the backend refused an order because of stock.
    #[must_use]
    pub fn is_stock_rejection(&self) -> bool {
        matches!(self, Self::Rejected { message, .. } if message.to_lowercase().contains("stock"))
    }
}

fn truncate(body: &str) -> String {
    body.chars().take(LOG_BODY_CHARS).collect()
}

// =============================================================================
// ApiClient
// =============================================================================

/// Client for the backend REST API.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ApiClientInner>,
}

struct ApiClientInner {
    client: reqwest::Client,
    /// Always ends with `/` so relative joins append.
    base_url: Url,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.inner.base_url.as_str())
            .finish_non_exhaustive()
    }
}

impl ApiClient {
    /// Create a client for the API rooted at `base_url`.
    #[must_use]
    pub fn new(base_url: &Url) -> Self {
        let mut base_url = base_url.clone();
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        Self {
            inner: Arc::new(ApiClientInner {
                client: reqwest::Client::new(),
                base_url,
            }),
        }
    }

    /// Root URL of the API.
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.inner.base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url, ApiError> {
        Ok(self.inner.base_url.join(path.trim_start_matches('/'))?)
    }

    /// Send a request and return the parsed body of a successful response.
    async fn send(&self, request: RequestBuilder, token: Option<&str>) -> Result<Value, ApiError> {
        let request = match token {
            Some(token) => request.bearer_auth(token),
            None => request,
        };
        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;

        let body = if text.trim().is_empty() {
            Value::Null
        } else {
            match serde_json::from_str::<Value>(&text) {
                Ok(body) => body,
                Err(e) if status.is_success() => {
                    warn!(error = %e, body = %truncate(&text), "Failed to parse backend response");
                    return Err(ApiError::Parse(e));
                }
                Err(_) => Value::String(text.trim().chars().take(200).collect()),
            }
        };

        if !status.is_success() {
            let message = envelope::message(&body)
                .or_else(|| body.as_str().map(str::to_owned))
                .unwrap_or_else(|| status.canonical_reason().unwrap_or("error").to_owned());
            warn!(
                status = %status,
                body = %truncate(&text),
                "Backend returned non-success status"
            );
            return Err(match status {
                StatusCode::NOT_FOUND => ApiError::NotFound(message),
                StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                    ApiError::Unauthorized(message)
                }
                _ => ApiError::Rejected {
                    status: status.as_u16(),
                    message,
                },
            });
        }

        if envelope::is_failure(&body) {
            let message = envelope::message(&body).unwrap_or_else(|| "Request failed".to_owned());
            debug!(message = %message, "Backend envelope reported failure");
            return Err(ApiError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        Ok(body)
    }

    async fn get(&self, url: Url, token: Option<&str>) -> Result<Value, ApiError> {
        let request = self.inner.client.get(url);
        self.send(request, token).await
    }

    async fn post<B: Serialize + Sync>(
        &self,
        path: &str,
        body: &B,
        token: Option<&str>,
    ) -> Result<Value, ApiError> {
        let request = self.inner.client.post(self.endpoint(path)?).json(body);
        self.send(request, token).await
    }

    async fn put<B: Serialize + Sync>(
        &self,
        path: &str,
        body: &B,
        token: Option<&str>,
    ) -> Result<Value, ApiError> {
        let request = self.inner.client.put(self.endpoint(path)?).json(body);
        self.send(request, token).await
    }

    async fn delete(&self, path: &str, token: Option<&str>) -> Result<Value, ApiError> {
        let request = self.inner.client.delete(self.endpoint(path)?);
        self.send(request, token).await
    }

    fn list(body: Value, keys: &[&str], what: &str) -> Result<Vec<Value>, ApiError> {
        envelope::extract_list(body, keys).ok_or_else(|| ApiError::UnexpectedShape(what.to_owned()))
    }

    fn record(body: Value, keys: &[&str], what: &str) -> Result<Value, ApiError> {
        envelope::extract_record(body, keys)
            .ok_or_else(|| ApiError::UnexpectedShape(what.to_owned()))
    }

    fn decode<T: DeserializeOwned>(value: Value) -> Result<T, ApiError> {
        Ok(serde_json::from_value(value)?)
    }

    // =========================================================================
    // Products
    // =========================================================================

    /// `GET /products`; raw product records.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or no product list is found.
    #[instrument(skip(self))]
    pub async fn products(&self) -> Result<Vec<Value>, ApiError> {
        let body = self.get(self.endpoint("products")?, None).await?;
        Self::list(body, &["products"], "product list")
    }

    /// `GET /products/{id}`; the raw product record.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the product does not exist.
    #[instrument(skip(self), fields(product_id = %id))]
    pub async fn product(&self, id: ProductId) -> Result<Value, ApiError> {
        let body = self.get(self.endpoint(&format!("products/{id}"))?, None).await?;
        Self::record(body, &["product"], "product record")
    }

    /// `GET /reviews/product/{id}`. Malformed reviews are skipped.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self), fields(product_id = %id))]
    pub async fn reviews(&self, id: ProductId) -> Result<Vec<Review>, ApiError> {
        let body = self
            .get(self.endpoint(&format!("reviews/product/{id}"))?, None)
            .await?;
        let raw = Self::list(body, &["reviews"], "review list")?;
        Ok(raw
            .into_iter()
            .filter_map(|value| match serde_json::from_value(value) {
                Ok(review) => Some(review),
                Err(e) => {
                    debug!(error = %e, "Skipping malformed review");
                    None
                }
            })
            .collect())
    }

    // =========================================================================
    // Orders
    // =========================================================================

    /// `POST /orders`; returns the id of the placed order.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend refuses the order (including stock
    /// rejections, see [`ApiError::is_stock_rejection`]).
    #[instrument(skip(self, payload, token))]
    pub async fn create_order<P: Serialize + Sync>(
        &self,
        payload: &P,
        token: Option<&str>,
    ) -> Result<OrderId, ApiError> {
        let body = self.post("orders", payload, token).await?;
        placed_order_id(&body)
            .ok_or_else(|| ApiError::UnexpectedShape("order id in order response".to_owned()))
    }

    /// `GET /orders/{id}`
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the order does not exist.
    #[instrument(skip(self, token), fields(order_id = %id))]
    pub async fn order(&self, id: OrderId, token: Option<&str>) -> Result<Order, ApiError> {
        let body = self.get(self.endpoint(&format!("orders/{id}"))?, token).await?;
        Self::decode(Self::record(body, &["order"], "order record")?)
    }

    /// `GET /orders?email=`; orders placed with an email address.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self, token))]
    pub async fn orders_for_email(
        &self,
        email: &str,
        token: Option<&str>,
    ) -> Result<Vec<Order>, ApiError> {
        let mut url = self.endpoint("orders")?;
        url.query_pairs_mut().append_pair("email", email);
        let body = self.get(url, token).await?;
        Self::decode_orders(Self::list(body, &["orders"], "order list")?)
    }

    fn decode_orders(raw: Vec<Value>) -> Result<Vec<Order>, ApiError> {
        raw.into_iter().map(Self::decode).collect()
    }

    // =========================================================================
    // Auth
    // =========================================================================

    /// `POST /auth/login`
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Unauthorized`] for bad credentials.
    #[instrument(skip(self, request), fields(email = %request.email))]
    pub async fn login(&self, request: &LoginRequest<'_>) -> Result<AuthResponse, ApiError> {
        let body = self.post("auth/login", request, None).await?;
        decode_auth(body)
    }

    /// `POST /auth/signup`
    ///
    /// # Errors
    ///
    /// Returns an error if the backend refuses the registration.
    #[instrument(skip(self, request), fields(email = %request.email))]
    pub async fn signup(&self, request: &SignupRequest) -> Result<AuthResponse, ApiError> {
        let body = self.post("auth/signup", request, None).await?;
        decode_auth(body)
    }

    /// `GET /auth/me`
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Unauthorized`] if the token is not accepted.
    #[instrument(skip(self, token))]
    pub async fn me(&self, token: &str) -> Result<SessionUser, ApiError> {
        let body = self.get(self.endpoint("auth/me")?, Some(token)).await?;
        Self::decode(Self::record(body, &["user"], "user record")?)
    }

    /// `PUT /auth/profile`; returns the updated user when the backend sends it.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend refuses the update.
    #[instrument(skip(self, token, update))]
    pub async fn update_profile(
        &self,
        token: &str,
        update: &ProfileUpdate,
    ) -> Result<Option<SessionUser>, ApiError> {
        let body = self.put("auth/profile", update, Some(token)).await?;
        Ok(envelope::extract_record(body, &["user"]).and_then(|user| {
            serde_json::from_value(user)
                .map_err(|e| debug!(error = %e, "Profile response carried no usable user"))
                .ok()
        }))
    }

    // =========================================================================
    // Wishlist
    // =========================================================================

    /// `GET /wishlist`; raw product records.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self, token))]
    pub async fn wishlist(&self, token: &str) -> Result<Vec<Value>, ApiError> {
        let body = self.get(self.endpoint("wishlist")?, Some(token)).await?;
        Self::list(body, &["wishlist", "items", "products"], "wishlist")
    }

    /// `POST /wishlist`; the updated list when the backend returns one.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend refuses the change.
    #[instrument(skip(self, token), fields(product_id = %id))]
    pub async fn add_to_wishlist(
        &self,
        token: &str,
        id: ProductId,
    ) -> Result<Option<Vec<Value>>, ApiError> {
        let body = self
            .post("wishlist", &WishlistAddRequest { product_id: id }, Some(token))
            .await?;
        Ok(envelope::extract_list(body, &["wishlist", "items", "products"]))
    }

    /// `DELETE /wishlist/{id}`; the updated list when the backend returns one.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend refuses the change.
    #[instrument(skip(self, token), fields(product_id = %id))]
    pub async fn remove_from_wishlist(
        &self,
        token: &str,
        id: ProductId,
    ) -> Result<Option<Vec<Value>>, ApiError> {
        let body = self.delete(&format!("wishlist/{id}"), Some(token)).await?;
        Ok(envelope::extract_list(body, &["wishlist", "items", "products"]))
    }

    // =========================================================================
    // Admin
    // =========================================================================

    /// `GET /admin/orders`
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the token is rejected.
    #[instrument(skip(self, token))]
    pub async fn admin_orders(&self, token: &str) -> Result<Vec<Order>, ApiError> {
        let body = self.get(self.endpoint("admin/orders")?, Some(token)).await?;
        Self::decode_orders(Self::list(body, &["orders"], "order list")?)
    }

    /// `PUT /admin/orders/{id}/status`
    ///
    /// # Errors
    ///
    /// Returns an error if the backend refuses the change.
    #[instrument(skip(self, token), fields(order_id = %id, status = %status))]
    pub async fn update_order_status(
        &self,
        token: &str,
        id: OrderId,
        status: OrderStatus,
    ) -> Result<(), ApiError> {
        self.put(
            &format!("admin/orders/{id}/status"),
            &StatusUpdateRequest { status },
            Some(token),
        )
        .await?;
        Ok(())
    }

    /// `PUT /admin/products/{id}`; the updated raw record when returned.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend refuses the change.
    #[instrument(skip(self, token, update), fields(product_id = %id))]
    pub async fn update_product(
        &self,
        token: &str,
        id: ProductId,
        update: &ProductUpdate,
    ) -> Result<Option<Value>, ApiError> {
        let body = self
            .put(&format!("admin/products/{id}"), update, Some(token))
            .await?;
        Ok(envelope::extract_record(body, &["product"]))
    }

    /// `DELETE /admin/products/{id}`
    ///
    /// # Errors
    ///
    /// Returns an error if the backend refuses the deletion.
    #[instrument(skip(self, token), fields(product_id = %id))]
    pub async fn delete_product(&self, token: &str, id: ProductId) -> Result<(), ApiError> {
        self.delete(&format!("admin/products/{id}"), Some(token))
            .await?;
        Ok(())
    }
}

/// Token and user from a login/signup body, at the top level or under `data`.
fn decode_auth(body: Value) -> Result<AuthResponse, ApiError> {
    let payload = match body {
        Value::Object(mut map) if !map.contains_key("token") => {
            map.remove("data").unwrap_or(Value::Object(map))
        }
        other => other,
    };
    Ok(serde_json::from_value(payload)?)
}

/// Order id from an order-creation body.
fn placed_order_id(body: &Value) -> Option<OrderId> {
    let candidates = [
        body.get("order").and_then(|order| order.get("id")),
        body.get("data").and_then(|data| data.get("id")),
        body.get("order_id"),
        body.get("orderId"),
        body.get("id"),
    ];
    candidates.into_iter().flatten().find_map(|value| match value {
        Value::Number(n) => n.as_i64().map(OrderId::new),
        Value::String(s) => s.parse().ok(),
        _ => None,
    })
}
