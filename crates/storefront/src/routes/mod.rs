//! HTTP route handlers for the storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET  /                       - Home page
//!
//! # Products
//! GET  /products               - Listing (category, search, sort, price window, page)
//! POST /products/refresh       - Re-fetch the catalog (admin only, rate limited)
//! POST /products/retry         - Re-fetch after a failed load (rate limited)
//! GET  /products/{id}          - Product detail with reviews
//!
//! # Cart (HTMX fragments)
//! GET  /cart                   - Cart page
//! POST /cart/add               - Add to cart (returns count badge, triggers toast)
//! POST /cart/update            - Update quantity (returns cart_items fragment)
//! POST /cart/remove            - Remove line (returns cart_items fragment)
//! POST /cart/clear             - Empty the cart
//! GET  /cart/count             - Cart count badge (fragment)
//!
//! # Checkout and orders
//! GET  /checkout               - Checkout form
//! POST /checkout               - Place order
//! GET  /orders                 - Orders for the user or the checkout email
//! GET  /orders/{id}            - Order confirmation
//!
//! # Wishlist
//! GET  /wishlist               - Wishlist page (requires auth)
//! POST /wishlist/add           - Add product
//! POST /wishlist/remove        - Remove product
//!
//! # Auth
//! GET  /auth/login             - Login page
//! POST /auth/login             - Login action
//! GET  /auth/signup            - Signup page
//! POST /auth/signup            - Signup action
//! POST /auth/logout            - Logout action
//!
//! # Account (requires auth)
//! GET  /account                - Profile
//! POST /account                - Update profile
//! ```

pub mod account;
pub mod auth;
pub mod cart;
pub mod checkout;
pub mod home;
pub mod orders;
pub mod products;
pub mod wishlist;

use std::sync::Arc;

use axum::{
    Router,
    http::{HeaderMap, HeaderValue},
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
};
use tower_sessions::Session;
use tracing::info;

use verdant_core::Product;

use crate::api::ApiClient;
use crate::cart::CartStore;
use crate::catalog::Catalog;
use crate::error::AppError;
use crate::middleware::{api_rate_limiter, auth_rate_limiter, refresh_rate_limiter};
use crate::models::{SessionUser, keys};
use crate::notify::{Toast, Toaster, set_flash, take_flash};
use crate::services::AuthStore;
use crate::state::AppState;
use crate::storage::{LocalStorage, SessionStorage, read_json};

// =============================================================================
// Shopper context
// =============================================================================

/// Per-request view of the visitor: their durable storage, a notifier and
/// the catalog snapshot the request works against.
///
/// Handlers mutate the stores through this and finish with one of
/// [`Shopper::page`], [`Shopper::redirect`] or [`Shopper::fragment`], which
/// commit storage and deliver the pending toast.
pub struct Shopper {
    storage: SessionStorage,
    toaster: Toaster,
    catalog: Arc<Catalog>,
}

impl Shopper {
    /// Load the visitor's storage and the catalog (fetched on first use).
    pub async fn load(state: &AppState, session: Session) -> Self {
        let catalog = state.catalog().load().await;
        Self {
            storage: SessionStorage::load(session).await,
            toaster: Toaster::new(),
            catalog,
        }
    }

    /// The visitor's cart, rehydrated against the catalog snapshot.
    pub fn cart(&mut self) -> CartStore<'_> {
        CartStore::restore(&mut self.storage, &mut self.toaster, Arc::clone(&self.catalog))
    }

    /// The visitor's auth state.
    pub async fn auth<'a>(&'a mut self, api: &'a ApiClient) -> AuthStore<'a> {
        AuthStore::restore(api, &mut self.storage).await
    }

    /// The cached logged-in user.
    #[must_use]
    pub fn user(&self) -> Option<SessionUser> {
        read_json(&self.storage, keys::USER)
    }

    /// The stored bearer token.
    #[must_use]
    pub fn token(&self) -> Option<String> {
        self.storage.get_item(keys::TOKEN).filter(|t| !t.is_empty())
    }

    /// Email used at the last checkout.
    #[must_use]
    pub fn customer_email(&self) -> Option<String> {
        self.storage.get_item(keys::CUSTOMER_EMAIL)
    }

    pub fn set_customer_email(&mut self, email: &str) {
        self.storage.set_item(keys::CUSTOMER_EMAIL, email.to_owned());
    }

    #[must_use]
    pub const fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    /// Add a product found outside the snapshot to the shared catalog, so
    /// cart lines holding it survive the next rehydration. An empty catalog
    /// (failed load) stays empty; rehydration then keeps every line anyway.
    pub fn adopt(&mut self, state: &AppState, product: Product) {
        if self.catalog.is_empty() {
            return;
        }
        info!(product_id = %product.id, "Adding product missing from catalog snapshot");
        state.catalog().update_local(product);
        self.catalog = state.catalog().snapshot();
    }

    pub const fn toaster(&mut self) -> &mut Toaster {
        &mut self.toaster
    }

    /// Shared page chrome: greeting, cart badge and the toast to display
    /// (this request's, else a flash left by the previous one).
    pub async fn layout(&mut self) -> Layout {
        let cart_count = self.cart().cart_items_count();
        let toast = match self.toaster.take() {
            Some(toast) => Some(toast),
            None => take_flash(self.storage.session()).await,
        };
        Layout {
            user_name: self.user().map(|u| u.display_name().to_owned()),
            cart_count,
            toast: toast.map(ToastView::from),
        }
    }

    /// Commit storage and render a full page built with the layout.
    ///
    /// # Errors
    ///
    /// Returns an error if the session cannot be written.
    pub async fn page<T, F>(mut self, build: F) -> Result<Response, AppError>
    where
        F: FnOnce(Layout) -> T,
        T: IntoResponse,
    {
        let layout = self.layout().await;
        self.storage.commit().await?;
        Ok(build(layout).into_response())
    }

    /// Commit storage and redirect, carrying the pending toast as a flash.
    ///
    /// # Errors
    ///
    /// Returns an error if the session cannot be written.
    pub async fn redirect(mut self, to: &str) -> Result<Response, AppError> {
        if let Some(toast) = self.toaster.take() {
            set_flash(self.storage.session(), &toast).await;
        }
        self.storage.commit().await?;
        Ok(Redirect::to(to).into_response())
    }

    /// Commit storage and return an HTMX fragment, with the pending toast in
    /// `HX-Trigger`.
    ///
    /// # Errors
    ///
    /// Returns an error if the session cannot be written.
    pub async fn fragment(mut self, body: impl IntoResponse) -> Result<Response, AppError> {
        let toast = self.toaster.take();
        self.storage.commit().await?;
        let mut response = body.into_response();
        if let Some(value) = toast.as_ref().and_then(Toast::hx_trigger) {
            response.headers_mut().insert("HX-Trigger", value);
        }
        Ok(response)
    }

    /// [`Shopper::fragment`] for HTMX requests, else [`Shopper::redirect`].
    ///
    /// # Errors
    ///
    /// Returns an error if the session cannot be written.
    pub async fn respond(
        self,
        headers: &HeaderMap,
        body: impl IntoResponse,
        fallback: &str,
    ) -> Result<Response, AppError> {
        if is_htmx(headers) {
            self.fragment(body).await
        } else {
            self.redirect(fallback).await
        }
    }
}

/// Whether the request was made by HTMX.
#[must_use]
pub fn is_htmx(headers: &HeaderMap) -> bool {
    headers.get("hx-request") == Some(&HeaderValue::from_static("true"))
}

/// Page chrome shared by every full page.
#[derive(Debug, Clone, Default)]
pub struct Layout {
    pub user_name: Option<String>,
    pub cart_count: u32,
    pub toast: Option<ToastView>,
}

/// Toast display data for templates.
#[derive(Debug, Clone)]
pub struct ToastView {
    pub kind: &'static str,
    pub message: String,
}

impl From<Toast> for ToastView {
    fn from(toast: Toast) -> Self {
        Self {
            kind: toast.kind.as_str(),
            message: toast.message,
        }
    }
}

/// Only same-site paths are followed after login.
#[must_use]
pub fn safe_next(next: Option<&str>) -> &str {
    safe_next_or(next, "/account")
}

/// [`safe_next`] with a caller-chosen landing page.
#[must_use]
pub fn safe_next_or<'a>(next: Option<&'a str>, fallback: &'a str) -> &'a str {
    next.filter(|n| n.starts_with('/') && !n.starts_with("//") && !n.contains('\\'))
        .unwrap_or(fallback)
}

// =============================================================================
// Routers
// =============================================================================

/// Create the product routes router.
pub fn product_routes() -> Router<AppState> {
    // Refreshing swaps the snapshot every visitor reads, so it gets its own limit.
    let refresh = Router::new()
        .route("/refresh", post(products::refresh))
        .route("/retry", post(products::retry));
    let refresh = match refresh_rate_limiter() {
        Some(limiter) => refresh.layer(limiter),
        None => refresh,
    };
    Router::new()
        .route("/", get(products::index))
        .route("/{id}", get(products::show))
        .merge(refresh)
}

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    let router = Router::new()
        .route("/", get(cart::show))
        .route("/add", post(cart::add))
        .route("/update", post(cart::update))
        .route("/remove", post(cart::remove))
        .route("/clear", post(cart::clear))
        .route("/count", get(cart::count));
    match api_rate_limiter() {
        Some(limiter) => router.layer(limiter),
        None => router,
    }
}

/// Create the order routes router.
pub fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(orders::index))
        .route("/{id}", get(orders::show))
}

/// Create the wishlist routes router.
pub fn wishlist_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(wishlist::index))
        .route("/add", post(wishlist::add))
        .route("/remove", post(wishlist::remove))
}

/// Create the auth routes router.
pub fn auth_routes() -> Router<AppState> {
    let router = Router::new()
        .route("/login", get(auth::login_page).post(auth::login))
        .route("/signup", get(auth::signup_page).post(auth::signup))
        .route("/logout", post(auth::logout));
    match auth_rate_limiter() {
        Some(limiter) => router.layer(limiter),
        None => router,
    }
}

/// Create all routes for the storefront.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(home::home))
        .nest("/products", product_routes())
        .nest("/cart", cart_routes())
        .route("/checkout", get(checkout::show).post(checkout::submit))
        .nest("/orders", order_routes())
        .nest("/wishlist", wishlist_routes())
        .nest("/auth", auth_routes())
        .route("/account", get(account::profile).post(account::update))
}
