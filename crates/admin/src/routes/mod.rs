//! HTTP route handlers for admin.
//!
//! # Route Structure
//!
//! ```text
//! # Auth (public)
//! GET  /auth/login             - Login page
//! POST /auth/login             - Login action (admin role only)
//! POST /auth/logout            - Logout action
//!
//! # Dashboard
//! GET  /                       - Dashboard overview
//!
//! # Products
//! GET  /products               - Product listing
//! POST /products/refresh       - Re-fetch the catalog
//! POST /products/{id}/update   - Change price and/or stock
//! POST /products/{id}/delete   - Delete product
//!
//! # Orders
//! GET  /orders                 - Order listing (?status=)
//! GET  /orders/{id}            - Order detail
//! POST /orders/{id}/status     - Change order status
//!
//! # Reports
//! GET  /reports                - Sales report
//! ```
//!
//! Everything outside `/auth` requires a logged-in admin. Every mutation
//! redirects back with a flash toast.

pub mod auth;
pub mod dashboard;
pub mod orders;
pub mod products;
pub mod reports;

use askama::Template;
use axum::{
    Router,
    middleware::from_extractor,
    response::{Html, Redirect},
    routing::{get, post},
};
use tower_sessions::Session;

use verdant_core::OrderStatus;
use verdant_storefront::notify::{Toast, set_flash, take_flash};

use crate::error::Result;
use crate::middleware::{RequireAdminAuth, auth_rate_limiter, current_admin};
use crate::state::AppState;

/// Build the admin routes: the login pages plus every guarded page.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(dashboard::index))
        .route("/products", get(products::index))
        .route("/products/refresh", post(products::refresh))
        .route("/products/{id}/update", post(products::update))
        .route("/products/{id}/delete", post(products::delete))
        .route("/orders", get(orders::index))
        .route("/orders/{id}", get(orders::show))
        .route("/orders/{id}/status", post(orders::update_status))
        .route("/reports", get(reports::index))
        .route_layer(from_extractor::<RequireAdminAuth>())
        .merge(auth_routes())
}

/// Create the auth routes router.
pub fn auth_routes() -> Router<AppState> {
    let router = Router::new()
        .route("/auth/login", get(auth::login_page).post(auth::login))
        .route("/auth/logout", post(auth::logout));
    match auth_rate_limiter() {
        Some(limiter) => router.layer(limiter),
        None => router,
    }
}

/// Shared page chrome: active nav entry, the logged-in admin and the
/// pending flash toast.
#[derive(Debug, Clone)]
pub struct Layout {
    pub current_path: &'static str,
    pub admin_name: Option<String>,
    pub toast: Option<Toast>,
}

impl Layout {
    /// Chrome for the page at `current_path`, consuming the flash toast.
    pub async fn load(session: &Session, current_path: &'static str) -> Self {
        Self {
            current_path,
            admin_name: current_admin(session).await.map(|admin| admin.name),
            toast: take_flash(session).await,
        }
    }

    /// Whether `path` is the active nav entry.
    #[must_use]
    pub fn is_active(&self, path: &str) -> bool {
        if path == "/" {
            self.current_path == "/"
        } else {
            self.current_path.starts_with(path)
        }
    }
}

/// Render a template into an HTML response.
pub fn render(template: &impl Template) -> Result<Html<String>> {
    Ok(Html(template.render()?))
}

/// Redirect to `to`, showing `toast` on the next page.
pub async fn redirect_with(session: &Session, toast: Toast, to: &str) -> Redirect {
    set_flash(session, &toast).await;
    Redirect::to(to)
}

/// CSS modifier for an order status badge.
#[must_use]
pub const fn status_class(status: OrderStatus) -> &'static str {
    match status {
        OrderStatus::Pending => "badge-pending",
        OrderStatus::Processing => "badge-processing",
        OrderStatus::Shipped => "badge-shipped",
        OrderStatus::Delivered => "badge-delivered",
        OrderStatus::Cancelled => "badge-cancelled",
        OrderStatus::Unknown => "badge-unknown",
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Datelike;
    use verdant_storefront::filters;

    use super::*;

    #[derive(Template)]
    #[template(source = "{{ \"\"|current_year }} {{ rating|stars }}", ext = "txt")]
    struct RatingFooterTemplate {
        rating: f64,
    }

    #[test]
    fn test_shared_filters_render() {
        let rendered = RatingFooterTemplate { rating: 3.6 }.render().unwrap();
        let year = chrono::Utc::now().year();
        assert_eq!(rendered, format!("{year} ★★★★☆"));
    }

    #[test]
    fn test_layout_active_entry() {
        let layout = Layout {
            current_path: "/orders",
            admin_name: None,
            toast: None,
        };
        assert!(layout.is_active("/orders"));
        assert!(!layout.is_active("/"));
        assert!(!layout.is_active("/products"));
    }
}
