//! Wishlist route handlers.

use askama::Template;
use askama_web::WebTemplate;
use axum::{Form, extract::State, http::HeaderMap, response::Response};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use verdant_core::ProductId;

use crate::error::Result;
use crate::filters;
use crate::middleware::RequireAuth;
use crate::routes::products::ProductView;
use crate::routes::{Layout, Shopper};
use crate::services::WishlistStore;
use crate::state::AppState;

/// Wishlist change form data.
#[derive(Debug, Deserialize)]
pub struct WishlistForm {
    pub product_id: ProductId,
}

/// Wishlist page template.
#[derive(Template, WebTemplate)]
#[template(path = "wishlist/index.html")]
pub struct WishlistTemplate {
    pub layout: Layout,
    pub products: Vec<ProductView>,
}

/// Wishlist toggle button fragment (for HTMX).
#[derive(Template, WebTemplate)]
#[template(path = "partials/wishlist_button.html")]
pub struct WishlistButtonTemplate {
    pub product_id: ProductId,
    pub wishlisted: bool,
}

/// Display the wishlist.
#[instrument(skip(state, session, auth))]
pub async fn index(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(auth): RequireAuth,
) -> Result<Response> {
    let wishlist = WishlistStore::fetch(state.api(), Some(&auth.token)).await;
    let products = ProductView::list(wishlist.items(), &state);
    Shopper::load(&state, session)
        .await
        .page(|layout| WishlistTemplate { layout, products })
        .await
}

/// Add a product to the wishlist.
#[instrument(skip(state, session, headers))]
pub async fn add(
    State(state): State<AppState>,
    session: Session,
    headers: HeaderMap,
    Form(form): Form<WishlistForm>,
) -> Result<Response> {
    let mut shopper = Shopper::load(&state, session).await;
    let token = shopper.token();
    let catalog = shopper.catalog().clone();

    let mut wishlist = WishlistStore::fetch(state.api(), token.as_deref()).await;
    // Failures are reported through the toaster and leave the list as it was.
    let _ = wishlist
        .add(
            state.api(),
            token.as_deref(),
            form.product_id,
            &catalog,
            shopper.toaster(),
        )
        .await;

    let button = WishlistButtonTemplate {
        product_id: form.product_id,
        wishlisted: wishlist.is_member(form.product_id),
    };
    let fallback = format!("/products/{}", form.product_id);
    shopper.respond(&headers, button, &fallback).await
}

/// Remove a product from the wishlist.
#[instrument(skip(state, session, headers))]
pub async fn remove(
    State(state): State<AppState>,
    session: Session,
    headers: HeaderMap,
    Form(form): Form<WishlistForm>,
) -> Result<Response> {
    let mut shopper = Shopper::load(&state, session).await;
    let token = shopper.token();

    let mut wishlist = WishlistStore::fetch(state.api(), token.as_deref()).await;
    let _ = wishlist
        .remove(state.api(), token.as_deref(), form.product_id, shopper.toaster())
        .await;

    let button = WishlistButtonTemplate {
        product_id: form.product_id,
        wishlisted: wishlist.is_member(form.product_id),
    };
    shopper.respond(&headers, button, "/wishlist").await
}
