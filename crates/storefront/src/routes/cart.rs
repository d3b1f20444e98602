//! Cart route handlers.
//!
//! Cart operations use HTMX for dynamic updates without full page reloads.
//! The cart itself lives in the session; every handler rehydrates it against
//! the current catalog snapshot, mutates it and commits it back.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::State,
    http::HeaderMap,
    response::Response,
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::{instrument, warn};

use verdant_core::{CartLineItem, ProductId};

use crate::cart::CartStore;
use crate::catalog::fetch_product;
use crate::error::{Result, add_breadcrumb};
use crate::filters;
use crate::routes::{Layout, Shopper};
use crate::state::AppState;

// =============================================================================
// Views
// =============================================================================

/// Cart line display data for templates.
#[derive(Clone)]
pub struct CartLineView {
    pub cart_item_id: String,
    pub product_id: ProductId,
    pub name: String,
    pub size: Option<String>,
    pub image: String,
    pub price: String,
    pub quantity: u32,
    pub line_total: String,
}

/// Cart display data for templates.
#[derive(Clone)]
pub struct CartView {
    pub lines: Vec<CartLineView>,
    pub total: String,
    pub count: u32,
    /// Stock problems found against the catalog.
    pub issues: Vec<String>,
}

impl CartView {
    #[must_use]
    pub fn new(cart: &CartStore<'_>, state: &AppState) -> Self {
        let currency = state.currency();
        Self {
            lines: cart
                .lines()
                .iter()
                .map(|line| CartLineView::new(line, state))
                .collect(),
            total: currency.format(cart.cart_total()),
            count: cart.cart_items_count(),
            issues: cart.check_cart_stock(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

impl CartLineView {
    fn new(line: &CartLineItem, state: &AppState) -> Self {
        let currency = state.currency();
        Self {
            cart_item_id: line.cart_item_id.clone(),
            product_id: line.product_id(),
            name: line.product.name.clone(),
            size: line.selected_variant.as_ref().map(|v| v.size.clone()),
            image: state
                .images()
                .resolve_first(&line.product.images, &line.product.name),
            price: currency.format(line.price),
            quantity: line.quantity,
            line_total: currency.format(line.line_total()),
        }
    }
}

// =============================================================================
// Forms
// =============================================================================

/// Add to cart form data.
#[derive(Debug, Deserialize)]
pub struct AddToCartForm {
    pub product_id: ProductId,
    /// Variant size label, e.g. `100ml`.
    #[serde(default)]
    pub variant: Option<String>,
    #[serde(default)]
    pub quantity: Option<u32>,
}

/// Update cart form data.
#[derive(Debug, Deserialize)]
pub struct UpdateCartForm {
    pub cart_item_id: String,
    pub quantity: i64,
}

/// Remove from cart form data.
#[derive(Debug, Deserialize)]
pub struct RemoveFromCartForm {
    pub cart_item_id: String,
}

// =============================================================================
// Templates
// =============================================================================

/// Cart page template.
#[derive(Template, WebTemplate)]
#[template(path = "cart/show.html")]
pub struct CartShowTemplate {
    pub layout: Layout,
    pub cart: CartView,
}

/// Cart items fragment template (for HTMX).
#[derive(Template, WebTemplate)]
#[template(path = "partials/cart_items_fragment.html")]
pub struct CartItemsTemplate {
    pub cart: CartView,
}

/// Cart count badge fragment template (for HTMX).
#[derive(Template, WebTemplate)]
#[template(path = "partials/cart_count.html")]
pub struct CartCountTemplate {
    pub count: u32,
}

// =============================================================================
// Handlers
// =============================================================================

/// Display cart page.
#[instrument(skip(state, session))]
pub async fn show(State(state): State<AppState>, session: Session) -> Result<Response> {
    let mut shopper = Shopper::load(&state, session).await;
    let cart = CartView::new(&shopper.cart(), &state);
    shopper
        .page(|layout| CartShowTemplate { layout, cart })
        .await
}

/// Add item to cart (HTMX).
///
/// Returns the updated count badge; the outcome is reported as a toast.
#[instrument(skip(state, session, headers))]
pub async fn add(
    State(state): State<AppState>,
    session: Session,
    headers: HeaderMap,
    Form(form): Form<AddToCartForm>,
) -> Result<Response> {
    let mut shopper = Shopper::load(&state, session).await;

    let known = shopper.catalog().by_id(form.product_id).cloned();
    let product = match known {
        Some(product) => Some(product),
        None => match fetch_product(state.api(), form.product_id).await {
            Ok(product) => {
                shopper.adopt(&state, product.clone());
                Some(product)
            }
            Err(e) => {
                warn!(product_id = %form.product_id, error = %e, "Product lookup failed");
                None
            }
        },
    };

    let count = {
        let mut cart = shopper.cart();
        if let Some(product) = &product {
            match form.variant.as_deref() {
                Some(size) if product.variant(size).is_none() => {
                    warn!(product_id = %product.id, size, "Unknown variant requested");
                }
                size => {
                    let variant = size.and_then(|s| product.variant(s));
                    if cart
                        .add_to_cart(product, variant, form.quantity.unwrap_or(1))
                        .is_ok()
                    {
                        let id = product.id.to_string();
                        add_breadcrumb("cart", "Added to cart", Some(&[("product_id", id.as_str())]));
                    }
                }
            }
        }
        cart.cart_items_count()
    };
    match &product {
        None => shopper
            .toaster()
            .error("This product is no longer available"),
        Some(product) if form.variant.as_deref().is_some_and(|s| product.variant(s).is_none()) => {
            shopper
                .toaster()
                .error(format!("That size of {} is not available", product.name));
        }
        Some(_) => {}
    }

    shopper
        .respond(&headers, CartCountTemplate { count }, "/cart")
        .await
}

/// Update cart line quantity (HTMX).
#[instrument(skip(state, session, headers))]
pub async fn update(
    State(state): State<AppState>,
    session: Session,
    headers: HeaderMap,
    Form(form): Form<UpdateCartForm>,
) -> Result<Response> {
    let mut shopper = Shopper::load(&state, session).await;
    let cart = {
        let mut cart = shopper.cart();
        // Rejections are reported through the toaster.
        let _ = cart.update_quantity(&form.cart_item_id, form.quantity);
        CartView::new(&cart, &state)
    };
    shopper
        .respond(&headers, CartItemsTemplate { cart }, "/cart")
        .await
}

/// Remove a line from the cart (HTMX).
#[instrument(skip(state, session, headers))]
pub async fn remove(
    State(state): State<AppState>,
    session: Session,
    headers: HeaderMap,
    Form(form): Form<RemoveFromCartForm>,
) -> Result<Response> {
    let mut shopper = Shopper::load(&state, session).await;
    let cart = {
        let mut cart = shopper.cart();
        cart.remove_from_cart(&form.cart_item_id);
        CartView::new(&cart, &state)
    };
    shopper
        .respond(&headers, CartItemsTemplate { cart }, "/cart")
        .await
}

/// Empty the cart (HTMX).
#[instrument(skip(state, session, headers))]
pub async fn clear(
    State(state): State<AppState>,
    session: Session,
    headers: HeaderMap,
) -> Result<Response> {
    let mut shopper = Shopper::load(&state, session).await;
    let cart = {
        let mut cart = shopper.cart();
        cart.clear_cart();
        CartView::new(&cart, &state)
    };
    shopper
        .respond(&headers, CartItemsTemplate { cart }, "/cart")
        .await
}

/// Get cart count badge (HTMX).
#[instrument(skip(state, session))]
pub async fn count(State(state): State<AppState>, session: Session) -> Result<Response> {
    let mut shopper = Shopper::load(&state, session).await;
    let count = shopper.cart().cart_items_count();
    shopper.fragment(CartCountTemplate { count }).await
}
