//! Product management route handlers.
//!
//! The admin works against its own catalog snapshot. A successful backend
//! mutation is mirrored locally instead of re-fetching the whole catalog.

use std::str::FromStr;

use askama::Template;
use axum::{
    Form,
    extract::{Path, State},
    response::{Html, Redirect},
};
use rust_decimal::Decimal;
use serde::Deserialize;
use tower_sessions::Session;
use tracing::{info, instrument, warn};

use verdant_core::{CurrencyCode, Product, ProductId};
use verdant_storefront::api::ProductUpdate;
use verdant_storefront::catalog::normalize_product;
use verdant_storefront::notify::Toast;

use crate::error::Result;
use crate::middleware::RequireAdminAuth;
use verdant_storefront::filters;
use crate::routes::dashboard::LOW_STOCK_THRESHOLD;
use crate::routes::{Layout, redirect_with, render};
use crate::state::AppState;

/// Product row for the listing.
#[derive(Debug, Clone)]
pub struct ProductRow {
    pub id: i64,
    pub name: String,
    pub brand: String,
    pub category: String,
    pub image: String,
    pub price: String,
    /// Unformatted price for the edit field.
    pub price_input: String,
    pub stock: u32,
    pub stock_class: &'static str,
}

impl ProductRow {
    fn new(product: &Product, state: &AppState, currency: CurrencyCode) -> Self {
        let stock_class = match product.stock {
            0 => "stock-out",
            n if n <= LOW_STOCK_THRESHOLD => "stock-low",
            _ => "stock-ok",
        };
        Self {
            id: product.id.as_i64(),
            name: product.name.clone(),
            brand: product.brand.clone().unwrap_or_default(),
            category: product.category.clone(),
            image: state.images().resolve_first(&product.images, &product.name),
            price: currency.format(product.price),
            price_input: product.price.round_dp(2).to_string(),
            stock: product.stock,
            stock_class,
        }
    }
}

/// Products list template.
#[derive(Template)]
#[template(path = "products/index.html")]
pub struct ProductsTemplate {
    pub layout: Layout,
    pub products: Vec<ProductRow>,
    pub error: Option<String>,
}

/// Product listing.
#[instrument(skip_all)]
pub async fn index(State(state): State<AppState>, session: Session) -> Result<Html<String>> {
    let layout = Layout::load(&session, "/products").await;
    let catalog = state.catalog().load().await;
    let error = state.catalog().last_error().map(|e| {
        warn!(error = %e, "Catalog unavailable");
        "Could not load products from the backend.".to_string()
    });

    let currency = state.config().currency;
    let products = catalog
        .all()
        .iter()
        .map(|product| ProductRow::new(product, &state, currency))
        .collect();

    render(&ProductsTemplate {
        layout,
        products,
        error,
    })
}

/// Re-fetch the catalog from the backend.
#[instrument(skip_all)]
pub async fn refresh(State(state): State<AppState>, session: Session) -> Redirect {
    let toast = match state.catalog().refresh().await {
        Ok(count) => Toast::success(format!("Catalog refreshed ({count} products)")),
        Err(e) => {
            warn!(error = %e, "Catalog refresh failed");
            Toast::error("Could not refresh the catalog")
        }
    };
    redirect_with(&session, toast, "/products").await
}

/// Price/stock edit form. Blank fields are left unchanged.
#[derive(Debug, Default, Deserialize)]
pub struct ProductUpdateForm {
    #[serde(default)]
    pub price: String,
    #[serde(default)]
    pub stock: String,
}

impl ProductUpdateForm {
    /// Parse the form into an update, rejecting malformed values.
    fn parse(&self) -> std::result::Result<ProductUpdate, &'static str> {
        let price = match self.price.trim() {
            "" => None,
            raw => {
                let price = Decimal::from_str(raw).map_err(|_| "Price must be a number")?;
                if price.is_sign_negative() {
                    return Err("Price cannot be negative");
                }
                Some(price)
            }
        };
        let stock = match self.stock.trim() {
            "" => None,
            raw => Some(
                raw.parse::<u32>()
                    .map_err(|_| "Stock must be a whole number of zero or more")?,
            ),
        };
        Ok(ProductUpdate { price, stock })
    }
}

/// Apply an update to a local copy of the product.
fn apply(mut product: Product, update: &ProductUpdate) -> Product {
    if let Some(price) = update.price {
        product.price = price;
        if product.original_price < price {
            product.original_price = price;
        }
    }
    if let Some(stock) = update.stock {
        product.stock = stock;
    }
    product
}

/// Change a product's price and/or stock.
#[instrument(skip(state, session, admin, form), fields(admin_id = %admin.id))]
pub async fn update(
    State(state): State<AppState>,
    session: Session,
    RequireAdminAuth(admin): RequireAdminAuth,
    Path(id): Path<i64>,
    Form(form): Form<ProductUpdateForm>,
) -> Redirect {
    let id = ProductId::new(id);
    let update = match form.parse() {
        Ok(update) if update == ProductUpdate::default() => {
            return redirect_with(&session, Toast::info("Nothing to update"), "/products").await;
        }
        Ok(update) => update,
        Err(message) => {
            return redirect_with(&session, Toast::error(message), "/products").await;
        }
    };

    let toast = match state.api().update_product(state.token(), id, &update).await {
        Ok(record) => {
            // Prefer the backend's record; fall back to patching the snapshot.
            let updated = record
                .and_then(|raw| normalize_product(&raw).ok())
                .or_else(|| {
                    state
                        .catalog()
                        .snapshot()
                        .by_id(id)
                        .cloned()
                        .map(|product| apply(product, &update))
                });
            state.products().invalidate(id).await;
            let name = updated.as_ref().map_or_else(|| format!("Product #{id}"), |p| p.name.clone());
            if let Some(product) = updated {
                state.catalog().update_local(product);
            }
            info!(product_id = %id, "Product updated");
            Toast::success(format!("{name} updated"))
        }
        Err(e) => {
            warn!(product_id = %id, error = %e, "Product update failed");
            Toast::error(
                e.user_message()
                    .map_or_else(|| "Could not update the product".to_string(), str::to_string),
            )
        }
    };
    redirect_with(&session, toast, "/products").await
}

/// Delete a product.
#[instrument(skip(state, session, admin), fields(admin_id = %admin.id))]
pub async fn delete(
    State(state): State<AppState>,
    session: Session,
    RequireAdminAuth(admin): RequireAdminAuth,
    Path(id): Path<i64>,
) -> Redirect {
    let id = ProductId::new(id);
    let toast = match state.api().delete_product(state.token(), id).await {
        Ok(()) => {
            state.catalog().remove_local(id);
            state.products().invalidate(id).await;
            info!(product_id = %id, "Product deleted");
            Toast::success(format!("Product #{id} deleted"))
        }
        Err(e) => {
            warn!(product_id = %id, error = %e, "Product deletion failed");
            Toast::error(
                e.user_message()
                    .map_or_else(|| "Could not delete the product".to_string(), str::to_string),
            )
        }
    };
    redirect_with(&session, toast, "/products").await
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn form(price: &str, stock: &str) -> ProductUpdateForm {
        ProductUpdateForm {
            price: price.to_string(),
            stock: stock.to_string(),
        }
    }

    #[test]
    fn test_blank_fields_are_left_out() {
        let update = form(" ", "12").parse().unwrap();
        assert_eq!(update.price, None);
        assert_eq!(update.stock, Some(12));
        assert_eq!(form("", "").parse().unwrap(), ProductUpdate::default());
    }

    #[test]
    fn test_rejects_malformed_values() {
        assert!(form("abc", "").parse().is_err());
        assert!(form("-5", "").parse().is_err());
        assert!(form("", "-1").parse().is_err());
        assert!(form("", "2.5").parse().is_err());
    }

    #[test]
    fn test_apply_raises_original_price() {
        let product: Product = serde_json::from_value(serde_json::json!({
            "id": 3,
            "name": "Rose Water Toner",
            "price": "200",
            "original_price": "250",
            "stock": 4
        }))
        .unwrap();

        let update = ProductUpdate {
            price: Some(Decimal::from(300)),
            stock: Some(0),
        };
        let updated = apply(product, &update);
        assert_eq!(updated.price, Decimal::from(300));
        assert_eq!(updated.original_price, Decimal::from(300));
        assert_eq!(updated.stock, 0);
    }
}
