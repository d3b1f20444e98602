//! Order management route handlers.

use askama::Template;
use axum::{
    Form,
    extract::{Path, Query, State},
    response::{Html, Redirect},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::{info, instrument, warn};

use verdant_core::{CurrencyCode, Order, OrderId, OrderStatus, payment_method_label};
use verdant_storefront::notify::Toast;

use crate::error::{AppError, Result};
use crate::middleware::RequireAdminAuth;
use verdant_storefront::filters;
use crate::routes::{Layout, redirect_with, render, status_class};
use crate::state::AppState;

/// Order row for the listing and the dashboard.
#[derive(Debug, Clone)]
pub struct OrderRow {
    pub id: i64,
    pub customer_name: String,
    pub customer_email: String,
    pub payment: &'static str,
    pub status: &'static str,
    pub status_label: &'static str,
    pub status_class: &'static str,
    pub total: String,
    pub unit_count: u32,
    pub placed_at: String,
}

impl OrderRow {
    #[must_use]
    pub fn new(order: &Order, currency: CurrencyCode) -> Self {
        Self {
            id: order.id.as_i64(),
            customer_name: if order.customer_name.is_empty() {
                "Guest".to_string()
            } else {
                order.customer_name.clone()
            },
            customer_email: order.customer_email.clone().unwrap_or_default(),
            payment: payment_method_label(&order.payment_method),
            status: order.status.as_str(),
            status_label: order.status.label(),
            status_class: status_class(order.status),
            total: currency.format(order.total),
            unit_count: order.unit_count(),
            placed_at: order
                .created_at
                .map_or_else(String::new, |t| t.format("%Y-%m-%d %H:%M").to_string()),
        }
    }
}

/// Status filter option.
#[derive(Debug, Clone)]
pub struct StatusOption {
    pub value: &'static str,
    pub label: &'static str,
    pub selected: bool,
}

fn status_options(selected: Option<OrderStatus>) -> Vec<StatusOption> {
    OrderStatus::SETTABLE
        .iter()
        .map(|&status| StatusOption {
            value: status.as_str(),
            label: status.label(),
            selected: selected == Some(status),
        })
        .collect()
}

/// Order list query parameters.
#[derive(Debug, Default, Deserialize)]
pub struct OrdersQuery {
    pub status: Option<String>,
}

impl OrdersQuery {
    /// The requested status; blank or `all` means no filter.
    fn status(&self) -> Result<Option<OrderStatus>> {
        match self.status.as_deref().map(str::trim) {
            None | Some("" | "all") => Ok(None),
            Some(raw) => raw.parse().map(Some).map_err(AppError::BadRequest),
        }
    }
}

/// Orders list template.
#[derive(Template)]
#[template(path = "orders/index.html")]
pub struct OrdersTemplate {
    pub layout: Layout,
    pub orders: Vec<OrderRow>,
    pub statuses: Vec<StatusOption>,
    pub filtered: bool,
    pub error: Option<String>,
}

/// Order listing, newest first, optionally filtered by status.
#[instrument(skip(state, session))]
pub async fn index(
    State(state): State<AppState>,
    session: Session,
    Query(query): Query<OrdersQuery>,
) -> Result<Html<String>> {
    let filter = query.status()?;
    let layout = Layout::load(&session, "/orders").await;

    let (mut orders, error) = match state.api().admin_orders(state.token()).await {
        Ok(orders) => (orders, None),
        Err(e) => {
            warn!(error = %e, "Failed to fetch orders");
            (Vec::new(), Some("Could not load orders from the backend.".to_string()))
        }
    };
    if let Some(status) = filter {
        orders.retain(|order| order.status == status);
    }
    orders.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));

    let currency = state.config().currency;
    render(&OrdersTemplate {
        layout,
        orders: orders.iter().map(|o| OrderRow::new(o, currency)).collect(),
        statuses: status_options(filter),
        filtered: filter.is_some(),
        error,
    })
}

/// Order item with its product joined in.
#[derive(Debug, Clone)]
pub struct OrderItemRow {
    pub product_id: i64,
    pub name: String,
    pub image: String,
    pub size: Option<String>,
    pub quantity: u32,
    pub price: String,
    pub line_total: String,
    /// Current stock, when the product still exists.
    pub stock: Option<u32>,
}

/// Order detail template.
#[derive(Template)]
#[template(path = "orders/show.html")]
pub struct OrderDetailTemplate {
    pub layout: Layout,
    pub order: OrderRow,
    pub shipping_address: String,
    pub raw_payment_method: String,
    pub items: Vec<OrderItemRow>,
    pub statuses: Vec<StatusOption>,
}

/// Order detail with enriched items.
#[instrument(skip(state, session))]
pub async fn show(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<i64>,
) -> Result<Html<String>> {
    let id = OrderId::new(id);
    let orders = state.api().admin_orders(state.token()).await?;
    let order = orders
        .into_iter()
        .find(|order| order.id == id)
        .ok_or_else(|| AppError::NotFound(format!("order {id}")))?;

    let layout = Layout::load(&session, "/orders").await;
    let catalog = state.catalog().load().await;
    let enriched = state.products().enrich(&order, &catalog).await;

    let currency = state.config().currency;
    let items = enriched
        .iter()
        .map(|e| OrderItemRow {
            product_id: e.item.product_id.as_i64(),
            name: e.name(),
            image: e.image(state.images()),
            size: e.item.variant_size.clone(),
            quantity: e.item.quantity,
            price: currency.format(e.item.price),
            line_total: currency.format(e.item.line_total()),
            stock: e.product.as_ref().map(|p| p.stock),
        })
        .collect();

    render(&OrderDetailTemplate {
        layout,
        shipping_address: order.shipping_address.clone().unwrap_or_default(),
        raw_payment_method: order.payment_method.clone(),
        statuses: status_options(Some(order.status)),
        order: OrderRow::new(&order, currency),
        items,
    })
}

/// Status change form.
#[derive(Debug, Deserialize)]
pub struct StatusForm {
    pub status: String,
}

/// Move an order to a new status.
#[instrument(skip(state, session, admin, form), fields(admin_id = %admin.id))]
pub async fn update_status(
    State(state): State<AppState>,
    session: Session,
    RequireAdminAuth(admin): RequireAdminAuth,
    Path(id): Path<i64>,
    Form(form): Form<StatusForm>,
) -> Redirect {
    let id = OrderId::new(id);
    let back = format!("/orders/{id}");

    let status = match form.status.parse::<OrderStatus>() {
        Ok(status) => status,
        Err(message) => return redirect_with(&session, Toast::error(message), &back).await,
    };

    let toast = match state
        .api()
        .update_order_status(state.token(), id, status)
        .await
    {
        Ok(()) => {
            info!(order_id = %id, %status, "Order status updated");
            Toast::success(format!("Order #{id} marked as {}", status.label()))
        }
        Err(e) => {
            warn!(order_id = %id, error = %e, "Order status update failed");
            Toast::error(
                e.user_message()
                    .map_or_else(|| "Could not update the order".to_string(), str::to_string),
            )
        }
    };
    redirect_with(&session, toast, &back).await
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal::Decimal;

    use super::*;

    #[test]
    fn test_status_query() {
        let query = |s: Option<&str>| OrdersQuery {
            status: s.map(str::to_string),
        };
        assert_eq!(query(None).status().unwrap(), None);
        assert_eq!(query(Some("all")).status().unwrap(), None);
        assert_eq!(
            query(Some("Shipped")).status().unwrap(),
            Some(OrderStatus::Shipped)
        );
        assert!(query(Some("lost")).status().is_err());
    }

    #[test]
    fn test_order_row_labels() {
        let order = Order {
            id: OrderId::new(12),
            customer_name: String::new(),
            customer_email: Some("asha@example.com".to_string()),
            shipping_address: None,
            payment_method: "upi".to_string(),
            status: OrderStatus::Shipped,
            total: Decimal::from(499),
            items: Vec::new(),
            created_at: None,
        };
        let row = OrderRow::new(&order, CurrencyCode::INR);
        assert_eq!(row.customer_name, "Guest");
        assert_eq!(row.payment, "UPI");
        assert_eq!(row.status_class, "badge-shipped");
        assert_eq!(row.total, "₹499.00");
        assert!(row.placed_at.is_empty());
    }

    #[test]
    fn test_status_options_mark_selection() {
        let options = status_options(Some(OrderStatus::Delivered));
        let selected: Vec<&str> = options.iter().filter(|o| o.selected).map(|o| o.value).collect();
        assert_eq!(selected, vec!["delivered"]);
    }
}
