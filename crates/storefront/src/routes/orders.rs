//! Order route handlers.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Path, State},
    response::Response,
};
use tower_sessions::Session;
use tracing::{instrument, warn};

use verdant_core::{Order, OrderId, payment_method_label};

use crate::catalog::fetch_product;
use crate::error::Result;
use crate::filters;
use crate::routes::{Layout, Shopper};
use crate::services::{EnrichedItem, enrich_items};
use crate::state::AppState;

// =============================================================================
// Views
// =============================================================================

/// Order line display data.
#[derive(Clone)]
pub struct OrderItemView {
    pub product_id: i64,
    pub name: String,
    pub image: String,
    pub size: Option<String>,
    pub quantity: u32,
    pub price: String,
    pub line_total: String,
}

/// Order display data.
#[derive(Clone)]
pub struct OrderView {
    pub id: OrderId,
    pub customer_name: String,
    pub customer_email: String,
    pub shipping_address: String,
    pub payment: &'static str,
    pub status: &'static str,
    pub status_class: &'static str,
    pub total: String,
    pub unit_count: u32,
    pub placed_at: Option<String>,
    pub items: Vec<OrderItemView>,
}

impl OrderView {
    fn new(order: &Order, items: &[EnrichedItem], state: &AppState) -> Self {
        let currency = state.currency();
        Self {
            id: order.id,
            customer_name: order.customer_name.clone(),
            customer_email: order.customer_email.clone().unwrap_or_default(),
            shipping_address: order.shipping_address.clone().unwrap_or_default(),
            payment: payment_method_label(&order.payment_method),
            status: order.status.label(),
            status_class: order.status.as_str(),
            total: currency.format(order.total),
            unit_count: order.unit_count(),
            placed_at: order
                .created_at
                .map(|t| t.format("%B %-d, %Y %H:%M").to_string()),
            items: items
                .iter()
                .map(|enriched| OrderItemView {
                    product_id: enriched.item.product_id.as_i64(),
                    name: enriched.name(),
                    image: enriched.image(state.images()),
                    size: enriched.item.variant_size.clone(),
                    quantity: enriched.item.quantity,
                    price: currency.format(enriched.item.price),
                    line_total: currency.format(enriched.item.line_total()),
                })
                .collect(),
        }
    }
}

// =============================================================================
// Templates
// =============================================================================

/// Order history template.
#[derive(Template, WebTemplate)]
#[template(path = "orders/index.html")]
pub struct OrdersIndexTemplate {
    pub layout: Layout,
    pub orders: Vec<OrderView>,
    /// Whose orders are shown; `None` when nobody is known.
    pub email: Option<String>,
    pub error: Option<String>,
}

/// Order confirmation template.
#[derive(Template, WebTemplate)]
#[template(path = "orders/show.html")]
pub struct OrderShowTemplate {
    pub layout: Layout,
    pub order: OrderView,
}

// =============================================================================
// Handlers
// =============================================================================

/// Display past orders of the logged-in user, else those placed with the
/// last checkout email.
#[instrument(skip(state, session))]
pub async fn index(State(state): State<AppState>, session: Session) -> Result<Response> {
    let shopper = Shopper::load(&state, session).await;
    let token = shopper.token();
    let email = shopper
        .user()
        .map(|u| u.email.to_string())
        .or_else(|| shopper.customer_email());

    let (orders, error) = match email.as_deref() {
        Some(email) => match state.api().orders_for_email(email, token.as_deref()).await {
            Ok(mut orders) => {
                orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
                let views = orders
                    .iter()
                    .map(|order| {
                        let items: Vec<EnrichedItem> = order
                            .items
                            .iter()
                            .cloned()
                            .map(|item| EnrichedItem {
                                product: shopper.catalog().by_id(item.product_id).cloned(),
                                item,
                            })
                            .collect();
                        OrderView::new(order, &items, &state)
                    })
                    .collect();
                (views, None)
            }
            Err(e) => {
                warn!(error = %e, "Failed to load orders");
                (Vec::new(), Some("We could not load your orders right now".to_string()))
            }
        },
        None => (Vec::new(), None),
    };

    shopper
        .page(|layout| OrdersIndexTemplate {
            layout,
            orders,
            email,
            error,
        })
        .await
}

/// Display one order with its items joined to their products.
#[instrument(skip(state, session))]
pub async fn show(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<OrderId>,
) -> Result<Response> {
    let shopper = Shopper::load(&state, session).await;
    let token = shopper.token();

    let order = state.api().order(id, token.as_deref()).await?;
    let api = state.api();
    let items = enrich_items(&order.items, |product_id| async move {
        fetch_product(api, product_id).await.ok()
    })
    .await;

    let view = OrderView::new(&order, &items, &state);
    shopper
        .page(|layout| OrderShowTemplate {
            layout,
            order: view,
        })
        .await
}

