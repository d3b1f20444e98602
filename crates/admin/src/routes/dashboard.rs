//! Dashboard route handler.

use askama::Template;
use axum::{extract::State, response::Html};
use tower_sessions::Session;
use tracing::{instrument, warn};

use verdant_core::{Order, OrderStatus};

use crate::error::Result;
use verdant_storefront::filters;
use crate::report::SalesReport;
use crate::routes::orders::OrderRow;
use crate::routes::reports::ReportView;
use crate::routes::{Layout, render};
use crate::state::AppState;

/// Products at or below this stock level are flagged on the dashboard.
pub const LOW_STOCK_THRESHOLD: u32 = 5;

/// Orders shown in the recent-orders table.
const RECENT_ORDERS: usize = 5;

/// Dashboard metrics.
#[derive(Debug, Clone)]
pub struct DashboardMetrics {
    pub products: usize,
    pub out_of_stock: usize,
    pub low_stock: usize,
    pub pending_orders: usize,
}

/// Dashboard template.
#[derive(Template)]
#[template(path = "dashboard.html")]
pub struct DashboardTemplate {
    pub layout: Layout,
    pub metrics: DashboardMetrics,
    pub report: ReportView,
    pub recent_orders: Vec<OrderRow>,
    pub errors: Vec<String>,
}

/// The newest orders first; orders without a timestamp sort by id.
fn recent(orders: &[Order], limit: usize) -> Vec<&Order> {
    let mut sorted: Vec<&Order> = orders.iter().collect();
    sorted.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
    sorted.truncate(limit);
    sorted
}

/// Dashboard overview.
#[instrument(skip_all)]
pub async fn index(State(state): State<AppState>, session: Session) -> Result<Html<String>> {
    let layout = Layout::load(&session, "/").await;
    let mut errors = Vec::new();

    let catalog = state.catalog().load().await;
    if let Some(error) = state.catalog().last_error() {
        warn!(%error, "Catalog unavailable for dashboard");
        errors.push("Could not load products from the backend.".to_string());
    }

    let orders = match state.api().admin_orders(state.token()).await {
        Ok(orders) => orders,
        Err(e) => {
            warn!(error = %e, "Failed to fetch orders for dashboard");
            errors.push("Could not load orders from the backend.".to_string());
            Vec::new()
        }
    };

    let report = SalesReport::from_orders(&orders);
    let metrics = DashboardMetrics {
        products: catalog.len(),
        out_of_stock: catalog.all().iter().filter(|p| p.stock == 0).count(),
        low_stock: catalog
            .all()
            .iter()
            .filter(|p| p.stock > 0 && p.stock <= LOW_STOCK_THRESHOLD)
            .count(),
        pending_orders: report.count_for(OrderStatus::Pending),
    };

    let currency = state.config().currency;
    render(&DashboardTemplate {
        layout,
        metrics,
        report: ReportView::new(&report, currency),
        recent_orders: recent(&orders, RECENT_ORDERS)
            .into_iter()
            .map(|order| OrderRow::new(order, currency))
            .collect(),
        errors,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::{TimeZone, Utc};
    use rust_decimal::Decimal;
    use verdant_core::OrderId;

    use super::*;

    fn order(id: i64, day: Option<u32>) -> Order {
        Order {
            id: OrderId::new(id),
            customer_name: String::new(),
            customer_email: None,
            shipping_address: None,
            payment_method: "cod".to_string(),
            status: OrderStatus::Pending,
            total: Decimal::from(100),
            items: Vec::new(),
            created_at: day.map(|d| Utc.with_ymd_and_hms(2026, 3, d, 10, 0, 0).unwrap()),
        }
    }

    #[test]
    fn test_recent_orders_newest_first() {
        let orders = vec![order(1, Some(2)), order(2, Some(9)), order(3, None), order(4, Some(5))];
        let ids: Vec<i64> = recent(&orders, 3).iter().map(|o| o.id.as_i64()).collect();
        assert_eq!(ids, vec![2, 4, 1]);
    }
}
