//! Sales report route handler.

use askama::Template;
use axum::{extract::State, response::Html};
use tower_sessions::Session;
use tracing::{instrument, warn};

use verdant_core::CurrencyCode;

use crate::error::Result;
use verdant_storefront::filters;
use crate::report::SalesReport;
use crate::routes::{Layout, render, status_class};
use crate::state::AppState;

/// Order count for one status.
#[derive(Debug, Clone)]
pub struct StatusCountView {
    pub status: &'static str,
    pub label: &'static str,
    pub class: &'static str,
    pub count: usize,
}

/// Revenue for one payment-method label.
#[derive(Debug, Clone)]
pub struct PaymentRevenueView {
    pub label: &'static str,
    pub revenue: String,
}

/// One row of the best-sellers table.
#[derive(Debug, Clone)]
pub struct TopProductView {
    pub id: i64,
    pub name: String,
    pub units: u32,
    pub revenue: String,
}

/// Report figures formatted for templates.
#[derive(Debug, Clone)]
pub struct ReportView {
    pub order_count: usize,
    pub revenue_order_count: usize,
    pub total_revenue: String,
    pub average_order_value: String,
    pub by_status: Vec<StatusCountView>,
    pub revenue_by_payment: Vec<PaymentRevenueView>,
    pub top_products: Vec<TopProductView>,
}

impl ReportView {
    #[must_use]
    pub fn new(report: &SalesReport, currency: CurrencyCode) -> Self {
        Self {
            order_count: report.order_count,
            revenue_order_count: report.revenue_order_count,
            total_revenue: currency.format(report.total_revenue),
            average_order_value: currency.format(report.average_order_value),
            by_status: report
                .by_status
                .iter()
                .map(|&(status, count)| StatusCountView {
                    status: status.as_str(),
                    label: status.label(),
                    class: status_class(status),
                    count,
                })
                .collect(),
            revenue_by_payment: report
                .revenue_by_payment
                .iter()
                .map(|&(label, revenue)| PaymentRevenueView {
                    label,
                    revenue: currency.format(revenue),
                })
                .collect(),
            top_products: report
                .top_products
                .iter()
                .map(|p| TopProductView {
                    id: p.product_id.as_i64(),
                    name: p.name.clone(),
                    units: p.units,
                    revenue: currency.format(p.revenue),
                })
                .collect(),
        }
    }
}

/// Reports page template.
#[derive(Template)]
#[template(path = "reports.html")]
pub struct ReportsTemplate {
    pub layout: Layout,
    pub report: ReportView,
    pub error: Option<String>,
}

/// Sales report over every order.
#[instrument(skip_all)]
pub async fn index(State(state): State<AppState>, session: Session) -> Result<Html<String>> {
    let layout = Layout::load(&session, "/reports").await;

    let (orders, error) = match state.api().admin_orders(state.token()).await {
        Ok(orders) => (orders, None),
        Err(e) => {
            warn!(error = %e, "Failed to fetch orders for report");
            (Vec::new(), Some("Could not load orders from the backend.".to_string()))
        }
    };

    let report = SalesReport::from_orders(&orders);
    render(&ReportsTemplate {
        layout,
        report: ReportView::new(&report, state.config().currency),
        error,
    })
}
