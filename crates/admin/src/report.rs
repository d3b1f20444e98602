//! Sales report over the backend's order list.
//!
//! Cancelled orders are counted by status but excluded from revenue, the
//! average order value and the product ranking.

use std::collections::HashMap;

use rust_decimal::Decimal;

use verdant_core::{Order, OrderStatus, ProductId, payment_method_label};

/// Number of products in the top-products ranking.
pub const TOP_PRODUCTS: usize = 5;

/// Units and revenue of one product across orders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductSales {
    pub product_id: ProductId,
    pub name: String,
    pub units: u32,
    pub revenue: Decimal,
}

/// Aggregated sales figures.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SalesReport {
    /// Every order, whatever its status.
    pub order_count: usize,
    /// Orders that count towards revenue.
    pub revenue_order_count: usize,
    pub total_revenue: Decimal,
    pub average_order_value: Decimal,
    /// Order counts per status, in lifecycle order; statuses with no orders
    /// are included with zero.
    pub by_status: Vec<(OrderStatus, usize)>,
    /// Revenue per payment-method label, largest first.
    pub revenue_by_payment: Vec<(&'static str, Decimal)>,
    /// Best sellers by units, at most [`TOP_PRODUCTS`].
    pub top_products: Vec<ProductSales>,
}

impl SalesReport {
    /// Build the report from a list of orders.
    #[must_use]
    pub fn from_orders(orders: &[Order]) -> Self {
        let revenue_orders: Vec<&Order> = orders
            .iter()
            .filter(|o| o.status.counts_as_revenue())
            .collect();

        let total_revenue: Decimal = revenue_orders.iter().map(|o| o.total).sum();
        let average_order_value = if revenue_orders.is_empty() {
            Decimal::ZERO
        } else {
            (total_revenue / Decimal::from(revenue_orders.len())).round_dp(2)
        };

        let mut by_status: Vec<(OrderStatus, usize)> = OrderStatus::SETTABLE
            .iter()
            .map(|&status| (status, orders.iter().filter(|o| o.status == status).count()))
            .collect();
        let unknown = orders
            .iter()
            .filter(|o| o.status == OrderStatus::Unknown)
            .count();
        if unknown > 0 {
            by_status.push((OrderStatus::Unknown, unknown));
        }

        let mut payments: HashMap<&'static str, Decimal> = HashMap::new();
        for order in &revenue_orders {
            *payments
                .entry(payment_method_label(&order.payment_method))
                .or_default() += order.total;
        }
        let mut revenue_by_payment: Vec<_> = payments.into_iter().collect();
        revenue_by_payment.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(b.0)));

        Self {
            order_count: orders.len(),
            revenue_order_count: revenue_orders.len(),
            total_revenue,
            average_order_value,
            by_status,
            revenue_by_payment,
            top_products: top_products(&revenue_orders, TOP_PRODUCTS),
        }
    }

    /// Count of orders with the given status.
    #[must_use]
    pub fn count_for(&self, status: OrderStatus) -> usize {
        self.by_status
            .iter()
            .find(|(s, _)| *s == status)
            .map_or(0, |(_, count)| *count)
    }
}

/// Products ranked by units sold, ties broken by revenue then id.
fn top_products(orders: &[&Order], limit: usize) -> Vec<ProductSales> {
    let mut sales: HashMap<ProductId, ProductSales> = HashMap::new();
    for item in orders.iter().flat_map(|o| &o.items) {
        let entry = sales
            .entry(item.product_id)
            .or_insert_with(|| ProductSales {
                product_id: item.product_id,
                name: String::new(),
                units: 0,
                revenue: Decimal::ZERO,
            });
        if entry.name.is_empty()
            && let Some(name) = item.product_name.as_deref().filter(|n| !n.is_empty())
        {
            entry.name = name.to_owned();
        }
        entry.units += item.quantity;
        entry.revenue += item.line_total();
    }

    let mut ranked: Vec<ProductSales> = sales
        .into_values()
        .map(|mut s| {
            if s.name.is_empty() {
                s.name = format!("Product #{}", s.product_id);
            }
            s
        })
        .collect();
    ranked.sort_by(|a, b| {
        b.units
            .cmp(&a.units)
            .then(b.revenue.cmp(&a.revenue))
            .then(a.product_id.cmp(&b.product_id))
    });
    ranked.truncate(limit);
    ranked
}
