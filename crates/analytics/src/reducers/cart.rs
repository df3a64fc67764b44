//! Cart and checkout KPIs.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};
use storefront_core::types::{CartItem, Order};

use super::{mean, percentage, round1, round2};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CartKpis {
    /// Distinct cart sessions in the window.
    pub total_carts: u64,
    /// Orders past `pending` that were not cancelled.
    pub completed_checkouts: u64,
    pub cart_abandonment_rate: f64,
    pub checkout_completion_rate: f64,
    pub avg_cart_value: f64,
    pub total_orders: u64,
    pub total_revenue: f64,
    pub orders_by_status: BTreeMap<String, u64>,
}

/// The abandonment and completion rates are computed independently from
/// the same two counts; they are not complements of each other once
/// clamped.
pub fn cart_kpis(cart_items: &[CartItem], orders: &[Order]) -> CartKpis {
    let total_carts = cart_items
        .iter()
        .map(|item| item.session_id.as_str())
        .collect::<HashSet<_>>()
        .len() as u64;

    let completed_checkouts = orders.iter().filter(|o| o.is_completed_checkout()).count() as u64;

    let mut orders_by_status = BTreeMap::new();
    for order in orders {
        *orders_by_status
            .entry(order.status.trim().to_ascii_lowercase())
            .or_insert(0) += 1;
    }

    let carts = total_carts as f64;
    let completed = completed_checkouts as f64;

    CartKpis {
        total_carts,
        completed_checkouts,
        cart_abandonment_rate: round1(percentage(carts - completed, carts)),
        checkout_completion_rate: round1(percentage(completed, carts)),
        avg_cart_value: round2(mean(orders.iter().map(|o| o.total))),
        total_orders: orders.len() as u64,
        total_revenue: round2(orders.iter().map(|o| o.total).sum()),
        orders_by_status,
    }
}
