//! Products added to carts that never made it into an order.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use storefront_core::types::{CartItem, Order};

use super::{percentage, round1, Catalog};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AbandonedProduct {
    pub product_id: String,
    pub name: Option<String>,
    pub added_to_cart_frequency: u64,
    pub times_abandoned: u64,
    pub drop_off_rate: f64,
}

/// A product counts as abandoned when no in-window order contains it; every
/// cart addition of such a product is then an abandonment.
pub fn abandoned_products(
    cart_items: &[CartItem],
    orders: &[Order],
    catalog: &Catalog<'_>,
    limit: usize,
) -> Vec<AbandonedProduct> {
    let ordered: HashSet<&str> = orders
        .iter()
        .flat_map(|o| o.items.iter().map(|i| i.product_id.as_str()))
        .collect();

    let mut added: HashMap<&str, u64> = HashMap::new();
    for item in cart_items {
        *added.entry(item.product_id.as_str()).or_insert(0) += 1;
    }

    let mut abandoned: Vec<AbandonedProduct> = added
        .into_iter()
        .filter_map(|(product_id, frequency)| {
            let times_abandoned = if ordered.contains(product_id) {
                0
            } else {
                frequency
            };
            (times_abandoned > 0).then(|| AbandonedProduct {
                product_id: product_id.to_string(),
                name: catalog.name(product_id),
                added_to_cart_frequency: frequency,
                times_abandoned,
                drop_off_rate: round1(percentage(times_abandoned as f64, frequency as f64)),
            })
        })
        .collect();

    abandoned.sort_by(|a, b| {
        b.times_abandoned
            .cmp(&a.times_abandoned)
            .then_with(|| a.product_id.cmp(&b.product_id))
    });
    abandoned.truncate(limit);
    abandoned
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reducers::fixtures::{cart_item, order, product};

    #[test]
    fn test_only_unordered_products_are_listed() {
        let products = vec![product("p-2", "two", "Two")];
        let cart_items = vec![
            cart_item("c-1", "s-1", "p-1", None),
            cart_item("c-2", "s-2", "p-1", None),
            cart_item("c-3", "s-1", "p-2", None),
            cart_item("c-4", "s-3", "p-2", None),
            cart_item("c-5", "s-4", "p-2", None),
            cart_item("c-6", "s-4", "p-3", None),
        ];
        let orders = vec![order("o-1", "paid", 40.0, &["p-1"])];

        let abandoned = abandoned_products(&cart_items, &orders, &Catalog::new(&products), 20);
        assert!(abandoned.iter().all(|p| p.times_abandoned > 0));

        let ids: Vec<&str> = abandoned.iter().map(|p| p.product_id.as_str()).collect();
        assert_eq!(ids, vec!["p-2", "p-3"]);
        assert_eq!(abandoned[0].added_to_cart_frequency, 3);
        assert_eq!(abandoned[0].times_abandoned, 3);
        assert_eq!(abandoned[0].drop_off_rate, 100.0);
        assert_eq!(abandoned[0].name.as_deref(), Some("Two"));
    }

    #[test]
    fn test_everything_ordered() {
        let cart_items = vec![cart_item("c-1", "s-1", "p-1", None)];
        let orders = vec![order("o-1", "paid", 40.0, &["p-1"])];
        assert!(abandoned_products(&cart_items, &orders, &Catalog::new(&[]), 20).is_empty());
    }
}
