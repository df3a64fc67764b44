//! Trending products ranked by view and add-to-cart velocity.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use storefront_core::types::AnalyticsEvent;

use super::{is_product_view, Catalog};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendingProduct {
    pub product_id: String,
    pub name: Option<String>,
    pub views: u64,
    pub add_to_cart_count: u64,
    /// `views + 2 × add_to_cart_count`
    pub velocity_score: u64,
}

pub fn trending_products(
    events: &[AnalyticsEvent],
    catalog: &Catalog<'_>,
    limit: usize,
) -> Vec<TrendingProduct> {
    let mut tallies: HashMap<String, (u64, u64)> = HashMap::new();

    for event in events {
        let is_view = is_product_view(event);
        let is_add = event.is_add_to_cart_click();
        if !is_view && !is_add {
            continue;
        }
        let Some(key) = catalog.product_key(event) else {
            continue;
        };
        let tally = tallies.entry(key).or_insert((0, 0));
        if is_view {
            tally.0 += 1;
        } else {
            tally.1 += 1;
        }
    }

    let mut trending: Vec<TrendingProduct> = tallies
        .into_iter()
        .map(|(product_id, (views, adds))| TrendingProduct {
            name: catalog.name(&product_id),
            product_id,
            views,
            add_to_cart_count: adds,
            velocity_score: views + 2 * adds,
        })
        .collect();

    trending.sort_by(|a, b| {
        b.velocity_score
            .cmp(&a.velocity_score)
            .then_with(|| a.product_id.cmp(&b.product_id))
    });
    trending.truncate(limit);
    trending
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reducers::fixtures::{add_to_cart, page_view, product};

    #[test]
    fn test_velocity_ranking() {
        let products = vec![
            product("p-a", "a", "A"),
            product("p-b", "b", "B"),
            product("p-c", "c", "C"),
        ];
        let mut events = Vec::new();
        // a: 3 views, 0 adds = 3
        for _ in 0..3 {
            events.push(page_view("s-1", "/product/a"));
        }
        // b: 1 view, 2 adds = 5
        events.push(page_view("s-1", "/product/b"));
        events.push(add_to_cart("s-1", "/product/b"));
        events.push(add_to_cart("s-2", "/product/b"));
        // c: 4 views, 0 adds, reported through an explicit product id = 4
        for _ in 0..4 {
            let mut event = page_view("s-3", "/product/c-old-slug");
            event.product_id = Some("p-c".into());
            events.push(event);
        }

        let trending = trending_products(&events, &Catalog::new(&products), 10);
        let ids: Vec<&str> = trending.iter().map(|t| t.product_id.as_str()).collect();
        assert_eq!(ids, vec!["p-b", "p-c", "p-a"]);
        assert_eq!(trending[0].velocity_score, 5);
        assert_eq!(trending[0].name.as_deref(), Some("B"));
        assert!(trending
            .windows(2)
            .all(|w| w[0].velocity_score > w[1].velocity_score));
    }

    #[test]
    fn test_capped_at_limit() {
        let mut events = Vec::new();
        for i in 0..15 {
            for _ in 0..=i {
                events.push(page_view("s-1", &format!("/product/item-{i:02}")));
            }
        }
        let trending = trending_products(&events, &Catalog::new(&[]), 10);
        assert_eq!(trending.len(), 10);
        assert_eq!(trending[0].product_id, "item-14");
        assert_eq!(trending[0].velocity_score, 15);
        assert!(trending
            .windows(2)
            .all(|w| w[0].velocity_score > w[1].velocity_score));
    }
}
