//! Wishlist conversion and recently-viewed engagement per product.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use storefront_core::types::{Order, RecentlyViewedItem, WishlistItem};

use super::{mean, percentage, round1, Catalog};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WishlistStats {
    pub product_id: String,
    pub name: Option<String>,
    pub times_added: u64,
    /// Wishlist entries whose product was ordered in the same window.
    pub conversions: u64,
    pub conversion_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecentlyViewedStats {
    pub product_id: String,
    pub name: Option<String>,
    pub views: u64,
    pub unique_sessions: u64,
    pub avg_time_spent_seconds: f64,
    /// Views beyond the first one per session.
    pub repeat_views: u64,
}

pub fn wishlist_conversion(
    wishlist: &[WishlistItem],
    orders: &[Order],
    catalog: &Catalog<'_>,
    limit: usize,
) -> Vec<WishlistStats> {
    let ordered: HashSet<&str> = orders
        .iter()
        .flat_map(|o| o.items.iter().map(|i| i.product_id.as_str()))
        .collect();

    let mut added: HashMap<&str, u64> = HashMap::new();
    for item in wishlist {
        *added.entry(item.product_id.as_str()).or_insert(0) += 1;
    }

    let mut stats: Vec<WishlistStats> = added
        .into_iter()
        .map(|(product_id, times_added)| {
            let conversions = if ordered.contains(product_id) {
                times_added
            } else {
                0
            };
            WishlistStats {
                product_id: product_id.to_string(),
                name: catalog.name(product_id),
                times_added,
                conversions,
                conversion_rate: round1(percentage(conversions as f64, times_added as f64)),
            }
        })
        .collect();

    stats.sort_by(|a, b| {
        b.times_added
            .cmp(&a.times_added)
            .then_with(|| a.product_id.cmp(&b.product_id))
    });
    stats.truncate(limit);
    stats
}

pub fn recently_viewed_engagement(
    items: &[RecentlyViewedItem],
    catalog: &Catalog<'_>,
    limit: usize,
) -> Vec<RecentlyViewedStats> {
    #[derive(Default)]
    struct Tally<'a> {
        views: u64,
        sessions: HashSet<&'a str>,
        time_spent: Vec<f64>,
    }

    let mut tallies: HashMap<&str, Tally<'_>> = HashMap::new();
    for item in items {
        let tally = tallies.entry(item.product_id.as_str()).or_default();
        tally.views += 1;
        tally.sessions.insert(item.session_id.as_str());
        if let Some(seconds) = item.time_spent_seconds.filter(|s| s.is_finite() && *s >= 0.0) {
            tally.time_spent.push(seconds);
        }
    }

    let mut stats: Vec<RecentlyViewedStats> = tallies
        .into_iter()
        .map(|(product_id, tally)| {
            let unique_sessions = tally.sessions.len() as u64;
            RecentlyViewedStats {
                product_id: product_id.to_string(),
                name: catalog.name(product_id),
                views: tally.views,
                unique_sessions,
                avg_time_spent_seconds: round1(mean(tally.time_spent)),
                repeat_views: tally.views.saturating_sub(unique_sessions),
            }
        })
        .collect();

    stats.sort_by(|a, b| {
        b.views
            .cmp(&a.views)
            .then_with(|| a.product_id.cmp(&b.product_id))
    });
    stats.truncate(limit);
    stats
}
