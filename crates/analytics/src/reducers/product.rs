//! Product page KPIs.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use storefront_core::types::AnalyticsEvent;

use super::{is_product_view, percentage, product_slug, round1, Catalog};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProductKpis {
    pub product_page_views: u64,
    pub add_to_cart_clicks: u64,
    pub add_to_cart_rate: f64,
    pub most_viewed_product: Option<MostViewedProduct>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MostViewedProduct {
    pub slug: String,
    pub product_id: Option<String>,
    pub name: Option<String>,
    pub views: u64,
}

pub fn product_kpis(events: &[AnalyticsEvent], catalog: &Catalog<'_>) -> ProductKpis {
    let mut views_by_slug: BTreeMap<String, u64> = BTreeMap::new();
    let mut add_to_cart_clicks = 0u64;

    for event in events {
        if is_product_view(event) {
            if let Some(slug) = product_slug(&event.page_url) {
                *views_by_slug.entry(slug).or_insert(0) += 1;
            }
        } else if event.is_add_to_cart_click() {
            add_to_cart_clicks += 1;
        }
    }

    let product_page_views: u64 = views_by_slug.values().sum();

    // Slugs iterate in ascending order and only a strictly higher count
    // replaces the leader, so ties go to the lexically smallest slug.
    let mut leader: Option<(&String, u64)> = None;
    for (slug, &views) in &views_by_slug {
        if leader.map_or(true, |(_, best)| views > best) {
            leader = Some((slug, views));
        }
    }

    let most_viewed_product = leader.map(|(slug, views)| {
        let product = catalog.by_slug(slug);
        MostViewedProduct {
            slug: slug.clone(),
            product_id: product.map(|p| p.id.clone()),
            name: product.map(|p| p.name.clone()),
            views,
        }
    });

    ProductKpis {
        product_page_views,
        add_to_cart_clicks,
        add_to_cart_rate: round1(percentage(
            add_to_cart_clicks as f64,
            product_page_views as f64,
        )),
        most_viewed_product,
    }
}
