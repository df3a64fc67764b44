//! The KPI snapshot: every reducer's output for one cycle, published as a
//! single immutable value.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use storefront_core::config::AnalyticsConfig;

use crate::date_range::DateWindow;
use crate::fetcher::RawDataset;
use crate::reducers::{self, *};

/// Caps for the ranked lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReducerLimits {
    pub trending: usize,
    pub list: usize,
}

impl Default for ReducerLimits {
    fn default() -> Self {
        Self {
            trending: 10,
            list: 20,
        }
    }
}

impl From<&AnalyticsConfig> for ReducerLimits {
    fn from(config: &AnalyticsConfig) -> Self {
        Self {
            trending: config.trending_limit,
            list: config.list_limit,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KpiSnapshot {
    /// Sequence number of the cycle that produced this snapshot; `0` before
    /// the first successful cycle.
    pub sequence: u64,
    pub window: Option<DateWindow>,
    pub generated_at: Option<DateTime<Utc>>,
    pub skipped_records: usize,
    pub cart: CartKpis,
    pub product: ProductKpis,
    pub funnel: Vec<FunnelStep>,
    pub abandonment_reasons: Vec<Bucket>,
    pub abandoned_products: Vec<AbandonedProduct>,
    pub size_distribution: Vec<Bucket>,
    pub fit_feedback: Vec<Bucket>,
    pub trending_products: Vec<TrendingProduct>,
    pub wishlist_conversion: Vec<WishlistStats>,
    pub recently_viewed: Vec<RecentlyViewedStats>,
    pub high_intent_pages: Vec<PageIntent>,
}

impl KpiSnapshot {
    /// Run every reducer over `dataset`.
    pub fn reduce(
        dataset: &RawDataset,
        window: DateWindow,
        sequence: u64,
        limits: ReducerLimits,
    ) -> Self {
        let catalog = Catalog::new(&dataset.products);

        Self {
            sequence,
            window: Some(window),
            generated_at: Some(Utc::now()),
            skipped_records: dataset.skipped_records,
            cart: cart_kpis(&dataset.cart_items, &dataset.orders),
            product: product_kpis(&dataset.events, &catalog),
            funnel: funnel_steps(&dataset.funnel_events),
            abandonment_reasons: reducers::abandonment_reasons(&dataset.abandonment_reasons),
            abandoned_products: abandoned_products(
                &dataset.cart_items,
                &dataset.orders,
                &catalog,
                limits.list,
            ),
            size_distribution: size_distribution(&dataset.cart_items),
            fit_feedback: fit_feedback_distribution(&dataset.fit_feedback),
            trending_products: trending_products(&dataset.events, &catalog, limits.trending),
            wishlist_conversion: wishlist_conversion(
                &dataset.wishlist,
                &dataset.orders,
                &catalog,
                limits.list,
            ),
            recently_viewed: recently_viewed_engagement(
                &dataset.recently_viewed,
                &catalog,
                limits.list,
            ),
            high_intent_pages: high_intent_pages(&dataset.events, limits.list),
        }
    }

    /// Whether the funnel is placeholder data rather than recorded events.
    pub fn funnel_is_synthetic(&self) -> bool {
        self.funnel.iter().any(|step| step.is_synthetic)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reducers::fixtures::{add_to_cart, cart_item, order, page_view, product};

    fn window() -> DateWindow {
        DateWindow::new(
            "2026-10-01T00:00:00Z".parse().unwrap(),
            "2026-10-31T00:00:00Z".parse().unwrap(),
        )
    }

    #[test]
    fn test_empty_snapshot() {
        let snapshot = KpiSnapshot::default();
        assert_eq!(snapshot.sequence, 0);
        assert!(snapshot.funnel.is_empty());
        assert!(!snapshot.funnel_is_synthetic());
    }

    #[test]
    fn test_reduce_fills_every_section() {
        let dataset = RawDataset {
            orders: vec![order("o-1", "paid", 25.0, &["p-1"])],
            cart_items: vec![
                cart_item("c-1", "s-1", "p-1", Some("M")),
                cart_item("c-2", "s-2", "p-2", Some("S")),
            ],
            events: vec![
                page_view("s-1", "/product/one"),
                page_view("s-1", "/product/one"),
                add_to_cart("s-1", "/product/one"),
            ],
            products: vec![product("p-1", "one", "One"), product("p-2", "two", "Two")],
            skipped_records: 2,
            ..RawDataset::default()
        };

        let snapshot = KpiSnapshot::reduce(&dataset, window(), 7, ReducerLimits::default());
        assert_eq!(snapshot.sequence, 7);
        assert_eq!(snapshot.window, Some(window()));
        assert_eq!(snapshot.skipped_records, 2);
        assert_eq!(snapshot.cart.total_carts, 2);
        assert_eq!(snapshot.product.add_to_cart_rate, 50.0);
        assert!(snapshot.funnel_is_synthetic());
        assert_eq!(snapshot.abandoned_products.len(), 1);
        assert_eq!(snapshot.abandoned_products[0].product_id, "p-2");
        assert_eq!(snapshot.size_distribution.len(), 2);
        assert_eq!(snapshot.fit_feedback.len(), 3);
        assert_eq!(snapshot.trending_products[0].product_id, "p-1");
        assert_eq!(snapshot.trending_products[0].velocity_score, 4);
        assert_eq!(snapshot.high_intent_pages[0].page_url, "/product/one");
    }

    #[test]
    fn test_snapshot_serializes() {
        let json = serde_json::to_value(KpiSnapshot::default()).unwrap();
        assert_eq!(json["sequence"], 0);
        assert!(json["cart"]["cart_abandonment_rate"].is_number());
    }
}
