//! High-intent pages: where viewers most often go on to add to cart.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use storefront_core::types::AnalyticsEvent;

use super::{mean, page_path, percentage, round1};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageIntent {
    pub page_url: String,
    pub views: u64,
    pub add_to_cart_clicks: u64,
    pub add_to_cart_rate: f64,
    pub avg_time_spent_seconds: f64,
    pub avg_scroll_depth: f64,
}

#[derive(Default)]
struct PageTally {
    views: u64,
    adds: u64,
    durations: Vec<f64>,
    scroll_depths: Vec<f64>,
}

/// Pages are keyed by path, so query strings and trailing slashes collapse.
/// Only pages with at least one view are reported.
pub fn high_intent_pages(events: &[AnalyticsEvent], limit: usize) -> Vec<PageIntent> {
    let mut tallies: HashMap<String, PageTally> = HashMap::new();

    for event in events {
        let is_view = event.is_page_view();
        let is_add = event.is_add_to_cart_click();
        if !is_view && !is_add {
            continue;
        }
        let Some(path) = page_path(&event.page_url) else {
            continue;
        };
        let tally = tallies.entry(path).or_default();
        if is_add {
            tally.adds += 1;
            continue;
        }
        tally.views += 1;
        if let Some(duration) = event.session_duration.filter(|d| d.is_finite() && *d >= 0.0) {
            tally.durations.push(duration);
        }
        if let Some(depth) = event.scroll_depth.filter(|d| d.is_finite()) {
            tally.scroll_depths.push(depth.clamp(0.0, 100.0));
        }
    }

    let mut pages: Vec<PageIntent> = tallies
        .into_iter()
        .filter(|(_, tally)| tally.views > 0)
        .map(|(page_url, tally)| PageIntent {
            page_url,
            views: tally.views,
            add_to_cart_clicks: tally.adds,
            add_to_cart_rate: round1(percentage(tally.adds as f64, tally.views as f64)),
            avg_time_spent_seconds: round1(mean(tally.durations)),
            avg_scroll_depth: round1(mean(tally.scroll_depths)),
        })
        .collect();

    pages.sort_by(|a, b| {
        b.add_to_cart_rate
            .total_cmp(&a.add_to_cart_rate)
            .then_with(|| b.views.cmp(&a.views))
            .then_with(|| a.page_url.cmp(&b.page_url))
    });
    pages.truncate(limit);
    pages
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reducers::fixtures::{add_to_cart, page_view};

    fn view(url: &str, duration: f64, depth: f64) -> AnalyticsEvent {
        let mut event = page_view("s-1", url);
        event.session_duration = Some(duration);
        event.scroll_depth = Some(depth);
        event
    }

    #[test]
    fn test_ranked_by_add_to_cart_rate() {
        let events = vec![
            view("/product/a", 30.0, 50.0),
            view("/product/a?ref=email", 10.0, 150.0),
            add_to_cart("s-1", "/product/a"),
            view("/product/b", 20.0, 40.0),
            add_to_cart("s-1", "/product/b"),
            view("/", 5.0, 10.0),
            // Clicks on a page nobody viewed are not reported.
            add_to_cart("s-2", "/product/ghost"),
        ];

        let pages = high_intent_pages(&events, 20);
        let urls: Vec<&str> = pages.iter().map(|p| p.page_url.as_str()).collect();
        assert_eq!(urls, vec!["/product/b", "/product/a", "/"]);

        assert_eq!(pages[0].add_to_cart_rate, 100.0);
        assert_eq!(pages[1].views, 2);
        assert_eq!(pages[1].add_to_cart_rate, 50.0);
        assert_eq!(pages[1].avg_time_spent_seconds, 20.0);
        // Scroll depth is clamped to 100 before averaging.
        assert_eq!(pages[1].avg_scroll_depth, 75.0);
        assert_eq!(pages[2].add_to_cart_rate, 0.0);
    }

    #[test]
    fn test_missing_metrics_average_to_zero() {
        let pages = high_intent_pages(&[page_view("s-1", "/cart")], 20);
        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].avg_time_spent_seconds, 0.0);
        assert_eq!(pages[0].avg_scroll_depth, 0.0);
    }
}
