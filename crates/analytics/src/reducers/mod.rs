//! KPI reducers — pure folds from raw records to dashboard structures.
//!
//! Every percentage is clamped to `[0, 100]` and a zero denominator
//! yields `0`. Ranked lists break ties on their identifier so the output
//! does not depend on fetch order.

pub mod abandoned;
pub mod cart;
pub mod engagement;
pub mod funnel;
pub mod histogram;
pub mod pages;
pub mod product;
pub mod trending;

use std::collections::HashMap;

use storefront_core::types::{AnalyticsEvent, Product};
use url::Url;

pub use abandoned::{abandoned_products, AbandonedProduct};
pub use cart::{cart_kpis, CartKpis};
pub use engagement::{
    recently_viewed_engagement, wishlist_conversion, RecentlyViewedStats, WishlistStats,
};
pub use funnel::{funnel_steps, FunnelStep, FUNNEL_STEPS};
pub use histogram::{abandonment_reasons, fit_feedback_distribution, size_distribution, Bucket};
pub use pages::{high_intent_pages, PageIntent};
pub use product::{product_kpis, MostViewedProduct, ProductKpis};
pub use trending::{trending_products, TrendingProduct};

/// `numerator / denominator × 100`, clamped to `[0, 100]`; `0` when the
/// denominator is zero.
pub fn percentage(numerator: f64, denominator: f64) -> f64 {
    if denominator <= 0.0 || !numerator.is_finite() || !denominator.is_finite() {
        return 0.0;
    }
    (numerator / denominator * 100.0).clamp(0.0, 100.0)
}

pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Mean of the values, `0` for an empty input.
pub fn mean(values: impl IntoIterator<Item = f64>) -> f64 {
    let (sum, count) = values
        .into_iter()
        .fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}

/// Parse a page URL that may be absolute or a bare path.
pub(crate) fn parse_page_url(page_url: &str) -> Option<Url> {
    match Url::parse(page_url) {
        Ok(url) => Some(url),
        Err(_) => Url::parse("http://storefront.invalid/")
            .ok()?
            .join(page_url)
            .ok(),
    }
}

/// Path of a page URL with query and fragment stripped.
pub fn page_path(page_url: &str) -> Option<String> {
    let url = parse_page_url(page_url)?;
    let path = url.path().trim_end_matches('/');
    Some(if path.is_empty() { "/".to_string() } else { path.to_string() })
}

/// Slug in the path segment following `/product/`.
pub fn product_slug(page_url: &str) -> Option<String> {
    let url = parse_page_url(page_url)?;
    let mut segments = url.path_segments()?;
    segments.by_ref().find(|s| *s == "product")?;
    segments
        .next()
        .filter(|slug| !slug.is_empty())
        .map(str::to_string)
}

/// A page view on a product detail page.
pub fn is_product_view(event: &AnalyticsEvent) -> bool {
    event.is_page_view() && product_slug(&event.page_url).is_some()
}

/// Product reference data indexed by id and slug.
pub struct Catalog<'a> {
    by_id: HashMap<&'a str, &'a Product>,
    by_slug: HashMap<&'a str, &'a Product>,
}

impl<'a> Catalog<'a> {
    pub fn new(products: &'a [Product]) -> Self {
        let mut by_id = HashMap::with_capacity(products.len());
        let mut by_slug = HashMap::with_capacity(products.len());
        for product in products {
            by_id.insert(product.id.as_str(), product);
            by_slug.insert(product.slug.as_str(), product);
        }
        Self { by_id, by_slug }
    }

    pub fn by_id(&self, id: &str) -> Option<&'a Product> {
        self.by_id.get(id).copied()
    }

    pub fn by_slug(&self, slug: &str) -> Option<&'a Product> {
        self.by_slug.get(slug).copied()
    }

    pub fn name(&self, id: &str) -> Option<String> {
        self.by_id(id).map(|p| p.name.clone())
    }

    /// Product an event refers to: its explicit `product_id`, else the
    /// catalog entry for the page slug, else the bare slug.
    pub fn product_key(&self, event: &AnalyticsEvent) -> Option<String> {
        if let Some(id) = event.product_id.as_deref().filter(|id| !id.is_empty()) {
            return Some(id.to_string());
        }
        let slug = product_slug(&event.page_url)?;
        Some(match self.by_slug(&slug) {
            Some(product) => product.id.clone(),
            None => slug,
        })
    }
}
