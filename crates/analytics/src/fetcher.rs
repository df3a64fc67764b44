//! Raw data fetchers. All nine collections are requested concurrently and
//! joined before any reducer runs.

use serde::de::DeserializeOwned;
use serde_json::Value;
use storefront_core::types::{
    AbandonmentReason, AnalyticsEvent, CartItem, FitFeedback, FunnelEvent, Order, Product,
    RecentlyViewedItem, WishlistItem,
};
use storefront_core::{AnalyticsError, AnalyticsResult};
use tracing::{debug, error, warn};

use crate::date_range::DateWindow;
use crate::source::{Collection, DataSource, Filter};

/// Typed records for one cycle.
#[derive(Debug, Clone, Default)]
pub struct RawDataset {
    pub orders: Vec<Order>,
    pub cart_items: Vec<CartItem>,
    pub events: Vec<AnalyticsEvent>,
    pub products: Vec<Product>,
    pub funnel_events: Vec<FunnelEvent>,
    pub abandonment_reasons: Vec<AbandonmentReason>,
    pub fit_feedback: Vec<FitFeedback>,
    pub wishlist: Vec<WishlistItem>,
    pub recently_viewed: Vec<RecentlyViewedItem>,
    /// Rows dropped because they did not match their record shape.
    pub skipped_records: usize,
}

/// Fetch every collection for `window`.
///
/// Fails if any required collection fails; optional collections degrade
/// to empty. Products are reference data and are fetched unfiltered.
pub async fn fetch_dataset(
    source: &dyn DataSource,
    window: &DateWindow,
) -> AnalyticsResult<RawDataset> {
    let dated = Filter::within(*window);
    let catalog = Filter::all();

    let (
        orders,
        cart_items,
        events,
        products,
        funnel_events,
        abandonment_reasons,
        fit_feedback,
        wishlist,
        recently_viewed,
    ) = tokio::join!(
        source.fetch(Collection::Orders, &dated),
        source.fetch(Collection::CartItems, &dated),
        source.fetch(Collection::AnalyticsEvents, &dated),
        source.fetch(Collection::Products, &catalog),
        source.fetch(Collection::FunnelEvents, &dated),
        source.fetch(Collection::AbandonmentReasons, &dated),
        source.fetch(Collection::FitFeedback, &dated),
        source.fetch(Collection::Wishlist, &dated),
        source.fetch(Collection::RecentlyViewed, &dated),
    );

    let orders = required(Collection::Orders, orders)?;
    let cart_items = required(Collection::CartItems, cart_items)?;
    let events = required(Collection::AnalyticsEvents, events)?;
    let products = required(Collection::Products, products)?;

    let mut skipped = 0;
    let dataset = RawDataset {
        orders: decode(Collection::Orders, orders, &mut skipped),
        cart_items: decode(Collection::CartItems, cart_items, &mut skipped),
        events: decode(Collection::AnalyticsEvents, events, &mut skipped),
        products: decode(Collection::Products, products, &mut skipped),
        funnel_events: decode(
            Collection::FunnelEvents,
            optional(Collection::FunnelEvents, funnel_events),
            &mut skipped,
        ),
        abandonment_reasons: decode(
            Collection::AbandonmentReasons,
            optional(Collection::AbandonmentReasons, abandonment_reasons),
            &mut skipped,
        ),
        fit_feedback: decode(
            Collection::FitFeedback,
            optional(Collection::FitFeedback, fit_feedback),
            &mut skipped,
        ),
        wishlist: decode(
            Collection::Wishlist,
            optional(Collection::Wishlist, wishlist),
            &mut skipped,
        ),
        recently_viewed: decode(
            Collection::RecentlyViewed,
            optional(Collection::RecentlyViewed, recently_viewed),
            &mut skipped,
        ),
        skipped_records: skipped,
    };

    if skipped > 0 {
        metrics::counter!("analytics.records.skipped").increment(skipped as u64);
    }
    debug!(
        orders = dataset.orders.len(),
        cart_items = dataset.cart_items.len(),
        events = dataset.events.len(),
        products = dataset.products.len(),
        skipped = skipped,
        "Analytics dataset fetched"
    );

    Ok(dataset)
}

fn required(
    collection: Collection,
    result: AnalyticsResult<Vec<Value>>,
) -> AnalyticsResult<Vec<Value>> {
    result.map_err(|e| {
        error!(collection = %collection, error = %e, "Required analytics fetch failed");
        match e {
            AnalyticsError::Fetch { .. } => e,
            other => AnalyticsError::fetch(collection.table_name(), other.to_string()),
        }
    })
}

fn optional(collection: Collection, result: AnalyticsResult<Vec<Value>>) -> Vec<Value> {
    match result {
        Ok(rows) => rows,
        Err(e) => {
            metrics::counter!("analytics.fetch.optional_failed").increment(1);
            warn!(
                collection = %collection,
                error = %e,
                "Optional analytics fetch failed, using empty set"
            );
            Vec::new()
        }
    }
}

fn decode<T: DeserializeOwned>(
    collection: Collection,
    rows: Vec<Value>,
    skipped: &mut usize,
) -> Vec<T> {
    rows.into_iter()
        .filter_map(|row| match serde_json::from_value::<T>(row) {
            Ok(record) => Some(record),
            Err(e) => {
                warn!(collection = %collection, error = %e, "Skipping malformed record");
                *skipped += 1;
                None
            }
        })
        .collect()
}
