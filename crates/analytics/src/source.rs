//! Data-source seam: the read contract the pipeline needs from the
//! storefront backend.
//!
//! Rows travel as raw JSON so a malformed record can be dropped by the
//! fetcher instead of failing the whole collection.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use storefront_core::AnalyticsResult;
use uuid::Uuid;

use crate::date_range::DateWindow;

/// Backend collections read by the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Collection {
    Orders,
    CartItems,
    AnalyticsEvents,
    Products,
    FunnelEvents,
    AbandonmentReasons,
    FitFeedback,
    Wishlist,
    RecentlyViewed,
}

impl Collection {
    pub const ALL: [Collection; 9] = [
        Collection::Orders,
        Collection::CartItems,
        Collection::AnalyticsEvents,
        Collection::Products,
        Collection::FunnelEvents,
        Collection::AbandonmentReasons,
        Collection::FitFeedback,
        Collection::Wishlist,
        Collection::RecentlyViewed,
    ];

    pub fn table_name(&self) -> &'static str {
        match self {
            Collection::Orders => "orders",
            Collection::CartItems => "cart_items",
            Collection::AnalyticsEvents => "analytics_events",
            Collection::Products => "products",
            Collection::FunnelEvents => "funnel_events",
            Collection::AbandonmentReasons => "abandonment_reasons",
            Collection::FitFeedback => "fit_feedback",
            Collection::Wishlist => "wishlist",
            Collection::RecentlyViewed => "recently_viewed",
        }
    }

    pub fn from_table_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.table_name() == name)
    }

    /// A failed fetch of a required collection aborts the cycle. Optional
    /// collections may be missing from a deployment and degrade to empty.
    pub fn is_required(&self) -> bool {
        matches!(
            self,
            Collection::Orders
                | Collection::CartItems
                | Collection::AnalyticsEvents
                | Collection::Products
        )
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.table_name())
    }
}

/// Row filter: `created_at` within a window plus field equality predicates.
#[derive(Debug, Clone, Default)]
pub struct Filter {
    pub window: Option<DateWindow>,
    pub equals: Vec<(String, Value)>,
}

impl Filter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn within(window: DateWindow) -> Self {
        Self {
            window: Some(window),
            equals: Vec::new(),
        }
    }

    pub fn eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.equals.push((field.into(), value.into()));
        self
    }

    /// Whether a raw row passes the filter. Rows without a parseable
    /// `created_at` never match a windowed filter.
    pub fn matches(&self, row: &Value) -> bool {
        if let Some(window) = &self.window {
            let created_at = row
                .get("created_at")
                .and_then(Value::as_str)
                .and_then(|s| s.parse::<DateTime<Utc>>().ok());
            match created_at {
                Some(ts) if window.contains(&ts) => {}
                _ => return false,
            }
        }
        self.equals
            .iter()
            .all(|(field, expected)| row.get(field) == Some(expected))
    }
}

/// Invoked on any insert/update/delete in a watched collection. Carries no
/// row payload; listeners re-fetch.
pub type ChangeCallback = Arc<dyn Fn(Collection) + Send + Sync>;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SubscriptionHandle {
    pub id: Uuid,
    pub collection: Collection,
}

impl SubscriptionHandle {
    pub fn new(collection: Collection) -> Self {
        Self {
            id: Uuid::new_v4(),
            collection,
        }
    }
}

/// Read-only access to the storefront backend.
#[async_trait]
pub trait DataSource: Send + Sync {
    async fn fetch(&self, collection: Collection, filter: &Filter) -> AnalyticsResult<Vec<Value>>;

    fn subscribe(
        &self,
        collection: Collection,
        on_change: ChangeCallback,
    ) -> AnalyticsResult<SubscriptionHandle>;

    fn unsubscribe(&self, handle: &SubscriptionHandle);
}
