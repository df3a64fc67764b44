//! Read-only record projections fetched from the storefront backend.
//!
//! Every type deserializes from the JSON row shape the backend returns.
//! Optional columns default when absent so older deployments still parse.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Order statuses that do not count as a completed checkout.
pub const INCOMPLETE_ORDER_STATUSES: [&str; 2] = ["pending", "cancelled"];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: String,
    #[serde(default)]
    pub customer_name: String,
    #[serde(default)]
    pub customer_email: String,
    #[serde(default)]
    pub customer_phone: Option<String>,
    #[serde(default)]
    pub subtotal: f64,
    #[serde(default)]
    pub discount: f64,
    #[serde(default)]
    pub shipping_cost: f64,
    #[serde(default)]
    pub tax: f64,
    pub total: f64,
    pub status: String,
    #[serde(default)]
    pub payment_method: Option<String>,
    #[serde(default)]
    pub items: Vec<OrderItem>,
    pub created_at: DateTime<Utc>,
}

impl Order {
    /// Anything past `pending` that was not cancelled.
    pub fn is_completed_checkout(&self) -> bool {
        let status = self.status.trim().to_ascii_lowercase();
        !INCOMPLETE_ORDER_STATUSES.contains(&status.as_str())
    }

    pub fn contains_product(&self, product_id: &str) -> bool {
        self.items.iter().any(|item| item.product_id == product_id)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderItem {
    pub product_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub price: f64,
    #[serde(default = "default_quantity")]
    pub quantity: u32,
    #[serde(default)]
    pub size: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartItem {
    pub id: String,
    pub session_id: String,
    pub product_id: String,
    #[serde(default)]
    pub size: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default = "default_quantity")]
    pub quantity: u32,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Click-stream event produced by storefront instrumentation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyticsEvent {
    pub session_id: String,
    pub event_type: String,
    #[serde(default)]
    pub page_url: String,
    #[serde(default)]
    pub click_target: Option<String>,
    #[serde(default)]
    pub product_id: Option<String>,
    /// Percentage of the page scrolled.
    #[serde(default)]
    pub scroll_depth: Option<f64>,
    /// Seconds spent in the session when the event fired.
    #[serde(default)]
    pub session_duration: Option<f64>,
    #[serde(default)]
    pub device_type: Option<String>,
    #[serde(default)]
    pub browser: Option<String>,
    #[serde(default)]
    pub os: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl AnalyticsEvent {
    pub const PAGE_VIEW: &'static str = "page_view";
    pub const CLICK: &'static str = "click";
    pub const ADD_TO_CART_TARGET: &'static str = "add_to_cart_button";

    pub fn is_page_view(&self) -> bool {
        self.event_type == Self::PAGE_VIEW
    }

    /// A click on the add-to-cart button, regardless of the page it happened on.
    pub fn is_add_to_cart_click(&self) -> bool {
        self.event_type == Self::CLICK
            && self.click_target.as_deref() == Some(Self::ADD_TO_CART_TARGET)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    pub id: String,
    pub slug: String,
    pub name: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub brand: Option<String>,
    #[serde(default)]
    pub price: f64,
    #[serde(default)]
    pub original_price: Option<f64>,
    #[serde(default)]
    pub stock_count: i64,
    #[serde(default = "default_visible")]
    pub is_visible: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WishlistItem {
    pub id: String,
    pub session_id: String,
    pub product_id: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecentlyViewedItem {
    pub id: String,
    pub session_id: String,
    pub product_id: String,
    #[serde(default)]
    pub time_spent_seconds: Option<f64>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FitFeedback {
    pub id: String,
    pub product_id: String,
    #[serde(default)]
    pub size: Option<String>,
    pub fit: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AbandonmentReason {
    pub id: String,
    #[serde(default)]
    pub session_id: Option<String>,
    pub reason: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunnelEvent {
    pub id: String,
    pub session_id: String,
    pub step: String,
    pub created_at: DateTime<Utc>,
}

fn default_quantity() -> u32 {
    1
}
fn default_visible() -> bool {
    true
}
