//! Storefront analytics pipeline — fetches orders, carts, click-stream and
//! engagement records for a date window and folds them into the KPI
//! snapshot rendered by the back-office dashboard.
//!
//! # Modules
//!
//! - [`date_range`] — Symbolic range tags resolved to concrete windows
//! - [`source`] — Data-source seam (fetch / subscribe / unsubscribe)
//! - [`memory`] — In-process data source seeded from JSON fixtures
//! - [`fetcher`] — Concurrent per-collection fetch with failure isolation
//! - [`reducers`] — Pure KPI reducers
//! - [`snapshot`] — The immutable KPI snapshot published per cycle
//! - [`pipeline`] — Fetch → reduce → publish cycles with stale-result guard
//! - [`refresh`] — Live refresh controller driven by change notifications
//! - [`dashboard`] — Read-only handle consumed by dashboard widgets

pub mod dashboard;
pub mod date_range;
pub mod fetcher;
pub mod memory;
pub mod pipeline;
pub mod reducers;
pub mod refresh;
pub mod snapshot;
pub mod source;

pub use dashboard::DashboardHandle;
pub use date_range::{DateRange, DateWindow};
pub use memory::MemorySource;
pub use pipeline::{AnalyticsPipeline, CycleOutcome};
pub use refresh::{LiveRefresh, RefreshState};
pub use snapshot::KpiSnapshot;
pub use source::{Collection, DataSource, Filter, SubscriptionHandle};
