//! Read-only handle consumed by dashboard widgets.
//!
//! Widgets read the latest snapshot, a loading flag and a change stream, and
//! can ask for a refetch or a different date range. They never see the
//! fetch/reduce machinery behind it.

use std::sync::Arc;
use std::time::Duration;

use storefront_core::config::AnalyticsConfig;
use storefront_core::notify::NotificationSink;
use storefront_core::AnalyticsResult;
use tokio::sync::watch;
use tracing::info;

use crate::date_range::DateRange;
use crate::pipeline::AnalyticsPipeline;
use crate::refresh::{LiveRefresh, RefreshState};
use crate::snapshot::KpiSnapshot;
use crate::source::DataSource;

pub struct DashboardHandle {
    pipeline: Arc<AnalyticsPipeline>,
    refresh: LiveRefresh,
}

impl DashboardHandle {
    /// Build the pipeline, start live refresh and schedule the initial load.
    /// Until that load publishes, [`snapshot`](Self::snapshot) returns the
    /// empty snapshot with sequence `0`.
    pub fn start(
        source: Arc<dyn DataSource>,
        notifier: Arc<dyn NotificationSink>,
        config: &AnalyticsConfig,
    ) -> AnalyticsResult<Self> {
        let pipeline = Arc::new(AnalyticsPipeline::new(source, notifier, config)?);
        Self::with_pipeline(pipeline, Duration::from_millis(config.debounce_ms))
    }

    pub fn with_pipeline(
        pipeline: Arc<AnalyticsPipeline>,
        debounce: Duration,
    ) -> AnalyticsResult<Self> {
        let refresh = LiveRefresh::start(pipeline.clone(), debounce)?;
        refresh.request();
        info!(range = %pipeline.range(), "Dashboard started");
        Ok(Self { pipeline, refresh })
    }

    pub fn snapshot(&self) -> Arc<KpiSnapshot> {
        self.pipeline.snapshot()
    }

    /// True while a cycle is in flight or queued behind a refetch, a range
    /// change or a backend change.
    pub fn is_loading(&self) -> bool {
        self.pipeline.is_loading()
    }

    pub fn changes(&self) -> watch::Receiver<Arc<KpiSnapshot>> {
        self.pipeline.subscribe()
    }

    pub fn range(&self) -> DateRange {
        self.pipeline.range()
    }

    pub fn set_range(&self, range: DateRange) {
        self.pipeline.set_range(range);
        self.refresh.request();
    }

    /// Re-run the cycle for the current range. Safe to call at any rate:
    /// calls made while a cycle is in flight collapse into one follow-up.
    pub fn refetch(&self) {
        self.refresh.request();
    }

    pub fn refresh_state(&self) -> RefreshState {
        self.refresh.state()
    }

    /// Stop live refresh. The last snapshot stays readable.
    pub fn close(&self) {
        self.refresh.shutdown();
    }
}
