//! Fetch → reduce → publish cycles.
//!
//! Each cycle takes a sequence number when it starts. On completion it
//! publishes only if no later-started cycle has already published, so
//! overlapping cycles can never roll the dashboard back to older data.

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use storefront_core::config::AnalyticsConfig;
use storefront_core::notify::{Notice, NotificationSink};
use storefront_core::AnalyticsResult;
use tokio::sync::watch;
use tracing::{debug, error, info};

use crate::date_range::DateRange;
use crate::fetcher::fetch_dataset;
use crate::snapshot::{KpiSnapshot, ReducerLimits};
use crate::source::DataSource;

/// What happened to a cycle's result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    Published { sequence: u64 },
    /// A cycle started later had already published.
    Stale { sequence: u64, latest: u64 },
}

pub struct AnalyticsPipeline {
    source: Arc<dyn DataSource>,
    notifier: Arc<dyn NotificationSink>,
    limits: ReducerLimits,
    range: RwLock<DateRange>,
    next_sequence: AtomicU64,
    /// Sequence of the snapshot currently published.
    published: Mutex<u64>,
    in_flight: AtomicUsize,
    /// Set while a cycle has been requested but has not started yet.
    queued: Arc<AtomicBool>,
    sender: watch::Sender<Arc<KpiSnapshot>>,
}

impl AnalyticsPipeline {
    pub fn new(
        source: Arc<dyn DataSource>,
        notifier: Arc<dyn NotificationSink>,
        config: &AnalyticsConfig,
    ) -> AnalyticsResult<Self> {
        let range: DateRange = config.default_range.parse()?;
        Ok(Self::with_range(
            source,
            notifier,
            range,
            ReducerLimits::from(config),
        ))
    }

    pub fn with_range(
        source: Arc<dyn DataSource>,
        notifier: Arc<dyn NotificationSink>,
        range: DateRange,
        limits: ReducerLimits,
    ) -> Self {
        let (sender, _) = watch::channel(Arc::new(KpiSnapshot::default()));
        Self {
            source,
            notifier,
            limits,
            range: RwLock::new(range),
            next_sequence: AtomicU64::new(0),
            published: Mutex::new(0),
            in_flight: AtomicUsize::new(0),
            queued: Arc::new(AtomicBool::new(false)),
            sender,
        }
    }

    pub fn source(&self) -> &Arc<dyn DataSource> {
        &self.source
    }

    pub fn range(&self) -> DateRange {
        *self.range.read()
    }

    /// Takes effect from the next cycle started.
    pub fn set_range(&self, range: DateRange) {
        *self.range.write() = range;
        info!(range = %range, "Analytics range changed");
    }

    /// Latest published snapshot.
    pub fn snapshot(&self) -> Arc<KpiSnapshot> {
        self.sender.borrow().clone()
    }

    /// Receiver that wakes whenever a new snapshot is published.
    pub fn subscribe(&self) -> watch::Receiver<Arc<KpiSnapshot>> {
        self.sender.subscribe()
    }

    /// True while a cycle is running or one has been requested and not yet
    /// started.
    pub fn is_loading(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst) > 0 || self.queued.load(Ordering::SeqCst)
    }

    /// Flag shared with schedulers: raised when they queue a cycle, lowered
    /// when the next cycle starts.
    pub(crate) fn queued_flag(&self) -> Arc<AtomicBool> {
        self.queued.clone()
    }

    /// Number of cycles started so far.
    pub fn cycles_started(&self) -> u64 {
        self.next_sequence.load(Ordering::SeqCst)
    }

    /// Run one full cycle. On failure the previous snapshot stays published
    /// and a notice is raised; the error is returned for logging only.
    pub async fn run_cycle(&self) -> AnalyticsResult<CycleOutcome> {
        let sequence = self.next_sequence.fetch_add(1, Ordering::SeqCst) + 1;
        let _loading = LoadingGuard::enter(&self.in_flight);
        self.queued.store(false, Ordering::SeqCst);
        metrics::counter!("analytics.cycles.started").increment(1);

        let range = self.range();
        let window = range.resolve();
        debug!(
            sequence,
            range = %range,
            start = %window.start,
            end = %window.end,
            "Analytics cycle started"
        );

        let dataset = match fetch_dataset(self.source.as_ref(), &window).await {
            Ok(dataset) => dataset,
            Err(e) => {
                metrics::counter!("analytics.cycles.failed").increment(1);
                error!(sequence, error = %e, "Analytics cycle failed, keeping previous snapshot");
                self.notifier
                    .notify(Notice::error("Failed to load analytics", e.to_string()));
                return Err(e);
            }
        };

        let snapshot = KpiSnapshot::reduce(&dataset, window, sequence, self.limits);
        Ok(self.publish(snapshot))
    }

    fn publish(&self, snapshot: KpiSnapshot) -> CycleOutcome {
        let sequence = snapshot.sequence;
        let mut published = self.published.lock();
        if sequence <= *published {
            metrics::counter!("analytics.cycles.stale").increment(1);
            debug!(sequence, latest = *published, "Discarding stale analytics snapshot");
            return CycleOutcome::Stale {
                sequence,
                latest: *published,
            };
        }
        *published = sequence;
        self.sender.send_replace(Arc::new(snapshot));
        metrics::counter!("analytics.cycles.published").increment(1);
        debug!(sequence, "Analytics snapshot published");
        CycleOutcome::Published { sequence }
    }
}

/// Counts a cycle as in flight until dropped, including when the cycle's
/// future is dropped mid-fetch.
struct LoadingGuard<'a>(&'a AtomicUsize);

impl<'a> LoadingGuard<'a> {
    fn enter(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemorySource;
    use crate::source::Collection;
    use serde_json::json;
    use std::time::Duration;
    use storefront_core::notify::{capture_sink, CaptureSink, Severity};

    fn recent(offset_minutes: i64) -> String {
        (chrono::Utc::now() - chrono::Duration::minutes(offset_minutes)).to_rfc3339()
    }

    fn seeded_source() -> Arc<MemorySource> {
        Arc::new(
            MemorySource::from_fixture(&json!({
                "orders": [
                    {"id": "o-1", "total": 30.0, "status": "paid", "created_at": recent(30)},
                    {"id": "o-2", "total": 10.0, "status": "pending", "created_at": recent(20)}
                ],
                "cart_items": [
                    {"id": "c-1", "session_id": "s-1", "product_id": "p-1", "created_at": recent(40)},
                    {"id": "c-2", "session_id": "s-2", "product_id": "p-2", "created_at": recent(40)}
                ],
                "products": [{"id": "p-1", "slug": "one", "name": "One"}]
            }))
            .unwrap(),
        )
    }

    fn pipeline(source: Arc<MemorySource>) -> (AnalyticsPipeline, Arc<CaptureSink>) {
        let sink = capture_sink();
        let pipeline = AnalyticsPipeline::with_range(
            source,
            sink.clone(),
            DateRange::Last7Days,
            ReducerLimits::default(),
        );
        (pipeline, sink)
    }

    #[tokio::test]
    async fn test_cycle_publishes_snapshot() {
        let (pipeline, sink) = pipeline(seeded_source());
        let mut changes = pipeline.subscribe();
        assert_eq!(pipeline.snapshot().sequence, 0);

        let outcome = pipeline.run_cycle().await.unwrap();
        assert_eq!(outcome, CycleOutcome::Published { sequence: 1 });
        assert!(changes.has_changed().unwrap());

        let snapshot = changes.borrow_and_update().clone();
        assert_eq!(snapshot.sequence, 1);
        assert_eq!(snapshot.cart.total_carts, 2);
        assert_eq!(snapshot.cart.completed_checkouts, 1);
        assert_eq!(snapshot.cart.cart_abandonment_rate, 50.0);
        assert!(!pipeline.is_loading());
        assert_eq!(sink.count(), 0);
    }

    #[tokio::test]
    async fn test_required_failure_keeps_previous_snapshot() {
        let source = seeded_source();
        let (pipeline, sink) = pipeline(source.clone());

        pipeline.run_cycle().await.unwrap();
        let before = pipeline.snapshot();

        source.fail_collection(Collection::Orders, "backend unavailable");
        assert!(pipeline.run_cycle().await.is_err());

        let after = pipeline.snapshot();
        assert!(Arc::ptr_eq(&before, &after));
        assert!(!pipeline.is_loading());
        assert_eq!(sink.count_severity(Severity::Error), 1);
        assert!(sink.notices()[0].message.contains("orders"));
    }

    #[tokio::test]
    async fn test_optional_failure_still_publishes() {
        let source = seeded_source();
        source.fail_collection(Collection::FitFeedback, "relation does not exist");
        let (pipeline, sink) = pipeline(source);

        let outcome = pipeline.run_cycle().await.unwrap();
        assert!(matches!(outcome, CycleOutcome::Published { .. }));
        assert_eq!(sink.count(), 0);
    }

    #[tokio::test]
    async fn test_overlapping_cycles_publish_newest_only() {
        let source = seeded_source();
        let (pipeline, _sink) = pipeline(source.clone());
        let pipeline = Arc::new(pipeline);

        // First cycle is slow.
        source.set_latency(Some(Duration::from_millis(200)));
        let slow = tokio::spawn({
            let pipeline = pipeline.clone();
            async move { pipeline.run_cycle().await }
        });
        while source.fetch_count() < Collection::ALL.len() as u64 {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
        assert!(pipeline.is_loading());

        // Second cycle starts later but finishes first.
        source.set_latency(None);
        source.insert(
            Collection::Orders,
            json!({"id": "o-3", "total": 99.0, "status": "paid", "created_at": recent(5)}),
        );
        let fast = pipeline.run_cycle().await.unwrap();
        assert_eq!(fast, CycleOutcome::Published { sequence: 2 });

        let slow = slow.await.unwrap().unwrap();
        assert_eq!(slow, CycleOutcome::Stale { sequence: 1, latest: 2 });

        let snapshot = pipeline.snapshot();
        assert_eq!(snapshot.sequence, 2);
        assert_eq!(snapshot.cart.total_orders, 3);
        assert!(!pipeline.is_loading());
    }

    #[tokio::test]
    async fn test_range_change_applies_to_next_cycle() {
        let (pipeline, _sink) = pipeline(seeded_source());
        let january = DateRange::Custom {
            start: Some("2026-01-01T00:00:00Z".parse().unwrap()),
            end: Some("2026-02-01T00:00:00Z".parse().unwrap()),
        };
        pipeline.set_range(january);
        assert_eq!(pipeline.range(), january);

        pipeline.run_cycle().await.unwrap();
        let snapshot = pipeline.snapshot();
        // Everything was seeded within the last hour.
        assert_eq!(snapshot.cart.total_orders, 0);
        assert_eq!(snapshot.window, Some(january.resolve()));
    }

    #[test]
    fn test_new_rejects_unknown_default_range() {
        let config = AnalyticsConfig {
            default_range: "fortnight".into(),
            ..AnalyticsConfig::default()
        };
        let result = AnalyticsPipeline::new(
            Arc::new(MemorySource::new()),
            capture_sink(),
            &config,
        );
        assert!(result.is_err());
    }
}
