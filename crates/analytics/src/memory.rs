//! In-process data source backed by DashMap. Seeds from a JSON fixture
//! document keyed by table name and notifies subscribers on every mutation.

use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::Value;
use storefront_core::{AnalyticsError, AnalyticsResult};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::source::{ChangeCallback, Collection, DataSource, Filter, SubscriptionHandle};

pub struct MemorySource {
    rows: DashMap<Collection, Vec<Value>>,
    subscribers: DashMap<Uuid, (Collection, ChangeCallback)>,
    failures: DashMap<Collection, String>,
    latency: parking_lot::Mutex<Option<Duration>>,
    fetch_count: AtomicU64,
}

impl Default for MemorySource {
    fn default() -> Self {
        Self::new()
    }
}

impl MemorySource {
    pub fn new() -> Self {
        Self {
            rows: DashMap::new(),
            subscribers: DashMap::new(),
            failures: DashMap::new(),
            latency: parking_lot::Mutex::new(None),
            fetch_count: AtomicU64::new(0),
        }
    }

    /// Build a source from a fixture document such as
    /// `{"orders": [...], "cart_items": [...]}`. Unknown tables are skipped.
    pub fn from_fixture(fixture: &Value) -> AnalyticsResult<Self> {
        let source = Self::new();
        source.reseed(fixture)?;
        Ok(source)
    }

    pub fn load_fixture(path: impl AsRef<Path>) -> AnalyticsResult<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        let fixture: Value = serde_json::from_str(&raw)?;
        let source = Self::from_fixture(&fixture)?;
        info!(path = %path.as_ref().display(), rows = source.total_rows(), "Fixture loaded");
        Ok(source)
    }

    /// Replace every table named in the fixture, notifying subscribers of
    /// each replaced table.
    pub fn reseed(&self, fixture: &Value) -> AnalyticsResult<()> {
        let tables = fixture
            .as_object()
            .ok_or_else(|| AnalyticsError::Source("fixture must be a JSON object".into()))?;

        for (name, rows) in tables {
            let Some(collection) = Collection::from_table_name(name) else {
                warn!(table = %name, "Skipping unknown fixture table");
                continue;
            };
            let rows = rows.as_array().cloned().ok_or_else(|| {
                AnalyticsError::Source(format!("fixture table '{name}' must be an array"))
            })?;
            self.replace(collection, rows);
        }
        Ok(())
    }

    pub fn insert(&self, collection: Collection, row: Value) {
        self.rows.entry(collection).or_default().push(row);
        self.notify(collection);
    }

    pub fn replace(&self, collection: Collection, rows: Vec<Value>) {
        self.rows.insert(collection, rows);
        self.notify(collection);
    }

    pub fn clear(&self, collection: Collection) {
        self.rows.remove(&collection);
        self.notify(collection);
    }

    /// Make every fetch of `collection` fail until [`heal`](Self::heal) is called.
    pub fn fail_collection(&self, collection: Collection, message: impl Into<String>) {
        self.failures.insert(collection, message.into());
    }

    pub fn heal(&self, collection: Collection) {
        self.failures.remove(&collection);
    }

    /// Delay applied to every fetch, simulating a remote backend.
    pub fn set_latency(&self, latency: Option<Duration>) {
        *self.latency.lock() = latency;
    }

    pub fn len(&self, collection: Collection) -> usize {
        self.rows.get(&collection).map(|r| r.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.total_rows() == 0
    }

    pub fn total_rows(&self) -> usize {
        self.rows.iter().map(|r| r.value().len()).sum()
    }

    /// Number of fetches started so far.
    pub fn fetch_count(&self) -> u64 {
        self.fetch_count.load(Ordering::SeqCst)
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    fn notify(&self, collection: Collection) {
        // Collect first so callbacks run without holding a shard lock.
        let callbacks: Vec<ChangeCallback> = self
            .subscribers
            .iter()
            .filter(|entry| entry.value().0 == collection)
            .map(|entry| entry.value().1.clone())
            .collect();
        debug!(collection = %collection, listeners = callbacks.len(), "Collection changed");
        for callback in callbacks {
            callback(collection);
        }
    }
}

#[async_trait]
impl DataSource for MemorySource {
    async fn fetch(&self, collection: Collection, filter: &Filter) -> AnalyticsResult<Vec<Value>> {
        self.fetch_count.fetch_add(1, Ordering::SeqCst);

        let latency = *self.latency.lock();
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }

        if let Some(message) = self.failures.get(&collection) {
            return Err(AnalyticsError::fetch(collection.table_name(), message.value().clone()));
        }

        Ok(self
            .rows
            .get(&collection)
            .map(|rows| rows.iter().filter(|row| filter.matches(row)).cloned().collect())
            .unwrap_or_default())
    }

    fn subscribe(
        &self,
        collection: Collection,
        on_change: ChangeCallback,
    ) -> AnalyticsResult<SubscriptionHandle> {
        let handle = SubscriptionHandle::new(collection);
        self.subscribers.insert(handle.id, (collection, on_change));
        debug!(collection = %collection, id = %handle.id, "Subscribed");
        Ok(handle)
    }

    fn unsubscribe(&self, handle: &SubscriptionHandle) {
        if self.subscribers.remove(&handle.id).is_some() {
            debug!(collection = %handle.collection, id = %handle.id, "Unsubscribed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_fixture_seeding_and_filtering() {
        let source = MemorySource::from_fixture(&json!({
            "orders": [
                {"id": "o-1", "created_at": "2026-10-01T10:00:00Z"},
                {"id": "o-2", "created_at": "2026-09-01T10:00:00Z"}
            ],
            "customers": [{"id": "c-1"}]
        }))
        .unwrap();

        assert_eq!(source.len(Collection::Orders), 2);
        assert_eq!(source.total_rows(), 2);

        let window = crate::DateWindow::new(
            "2026-10-01T00:00:00Z".parse().unwrap(),
            "2026-10-02T00:00:00Z".parse().unwrap(),
        );
        let rows = source
            .fetch(Collection::Orders, &Filter::within(window))
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["id"], "o-1");

        let empty = source
            .fetch(Collection::Wishlist, &Filter::all())
            .await
            .unwrap();
        assert!(empty.is_empty());
        assert_eq!(source.fetch_count(), 2);
    }

    #[test]
    fn test_fixture_must_be_object() {
        assert!(MemorySource::from_fixture(&json!([1, 2, 3])).is_err());
        assert!(MemorySource::from_fixture(&json!({"orders": {"id": "x"}})).is_err());
    }

    #[tokio::test]
    async fn test_injected_failure() {
        let source = MemorySource::new();
        source.fail_collection(Collection::Orders, "connection refused");

        let err = source
            .fetch(Collection::Orders, &Filter::all())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            AnalyticsError::Fetch { ref collection, .. } if collection == "orders"
        ));

        source.heal(Collection::Orders);
        assert!(source.fetch(Collection::Orders, &Filter::all()).await.is_ok());
    }

    #[test]
    fn test_subscribers_notified_per_collection() {
        let source = MemorySource::new();
        let hits = Arc::new(AtomicUsize::new(0));

        let counter = hits.clone();
        let handle = source
            .subscribe(
                Collection::Orders,
                Arc::new(move |_| {
                    counter.fetch_add(1, Ordering::SeqCst);
                }),
            )
            .unwrap();
        assert_eq!(source.subscriber_count(), 1);

        source.insert(Collection::Orders, json!({"id": "o-1"}));
        source.insert(Collection::CartItems, json!({"id": "c-1"}));
        source.clear(Collection::Orders);
        assert_eq!(hits.load(Ordering::SeqCst), 2);

        source.unsubscribe(&handle);
        source.insert(Collection::Orders, json!({"id": "o-2"}));
        assert_eq!(hits.load(Ordering::SeqCst), 2);
        assert_eq!(source.subscriber_count(), 0);
    }
}
