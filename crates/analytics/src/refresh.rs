//! Live refresh controller.
//!
//! Watches `orders`, `cart_items` and `wishlist` and re-runs the whole
//! fetch → reduce cycle when any of them changes. Notifications carry no
//! payload, so there is nothing to patch incrementally.
//!
//! Triggers land on a single [`Notify`], which stores at most one permit:
//! however many triggers arrive while a cycle is running, exactly one more
//! cycle follows it. Change notifications are debounced on a trailing-edge
//! timer; explicit requests skip the debounce.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use storefront_core::AnalyticsResult;
use tokio::sync::{watch, Notify};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::pipeline::AnalyticsPipeline;
use crate::source::{ChangeCallback, Collection, SubscriptionHandle};

pub const WATCHED_COLLECTIONS: [Collection; 3] =
    [Collection::Orders, Collection::CartItems, Collection::Wishlist];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshState {
    /// Subscribed; the published snapshot is current.
    Idle,
    /// A fetch + reduce cycle is in flight.
    Refreshing,
}

struct Trigger {
    notify: Notify,
    /// Set by explicit requests so the worker skips the debounce window.
    urgent: AtomicBool,
    /// The pipeline's queued flag; reads as loading until the cycle starts.
    queued: Arc<AtomicBool>,
}

impl Trigger {
    fn new(queued: Arc<AtomicBool>) -> Self {
        Self {
            notify: Notify::new(),
            urgent: AtomicBool::new(false),
            queued,
        }
    }

    fn changed(&self) {
        self.queued.store(true, Ordering::SeqCst);
        self.notify.notify_one();
    }

    fn request(&self) {
        self.urgent.store(true, Ordering::SeqCst);
        self.changed();
    }
}

pub struct LiveRefresh {
    pipeline: Arc<AnalyticsPipeline>,
    trigger: Arc<Trigger>,
    state: watch::Receiver<RefreshState>,
    cycles_run: Arc<AtomicU64>,
    subscriptions: Mutex<Vec<SubscriptionHandle>>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl LiveRefresh {
    /// Subscribe to the watched collections and spawn the refresh worker.
    /// Must be called from within a Tokio runtime.
    pub fn start(pipeline: Arc<AnalyticsPipeline>, debounce: Duration) -> AnalyticsResult<Self> {
        let trigger = Arc::new(Trigger::new(pipeline.queued_flag()));

        let mut subscriptions = Vec::with_capacity(WATCHED_COLLECTIONS.len());
        for collection in WATCHED_COLLECTIONS {
            let on_change: ChangeCallback = {
                let trigger = trigger.clone();
                Arc::new(move |collection| {
                    debug!(collection = %collection, "Change observed, scheduling refresh");
                    trigger.changed();
                })
            };
            match pipeline.source().subscribe(collection, on_change) {
                Ok(handle) => subscriptions.push(handle),
                Err(e) => {
                    warn!(collection = %collection, error = %e, "Live refresh subscription failed");
                    for handle in &subscriptions {
                        pipeline.source().unsubscribe(handle);
                    }
                    return Err(e);
                }
            }
        }

        let (state_tx, state) = watch::channel(RefreshState::Idle);
        let cycles_run = Arc::new(AtomicU64::new(0));
        let worker = tokio::spawn(run_worker(
            pipeline.clone(),
            trigger.clone(),
            state_tx,
            cycles_run.clone(),
            debounce,
        ));

        info!(
            collections = WATCHED_COLLECTIONS.len(),
            debounce_ms = debounce.as_millis() as u64,
            "Live refresh started"
        );

        Ok(Self {
            pipeline,
            trigger,
            state,
            cycles_run,
            subscriptions: Mutex::new(subscriptions),
            worker: Mutex::new(Some(worker)),
        })
    }

    /// Schedule a cycle without debouncing. Calls made while a cycle is in
    /// flight collapse into a single follow-up cycle.
    pub fn request(&self) {
        self.trigger.request();
    }

    pub fn state(&self) -> RefreshState {
        *self.state.borrow()
    }

    pub fn state_changes(&self) -> watch::Receiver<RefreshState> {
        self.state.clone()
    }

    /// Cycles started by the worker since [`start`](Self::start).
    pub fn cycles_run(&self) -> u64 {
        self.cycles_run.load(Ordering::SeqCst)
    }

    /// Release every subscription and stop the worker. Idempotent.
    pub fn shutdown(&self) {
        let subscriptions = std::mem::take(&mut *self.subscriptions.lock());
        for handle in &subscriptions {
            self.pipeline.source().unsubscribe(handle);
        }
        if let Some(worker) = self.worker.lock().take() {
            worker.abort();
            self.trigger.queued.store(false, Ordering::SeqCst);
            info!("Live refresh stopped");
        }
    }
}

impl Drop for LiveRefresh {
    fn drop(&mut self) {
        self.shutdown();
    }
}

async fn run_worker(
    pipeline: Arc<AnalyticsPipeline>,
    trigger: Arc<Trigger>,
    state: watch::Sender<RefreshState>,
    cycles_run: Arc<AtomicU64>,
    debounce: Duration,
) {
    loop {
        trigger.notify.notified().await;

        if !trigger.urgent.swap(false, Ordering::SeqCst) && !debounce.is_zero() {
            settle(&trigger, debounce).await;
        }

        state.send_replace(RefreshState::Refreshing);
        cycles_run.fetch_add(1, Ordering::SeqCst);
        if let Err(e) = pipeline.run_cycle().await {
            // Already logged and surfaced by the pipeline.
            debug!(error = %e, "Live refresh cycle failed");
        }
        state.send_replace(RefreshState::Idle);
    }
}

/// Wait until `debounce` passes without another change notification, or
/// until an explicit request arrives.
async fn settle(trigger: &Trigger, debounce: Duration) {
    loop {
        tokio::select! {
            _ = trigger.notify.notified() => {
                if trigger.urgent.swap(false, Ordering::SeqCst) {
                    return;
                }
            }
            _ = tokio::time::sleep(debounce) => return,
        }
    }
}
