//! User-facing notifications (the dashboard toast channel).
//!
//! Pipeline components accept an `Arc<dyn NotificationSink>` to surface
//! problems to whoever is looking at the dashboard, separately from logs.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Error,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notice {
    pub severity: Severity,
    pub title: String,
    pub message: String,
    pub raised_at: DateTime<Utc>,
}

impl Notice {
    pub fn error(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            title: title.into(),
            message: message.into(),
            raised_at: Utc::now(),
        }
    }

    pub fn info(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Info,
            title: title.into(),
            message: message.into(),
            raised_at: Utc::now(),
        }
    }
}

/// Receives user-visible notices.
pub trait NotificationSink: Send + Sync {
    fn notify(&self, notice: Notice);
}

/// Writes notices to the tracing pipeline. Used when no UI is attached.
pub struct LogSink;

impl NotificationSink for LogSink {
    fn notify(&self, notice: Notice) {
        match notice.severity {
            Severity::Error => error!(title = %notice.title, "{}", notice.message),
            Severity::Info => info!(title = %notice.title, "{}", notice.message),
        }
    }
}

/// In-memory sink that captures notices for testing.
#[derive(Default)]
pub struct CaptureSink {
    notices: Mutex<Vec<Notice>>,
}

impl CaptureSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notices(&self) -> Vec<Notice> {
        self.notices.lock().clone()
    }

    pub fn count(&self) -> usize {
        self.notices.lock().len()
    }

    pub fn count_severity(&self, severity: Severity) -> usize {
        self.notices
            .lock()
            .iter()
            .filter(|n| n.severity == severity)
            .count()
    }

    pub fn clear(&self) {
        self.notices.lock().clear();
    }
}

impl NotificationSink for CaptureSink {
    fn notify(&self, notice: Notice) {
        self.notices.lock().push(notice);
    }
}

/// Convenience: a sink that only logs.
pub fn log_sink() -> Arc<dyn NotificationSink> {
    Arc::new(LogSink)
}

/// Convenience: create a capture sink for tests.
pub fn capture_sink() -> Arc<CaptureSink> {
    Arc::new(CaptureSink::new())
}
