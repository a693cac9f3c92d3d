//! Run status shared between the scheduler and the introspection API
//!
//! The scheduler is the only writer; readers take snapshots.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Point-in-time view of the scheduler's progress
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusSnapshot {
    pub started_at: DateTime<Utc>,
    pub last_run_at: Option<DateTime<Utc>>,
    pub last_error_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
    pub passes_completed: u64,
    pub passes_failed: u64,
    pub last_alert_count: usize,
}

impl StatusSnapshot {
    fn new(started_at: DateTime<Utc>) -> Self {
        Self {
            started_at,
            last_run_at: None,
            last_error_at: None,
            last_error: None,
            passes_completed: 0,
            passes_failed: 0,
            last_alert_count: 0,
        }
    }

    pub fn uptime_secs(&self, now: DateTime<Utc>) -> i64 {
        (now - self.started_at).num_seconds().max(0)
    }
}

/// Cloneable handle to the run status
#[derive(Debug, Clone)]
pub struct RunStatus {
    inner: Arc<RwLock<StatusSnapshot>>,
}

impl Default for RunStatus {
    fn default() -> Self {
        Self::new()
    }
}

impl RunStatus {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(StatusSnapshot::new(Utc::now()))),
        }
    }

    /// Record a completed pass; clears the last error
    pub async fn record_success(&self, alert_count: usize) {
        let mut status = self.inner.write().await;
        status.last_run_at = Some(Utc::now());
        status.last_error = None;
        status.passes_completed += 1;
        status.last_alert_count = alert_count;
    }

    /// Record a failed pass
    pub async fn record_failure(&self, error: impl Into<String>) {
        let mut status = self.inner.write().await;
        status.last_error_at = Some(Utc::now());
        status.last_error = Some(error.into());
        status.passes_failed += 1;
    }

    pub async fn snapshot(&self) -> StatusSnapshot {
        self.inner.read().await.clone()
    }
}
