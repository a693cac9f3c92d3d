//! Observability infrastructure for the watcher
//!
//! Provides:
//! - Prometheus metrics (pass latency, pass outcomes, samples, alerts, delivery failures)
//! - Structured JSON logging with tracing

use crate::alerts::{Alert, AlertLevel};
use crate::error::WatchError;
use prometheus::{
    register_histogram, register_int_counter_vec, register_int_gauge, Histogram, IntCounterVec,
    IntGauge,
};
use std::sync::OnceLock;
use std::time::Duration;
use tracing::{error, info, warn};

/// Histogram buckets for pass latency (in seconds); passes are network bound
const PASS_LATENCY_BUCKETS: &[f64] = &[0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 20.0, 40.0];

/// Global metrics instance (registered once)
static GLOBAL_METRICS: OnceLock<AgentMetricsInner> = OnceLock::new();

/// Inner metrics structure that holds the actual Prometheus metrics
struct AgentMetricsInner {
    pass_latency_seconds: Histogram,
    passes_completed: IntGauge,
    pass_failures: IntGauge,
    samples_recorded: IntGauge,
    metrics_tracked: IntGauge,
    alerts_emitted: IntCounterVec,
    delivery_failures: IntGauge,
}

impl AgentMetricsInner {
    fn new() -> Self {
        Self {
            pass_latency_seconds: register_histogram!(
                "lendwatch_pass_latency_seconds",
                "Time spent running one evaluation pass",
                PASS_LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register pass_latency_seconds"),

            passes_completed: register_int_gauge!(
                "lendwatch_passes_completed_total",
                "Total number of evaluation passes completed"
            )
            .expect("Failed to register passes_completed"),

            pass_failures: register_int_gauge!(
                "lendwatch_pass_failures_total",
                "Total number of evaluation passes that failed"
            )
            .expect("Failed to register pass_failures"),

            samples_recorded: register_int_gauge!(
                "lendwatch_samples_recorded_total",
                "Total number of samples recorded"
            )
            .expect("Failed to register samples_recorded"),

            metrics_tracked: register_int_gauge!(
                "lendwatch_metrics_tracked",
                "Number of metric keys currently stored, baselines excluded"
            )
            .expect("Failed to register metrics_tracked"),

            alerts_emitted: register_int_counter_vec!(
                "lendwatch_alerts_emitted_total",
                "Total number of alerts emitted",
                &["category", "level"]
            )
            .expect("Failed to register alerts_emitted"),

            delivery_failures: register_int_gauge!(
                "lendwatch_delivery_failures_total",
                "Total number of alert deliveries that failed"
            )
            .expect("Failed to register delivery_failures"),
        }
    }
}

/// Watcher metrics for Prometheus exposition
///
/// This is a lightweight handle to the global metrics instance.
/// Multiple clones share the same underlying metrics.
#[derive(Clone)]
pub struct AgentMetrics {
    _private: (),
}

impl Default for AgentMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl AgentMetrics {
    /// Create a new metrics handle (initializes global metrics if needed)
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(AgentMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &AgentMetricsInner {
        GLOBAL_METRICS.get().expect("Metrics not initialized")
    }

    pub fn observe_pass_latency(&self, duration_secs: f64) {
        self.inner().pass_latency_seconds.observe(duration_secs);
    }

    pub fn inc_passes_completed(&self) {
        self.inner().passes_completed.inc();
    }

    pub fn inc_pass_failures(&self) {
        self.inner().pass_failures.inc();
    }

    pub fn add_samples_recorded(&self, count: usize) {
        self.inner().samples_recorded.add(count as i64);
    }

    pub fn set_metrics_tracked(&self, count: i64) {
        self.inner().metrics_tracked.set(count);
    }

    pub fn inc_alert(&self, alert: &Alert) {
        self.inner()
            .alerts_emitted
            .with_label_values(&[alert.category.as_str(), alert.level.as_str()])
            .inc();
    }

    pub fn inc_delivery_failures(&self) {
        self.inner().delivery_failures.inc();
    }
}

/// Structured logger for watcher events
///
/// Provides consistent JSON-formatted logging for passes, alerts,
/// and other significant events.
#[derive(Clone)]
pub struct StructuredLogger {
    instance: String,
}

impl StructuredLogger {
    pub fn new(instance: impl Into<String>) -> Self {
        Self {
            instance: instance.into(),
        }
    }

    pub fn log_alert(&self, alert: &Alert) {
        match alert.level {
            AlertLevel::Major => warn!(
                event = "alert_emitted",
                instance = %self.instance,
                category = %alert.category,
                level = %alert.level,
                metric_key = %alert.metric_key,
                "Major alert emitted"
            ),
            AlertLevel::Minor => info!(
                event = "alert_emitted",
                instance = %self.instance,
                category = %alert.category,
                level = %alert.level,
                metric_key = %alert.metric_key,
                "Alert emitted"
            ),
        }
    }

    pub fn log_pass_complete(&self, samples: usize, alerts: usize, elapsed: Duration) {
        info!(
            event = "pass_completed",
            instance = %self.instance,
            samples = samples,
            alerts = alerts,
            elapsed_ms = elapsed.as_millis() as u64,
            "Evaluation pass complete"
        );
    }

    /// Pass failures go to the log and status surface, never to alert sinks
    pub fn log_pass_failed(&self, err: &WatchError, elapsed: Duration) {
        error!(
            event = "pass_failed",
            instance = %self.instance,
            error_kind = err.kind(),
            error = %err,
            elapsed_ms = elapsed.as_millis() as u64,
            "Evaluation pass failed"
        );
    }

    pub fn log_delivery_failure(&self, alert: &Alert, sink: &str, err: &anyhow::Error) {
        warn!(
            event = "alert_delivery_failed",
            instance = %self.instance,
            sink = %sink,
            category = %alert.category,
            metric_key = %alert.metric_key,
            error = %err,
            "Alert delivery failed"
        );
    }

    pub fn log_startup(&self, version: &str, sources: usize, cap_policy: &str) {
        info!(
            event = "agent_started",
            instance = %self.instance,
            version = %version,
            sources = sources,
            cap_policy = %cap_policy,
            "Lendwatch agent started"
        );
    }

    pub fn log_shutdown(&self, reason: &str) {
        info!(
            event = "agent_shutdown",
            instance = %self.instance,
            reason = %reason,
            "Lendwatch agent shutting down"
        );
    }
}
