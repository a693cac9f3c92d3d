//! Alert delivery
//!
//! Handles:
//! - Routing alerts to a destination by category
//! - Prefixing major alerts with the configured mention marker
//! - Isolating delivery failures so one bad destination never drops or
//!   reorders delivery to the others

mod log;
mod webhook;

pub use self::log::LogSink;
pub use webhook::{WebhookPayload, WebhookSink};

use crate::alerts::{Alert, AlertCategory};
use crate::observability::{AgentMetrics, StructuredLogger};
use anyhow::Result;
use std::collections::HashMap;
use std::sync::Arc;

pub use async_trait::async_trait;

/// Destination for formatted alerts
#[async_trait]
pub trait AlertSink: Send + Sync {
    /// Name used in logs
    fn name(&self) -> &str;

    /// Deliver one alert; `text` is the final rendered message
    async fn send(&self, alert: &Alert, text: &str) -> Result<()>;
}

/// Outcome of delivering one pass worth of alerts
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DeliveryReport {
    pub delivered: usize,
    pub failed: usize,
    /// Alerts whose category has no configured destination
    pub unrouted: usize,
}

impl DeliveryReport {
    pub fn is_clean(&self) -> bool {
        self.failed == 0 && self.unrouted == 0
    }
}

/// Routes alerts to sinks by category
#[derive(Clone, Default)]
pub struct AlertRouter {
    routes: HashMap<AlertCategory, Arc<dyn AlertSink>>,
    mention: Option<String>,
    metrics: Option<AgentMetrics>,
    logger: Option<StructuredLogger>,
}

impl AlertRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Route a category to a sink, replacing any previous route
    pub fn route(mut self, category: AlertCategory, sink: Arc<dyn AlertSink>) -> Self {
        self.routes.insert(category, sink);
        self
    }

    /// Escalation marker prepended to major alerts
    pub fn with_mention(mut self, mention: impl Into<String>) -> Self {
        let mention = mention.into();
        self.mention = if mention.trim().is_empty() {
            None
        } else {
            Some(mention)
        };
        self
    }

    pub fn with_observability(mut self, metrics: AgentMetrics, logger: StructuredLogger) -> Self {
        self.metrics = Some(metrics);
        self.logger = Some(logger);
        self
    }

    pub fn has_route(&self, category: AlertCategory) -> bool {
        self.routes.contains_key(&category)
    }

    /// Render the final text for an alert
    pub fn format(&self, alert: &Alert) -> String {
        match (&self.mention, alert.is_major()) {
            (Some(mention), true) => format!("{} {}", mention, alert.message),
            _ => alert.message.clone(),
        }
    }

    /// Deliver alerts in order, continuing past failed destinations
    pub async fn deliver(&self, alerts: &[Alert]) -> DeliveryReport {
        let mut report = DeliveryReport::default();

        for alert in alerts {
            let Some(sink) = self.routes.get(&alert.category) else {
                report.unrouted += 1;
                tracing::warn!(
                    category = %alert.category,
                    metric_key = %alert.metric_key,
                    "No destination configured for alert category"
                );
                continue;
            };

            let text = self.format(alert);
            match sink.send(alert, &text).await {
                Ok(()) => report.delivered += 1,
                Err(e) => {
                    report.failed += 1;
                    if let Some(metrics) = &self.metrics {
                        metrics.inc_delivery_failures();
                    }
                    match &self.logger {
                        Some(logger) => logger.log_delivery_failure(alert, sink.name(), &e),
                        None => tracing::warn!(
                            sink = %sink.name(),
                            metric_key = %alert.metric_key,
                            error = %e,
                            "Alert delivery failed"
                        ),
                    }
                }
            }
        }

        report
    }
}
