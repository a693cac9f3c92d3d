//! Log-only alert sink for dry runs

use super::{async_trait, AlertSink};
use crate::alerts::Alert;
use anyhow::Result;
use tracing::info;

/// Sink that writes alerts to the log instead of a destination
#[derive(Debug, Clone, Default)]
pub struct LogSink;

#[async_trait]
impl AlertSink for LogSink {
    fn name(&self) -> &str {
        "log"
    }

    async fn send(&self, alert: &Alert, text: &str) -> Result<()> {
        info!(
            event = "alert_dry_run",
            category = %alert.category,
            level = %alert.level,
            metric_key = %alert.metric_key,
            text = %text,
            "Alert (dry run)"
        );
        Ok(())
    }
}
