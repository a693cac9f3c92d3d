//! Webhook alert sink

use super::{async_trait, AlertSink};
use crate::alerts::{Alert, AlertCategory, AlertLevel};
use anyhow::{Context, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

/// JSON body posted for each alert
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookPayload {
    /// Rendered text, including any mention marker
    pub content: String,
    pub category: AlertCategory,
    pub level: AlertLevel,
    pub metric_key: String,
}

/// Sink posting each alert to an HTTP webhook
pub struct WebhookSink {
    name: String,
    url: Url,
    client: Client,
}

impl WebhookSink {
    pub fn new(name: impl Into<String>, url: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .context("Failed to create HTTP client")?;

        let url = Url::parse(url).context("Invalid webhook URL")?;

        Ok(Self {
            name: name.into(),
            url,
            client,
        })
    }
}

#[async_trait]
impl AlertSink for WebhookSink {
    fn name(&self) -> &str {
        &self.name
    }

    async fn send(&self, alert: &Alert, text: &str) -> Result<()> {
        let payload = WebhookPayload {
            content: text.to_string(),
            category: alert.category,
            level: alert.level,
            metric_key: alert.metric_key.clone(),
        };

        let response = self
            .client
            .post(self.url.clone())
            .json(&payload)
            .send()
            .await
            .context("Failed to send webhook request")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Webhook error ({}): {}", status, body);
        }

        Ok(())
    }
}
