//! API client for communicating with a running watcher

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::collections::HashMap;
use url::Url;

/// API client for the watcher's introspection API
pub struct ApiClient {
    client: Client,
    base_url: Url,
}

impl ApiClient {
    /// Create a new API client
    pub fn new(base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client")?;

        let base_url = Url::parse(base_url).context("Invalid API URL")?;

        Ok(Self { client, base_url })
    }

    /// Make a GET request
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = self.base_url.join(path).context("Invalid path")?;

        let response = self
            .client
            .get(url)
            .send()
            .await
            .context("Failed to send request")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorResponse>(&body)
                .map(|e| e.error)
                .unwrap_or(body);
            anyhow::bail!("API error ({}): {}", status, message);
        }

        response.json().await.context("Failed to parse response")
    }

    /// Fetch health, accepting the 503 the server returns when unhealthy
    pub async fn health(&self) -> Result<HealthResponse> {
        let url = self.base_url.join("healthz").context("Invalid path")?;

        let response = self
            .client
            .get(url)
            .send()
            .await
            .context("Failed to send request")?;

        let status = response.status();
        if !status.is_success() && status != reqwest::StatusCode::SERVICE_UNAVAILABLE {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("API error ({}): {}", status, body);
        }

        response.json().await.context("Failed to parse response")
    }

    pub async fn list_metrics(&self) -> Result<MetricList> {
        self.get("api/v1/metrics").await
    }

    pub async fn metric(&self, key: &str) -> Result<MetricDetail> {
        self.get(&format!("api/v1/metrics/{}", key)).await
    }

    pub async fn history(&self, key: &str, limit: usize) -> Result<MetricHistory> {
        self.get(&format!("api/v1/metrics/{}/history?limit={}", key, limit))
            .await
    }

    pub async fn status(&self) -> Result<RunStatus> {
        self.get("api/v1/status").await
    }

    pub async fn info(&self) -> Result<WatcherInfo> {
        self.get("api/v1/info").await
    }
}

// API response types

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricSummary {
    pub key: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricList {
    pub metrics: Vec<MetricSummary>,
    pub total: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricDetail {
    pub key: String,
    pub name: String,
    pub kind: String,
    pub unit: String,
    pub value: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub baseline: Option<f64>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub key: String,
    pub value: f64,
    pub observed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricHistory {
    pub key: String,
    pub entries: Vec<HistoryEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunStatus {
    pub started_at: DateTime<Utc>,
    pub last_run_at: Option<DateTime<Utc>>,
    pub last_error_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
    pub passes_completed: u64,
    pub passes_failed: u64,
    pub last_alert_count: usize,
    pub uptime_secs: i64,
    pub health: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatcherInfo {
    pub version: String,
    pub interval_secs: u64,
    pub cap_policy: String,
    pub cap_full_threshold: f64,
    pub cap_clear_threshold: f64,
    pub rate_minor_change: f64,
    pub rate_major_change: f64,
    pub sources: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentHealth {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub components: HashMap<String, ComponentHealth>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}
