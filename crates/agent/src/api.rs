//! HTTP API for health checks, Prometheus metrics and read-only introspection

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Utc};
use lendwatch_lib::{
    alerts::{CapPolicy, RateThresholds},
    baseline_key,
    health::{ComponentStatus, HealthRegistry},
    is_baseline_key,
    observability::AgentMetrics,
    store::SampleStore,
    HistoryEntry, MetricKind, RunStatus, StatusSnapshot, StoreError,
};
use prometheus::{Encoder, TextEncoder};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info};

/// Default number of history entries returned
const DEFAULT_HISTORY_LIMIT: usize = 50;

/// Thresholds and cadence reported by `/api/v1/info`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InfoResponse {
    pub version: String,
    pub interval_secs: u64,
    pub cap_policy: String,
    pub cap_full_threshold: f64,
    pub cap_clear_threshold: f64,
    pub rate_minor_change: f64,
    pub rate_major_change: f64,
    pub sources: Vec<String>,
}

impl InfoResponse {
    pub fn new(
        interval_secs: u64,
        cap_policy: CapPolicy,
        rates: RateThresholds,
        sources: Vec<String>,
    ) -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            interval_secs,
            cap_policy: cap_policy.name().to_string(),
            cap_full_threshold: cap_policy.full_threshold(),
            cap_clear_threshold: cap_policy.clear_threshold(),
            rate_minor_change: rates.minor,
            rate_major_change: rates.major,
            sources,
        }
    }
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub health_registry: HealthRegistry,
    pub metrics: AgentMetrics,
    pub store: Arc<dyn SampleStore>,
    pub status: RunStatus,
    pub info: InfoResponse,
}

impl AppState {
    pub fn new(
        health_registry: HealthRegistry,
        metrics: AgentMetrics,
        store: Arc<dyn SampleStore>,
        status: RunStatus,
        info: InfoResponse,
    ) -> Self {
        Self {
            health_registry,
            metrics,
            store,
            status,
            info,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MetricSummary {
    pub key: String,
    pub name: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MetricListResponse {
    pub metrics: Vec<MetricSummary>,
    pub total: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MetricDetail {
    pub key: String,
    pub name: String,
    pub kind: MetricKind,
    pub unit: String,
    pub value: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub baseline: Option<f64>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HistoryResponse {
    pub key: String,
    pub entries: Vec<HistoryEntry>,
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StatusResponse {
    #[serde(flatten)]
    pub status: StatusSnapshot,
    pub uptime_secs: i64,
    pub health: ComponentStatus,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// API-level errors
enum ApiError {
    NotFound(String),
    Store(StoreError),
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        ApiError::Store(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NotFound(key) => (StatusCode::NOT_FOUND, format!("Unknown metric key: {}", key)),
            ApiError::Store(e) => {
                error!(error = %e, "Store read failed");
                (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
            }
        };
        (status, Json(ErrorResponse { error: message })).into_response()
    }
}

/// Health check response - returns 200 if healthy, 503 if unhealthy
async fn healthz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let health = state.health_registry.health().await;

    let status_code = match health.status {
        ComponentStatus::Healthy => StatusCode::OK,
        ComponentStatus::Degraded => StatusCode::OK, // Still operational
        ComponentStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };

    (status_code, Json(health))
}

/// Readiness check response - returns 200 if ready, 503 if not ready
async fn readyz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let readiness = state.health_registry.readiness().await;

    let status_code = if readiness.ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status_code, Json(readiness))
}

/// Prometheus metrics endpoint
async fn metrics() -> impl IntoResponse {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        error!(error = %e, "Failed to encode metrics");
        return (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response();
    }

    (
        StatusCode::OK,
        [("content-type", "text/plain; charset=utf-8")],
        buffer,
    )
        .into_response()
}

/// Known metrics, baselines excluded
async fn list_metrics(
    State(state): State<Arc<AppState>>,
) -> Result<Json<MetricListResponse>, ApiError> {
    let mut metrics: Vec<MetricSummary> = state
        .store
        .list_metrics()?
        .into_iter()
        .filter(|m| !is_baseline_key(&m.key))
        .map(|m| MetricSummary {
            key: m.key,
            name: m.display_name,
        })
        .collect();
    metrics.sort_by(|a, b| a.key.cmp(&b.key));

    let total = metrics.len();
    Ok(Json(MetricListResponse { metrics, total }))
}

/// Current value (and baseline for rate metrics) of one metric
async fn get_metric(
    State(state): State<Arc<AppState>>,
    Path(key): Path<String>,
) -> Result<Json<MetricDetail>, ApiError> {
    let sample = state
        .store
        .get_sample(&key)?
        .ok_or_else(|| ApiError::NotFound(key.clone()))?;

    let baseline = match sample.kind() {
        MetricKind::Rate if !is_baseline_key(&key) => state.store.get_last(&baseline_key(&key))?,
        _ => None,
    };

    Ok(Json(MetricDetail {
        kind: sample.kind(),
        key: sample.key,
        name: sample.display_name,
        unit: sample.unit,
        value: sample.value,
        baseline,
        updated_at: sample.observed_at,
    }))
}

async fn get_history(
    State(state): State<Arc<AppState>>,
    Path(key): Path<String>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<HistoryResponse>, ApiError> {
    if state.store.get_sample(&key)?.is_none() {
        return Err(ApiError::NotFound(key));
    }

    let limit = query.limit.unwrap_or(DEFAULT_HISTORY_LIMIT);
    let entries = state.store.history(&key, limit)?;
    Ok(Json(HistoryResponse { key, entries }))
}

async fn status(State(state): State<Arc<AppState>>) -> Json<StatusResponse> {
    let snapshot = state.status.snapshot().await;
    let health = state.health_registry.health().await;

    Json(StatusResponse {
        uptime_secs: snapshot.uptime_secs(Utc::now()),
        status: snapshot,
        health: health.status,
    })
}

async fn info(State(state): State<Arc<AppState>>) -> Json<InfoResponse> {
    Json(state.info.clone())
}

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/metrics", get(metrics))
        .route("/api/v1/metrics", get(list_metrics))
        .route("/api/v1/metrics/:key", get(get_metric))
        .route("/api/v1/metrics/:key/history", get(get_history))
        .route("/api/v1/status", get(status))
        .route("/api/v1/info", get(info))
        .with_state(state)
}

/// Start the API server
pub async fn serve(port: u16, state: Arc<AppState>) -> anyhow::Result<()> {
    let app = create_router(state);

    let addr = format!("0.0.0.0:{}", port);
    info!(addr = %addr, "Starting API server");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
