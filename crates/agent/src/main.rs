//! Lendwatch - lending-market cap and rate watcher
//!
//! Polls the configured data sources on a fixed interval, keeps the latest
//! value per metric in a durable store, and routes cap and rate alerts to
//! their destinations.

use lendwatch_lib::{
    alerts::{CapClassifier, RateClassifier},
    health::HealthRegistry,
    observability::{AgentMetrics, StructuredLogger},
    sink::{AlertRouter, AlertSink, LogSink, WebhookSink},
    source::{DataSource, HttpJsonSource},
    store::{JsonFileStore, SampleStore, StoreConfig},
    AlertCategory, Engine, PassSchedulerBuilder, RunStatus,
};
use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod api;
mod config;

const AGENT_VERSION: &str = env!("CARGO_PKG_VERSION");

fn build_router(config: &config::AgentConfig) -> Result<AlertRouter> {
    let (caps, rates): (Arc<dyn AlertSink>, Arc<dyn AlertSink>) = if config.dry_run {
        (Arc::new(LogSink), Arc::new(LogSink))
    } else {
        let caps_url = config.caps_webhook_url.as_deref().unwrap_or_default();
        let rates_url = config.rates_webhook_url.as_deref().unwrap_or_default();
        (
            Arc::new(WebhookSink::new("caps", caps_url)?),
            Arc::new(WebhookSink::new("rates", rates_url)?),
        )
    };

    let mut router = AlertRouter::new()
        .route(AlertCategory::Caps, caps)
        .route(AlertCategory::Rates, rates);
    if let Some(mention) = &config.mention {
        router = router.with_mention(mention.clone());
    }
    Ok(router)
}

fn build_sources(config: &config::AgentConfig) -> Result<Vec<Arc<dyn DataSource>>> {
    config
        .sources
        .iter()
        .map(|s| {
            let source = HttpJsonSource::new(s.name.clone(), &s.url)
                .with_context(|| format!("invalid data source '{}'", s.name))?;
            Ok(Arc::new(source) as Arc<dyn DataSource>)
        })
        .collect()
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and env filter
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json())
        .init();

    info!("Starting lendwatch");

    // Load configuration; any problem here is fatal
    let config = config::AgentConfig::load()?;
    let cap_policy = config.cap_policy()?;
    let rate_thresholds = config.rate_thresholds()?;
    info!(
        instance = %config.instance,
        sources = config.sources.len(),
        dry_run = config.dry_run,
        "Watcher configured"
    );

    // Initialize health registry
    let health_registry = HealthRegistry::new();
    health_registry.register_all().await;

    let metrics = AgentMetrics::new();
    let logger = StructuredLogger::new(&config.instance);
    logger.log_startup(AGENT_VERSION, config.sources.len(), cap_policy.name());

    let store: Arc<dyn SampleStore> = Arc::new(
        JsonFileStore::open(
            StoreConfig::new(&config.state_path).with_history_limit(config.history_limit),
        )
        .with_context(|| format!("failed to open state file {}", config.state_path.display()))?,
    );

    let engine = Engine::new(
        build_sources(&config)?,
        store.clone(),
        CapClassifier::new(cap_policy),
        RateClassifier::new(rate_thresholds),
    );
    let source_names = engine.source_names();

    let router = build_router(&config)?.with_observability(metrics.clone(), logger.clone());

    let status = RunStatus::new();
    let scheduler = PassSchedulerBuilder::new()
        .engine(engine)
        .router(router)
        .status(status.clone())
        .health(health_registry.clone())
        .metrics(metrics.clone())
        .logger(logger.clone())
        .interval(Duration::from_secs(config.interval_secs))
        .build()?;

    let info = api::InfoResponse::new(
        config.interval_secs,
        cap_policy,
        rate_thresholds,
        source_names,
    );
    let app_state = Arc::new(api::AppState::new(
        health_registry.clone(),
        metrics,
        store,
        status,
        info,
    ));

    let (shutdown_tx, _) = broadcast::channel(1);
    let scheduler_handle = tokio::spawn(scheduler.run(shutdown_tx.subscribe()));

    // Mark watcher as ready after initialization
    health_registry.set_ready(true).await;

    // Start health, metrics and introspection server
    let api_handle = tokio::spawn(api::serve(config.api_port, app_state));

    // Wait for shutdown signal
    tokio::signal::ctrl_c().await?;
    logger.log_shutdown("SIGINT received");

    health_registry.set_ready(false).await;
    let _ = shutdown_tx.send(());
    scheduler_handle.await?;
    api_handle.abort();
    info!("Shutting down");

    Ok(())
}
