//! Evaluation pass scheduler
//!
//! Drives evaluation passes on a fixed interval from a single task, so two
//! passes never touch the same keys at the same time. Missed ticks are
//! skipped rather than queued.

use crate::engine::{Engine, PassReport};
use crate::error::WatchError;
use crate::health::{Component, HealthRegistry};
use crate::models::is_baseline_key;
use crate::observability::{AgentMetrics, StructuredLogger};
use crate::sink::{AlertRouter, DeliveryReport};
use crate::status::RunStatus;
use anyhow::Result;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::{interval, Instant, MissedTickBehavior};
use tracing::{debug, info};

/// Default pass interval (5 minutes)
const DEFAULT_PASS_INTERVAL: Duration = Duration::from_secs(5 * 60);

/// Configuration for the pass scheduler
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Time between pass starts
    pub interval: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_PASS_INTERVAL,
        }
    }
}

/// Periodically runs the engine and delivers the resulting alerts
pub struct PassScheduler {
    engine: Engine,
    router: AlertRouter,
    status: RunStatus,
    health: HealthRegistry,
    metrics: AgentMetrics,
    logger: StructuredLogger,
    config: SchedulerConfig,
}

impl PassScheduler {
    /// Start the scheduling loop; returns once a shutdown signal arrives
    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        info!(
            interval_secs = self.config.interval.as_secs(),
            sources = self.engine.source_names().len(),
            "Starting evaluation pass scheduler"
        );

        let mut ticker = interval(self.config.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    // Errors are already recorded in status, health and logs
                    let _ = self.run_once().await;
                }
                _ = shutdown.recv() => {
                    info!("Shutting down evaluation pass scheduler");
                    break;
                }
            }
        }
    }

    /// Run a single pass and deliver its alerts
    ///
    /// A failed pass is reported through status, health, metrics and logs;
    /// it is never turned into a delivered alert.
    pub async fn run_once(&self) -> Result<DeliveryReport, WatchError> {
        let start = Instant::now();

        match self.engine.run_pass().await {
            Ok(report) => {
                let elapsed = start.elapsed();
                self.record_success(&report, elapsed).await;

                let delivery = self.router.deliver(&report.alerts).await;
                if delivery.failed > 0 {
                    self.health
                        .set_degraded(
                            Component::Sink,
                            format!("{} alert deliveries failed", delivery.failed),
                        )
                        .await;
                } else {
                    self.health.set_healthy(Component::Sink).await;
                }

                Ok(delivery)
            }
            Err(err) => {
                let elapsed = start.elapsed();
                self.metrics.inc_pass_failures();
                self.metrics.observe_pass_latency(elapsed.as_secs_f64());
                self.status.record_failure(err.to_string()).await;

                match &err {
                    WatchError::Store(_) => {
                        self.health
                            .set_unhealthy(Component::Store, err.to_string())
                            .await
                    }
                    _ => {
                        self.health
                            .set_degraded(Component::Engine, err.to_string())
                            .await
                    }
                }

                self.logger.log_pass_failed(&err, elapsed);
                Err(err)
            }
        }
    }

    async fn record_success(&self, report: &PassReport, elapsed: Duration) {
        self.metrics.observe_pass_latency(elapsed.as_secs_f64());
        self.metrics.inc_passes_completed();
        self.metrics.add_samples_recorded(report.samples_recorded);

        match self.engine.store().list_metrics() {
            Ok(metrics) => {
                let tracked = metrics.iter().filter(|m| !is_baseline_key(&m.key)).count();
                self.metrics.set_metrics_tracked(tracked as i64);
            }
            Err(e) => debug!(error = %e, "Could not count tracked metrics"),
        }

        for alert in &report.alerts {
            self.metrics.inc_alert(alert);
            self.logger.log_alert(alert);
        }

        self.status.record_success(report.alerts.len()).await;
        self.health.set_healthy(Component::Engine).await;
        self.health.set_healthy(Component::Store).await;
        self.logger
            .log_pass_complete(report.samples_recorded, report.alerts.len(), elapsed);
    }
}

/// Builder for creating the pass scheduler
pub struct PassSchedulerBuilder {
    engine: Option<Engine>,
    router: Option<AlertRouter>,
    status: RunStatus,
    health: HealthRegistry,
    metrics: Option<AgentMetrics>,
    logger: Option<StructuredLogger>,
    config: SchedulerConfig,
}

impl PassSchedulerBuilder {
    /// Create a new builder with default configuration
    pub fn new() -> Self {
        Self {
            engine: None,
            router: None,
            status: RunStatus::new(),
            health: HealthRegistry::new(),
            metrics: None,
            logger: None,
            config: SchedulerConfig::default(),
        }
    }

    pub fn engine(mut self, engine: Engine) -> Self {
        self.engine = Some(engine);
        self
    }

    pub fn router(mut self, router: AlertRouter) -> Self {
        self.router = Some(router);
        self
    }

    /// Status handle shared with readers
    pub fn status(mut self, status: RunStatus) -> Self {
        self.status = status;
        self
    }

    pub fn health(mut self, health: HealthRegistry) -> Self {
        self.health = health;
        self
    }

    pub fn metrics(mut self, metrics: AgentMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn logger(mut self, logger: StructuredLogger) -> Self {
        self.logger = Some(logger);
        self
    }

    /// Set the pass interval
    pub fn interval(mut self, interval: Duration) -> Self {
        self.config.interval = interval;
        self
    }

    /// Build the scheduler
    pub fn build(self) -> Result<PassScheduler> {
        let engine = self
            .engine
            .ok_or_else(|| anyhow::anyhow!("Engine is required"))?;
        let router = self
            .router
            .ok_or_else(|| anyhow::anyhow!("Alert router is required"))?;
        if self.config.interval.is_zero() {
            anyhow::bail!("Pass interval must be non-zero");
        }

        Ok(PassScheduler {
            engine,
            router,
            status: self.status,
            health: self.health,
            metrics: self.metrics.unwrap_or_default(),
            logger: self
                .logger
                .unwrap_or_else(|| StructuredLogger::new("lendwatch")),
            config: self.config,
        })
    }
}

impl Default for PassSchedulerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alerts::{Alert, AlertCategory, CapClassifier, RateClassifier};
    use crate::health::ComponentStatus;
    use crate::models::Reading;
    use crate::sink::{async_trait, AlertSink};
    use crate::source::DataSource;
    use crate::store::{JsonFileStore, SampleStore, StoreConfig};
    use std::sync::{Arc, Mutex};
    use tempfile::TempDir;

    /// Source returning the same readings every pass
    struct FixedSource {
        readings: Vec<Reading>,
    }

    #[async_trait]
    impl DataSource for FixedSource {
        fn name(&self) -> &str {
            "fixed"
        }

        async fn fetch(&self) -> Result<Vec<Reading>, WatchError> {
            Ok(self.readings.clone())
        }
    }

    struct DownSource;

    #[async_trait]
    impl DataSource for DownSource {
        fn name(&self) -> &str {
            "down"
        }

        async fn fetch(&self) -> Result<Vec<Reading>, WatchError> {
            Err(WatchError::adapter("down", "connection refused"))
        }
    }

    #[derive(Default)]
    struct CollectingSink {
        alerts: Mutex<Vec<Alert>>,
    }

    #[async_trait]
    impl AlertSink for CollectingSink {
        fn name(&self) -> &str {
            "collecting"
        }

        async fn send(&self, alert: &Alert, _text: &str) -> anyhow::Result<()> {
            self.alerts.lock().unwrap().push(alert.clone());
            Ok(())
        }
    }

    fn scheduler(
        dir: &TempDir,
        source: Arc<dyn DataSource>,
        sink: Arc<CollectingSink>,
        status: RunStatus,
        health: HealthRegistry,
    ) -> PassScheduler {
        let store = Arc::new(
            JsonFileStore::open(StoreConfig::new(dir.path().join("state.json"))).unwrap(),
        );
        scheduler_with_store(store, source, sink, status, health)
    }

    fn scheduler_with_store(
        store: Arc<dyn SampleStore>,
        source: Arc<dyn DataSource>,
        sink: Arc<CollectingSink>,
        status: RunStatus,
        health: HealthRegistry,
    ) -> PassScheduler {
        let engine = Engine::new(
            vec![source],
            store,
            CapClassifier::default(),
            RateClassifier::default(),
        );
        let router = AlertRouter::new()
            .route(AlertCategory::Rates, sink.clone())
            .route(AlertCategory::Caps, sink);

        PassSchedulerBuilder::new()
            .engine(engine)
            .router(router)
            .status(status)
            .health(health)
            .interval(Duration::from_secs(3600))
            .build()
            .unwrap()
    }

    #[test]
    fn test_scheduler_config_default() {
        let config = SchedulerConfig::default();
        assert_eq!(config.interval, Duration::from_secs(300));
    }

    #[test]
    fn test_builder_requires_engine_and_router() {
        assert!(PassSchedulerBuilder::new().build().is_err());
        assert!(PassSchedulerBuilder::new()
            .router(AlertRouter::new())
            .build()
            .is_err());
    }

    #[tokio::test]
    async fn test_successful_pass_delivers_and_updates_status() {
        let dir = TempDir::new().unwrap();
        let sink = Arc::new(CollectingSink::default());
        let status = RunStatus::new();
        let source = Arc::new(FixedSource {
            readings: vec![Reading::new("silo:usdc:borrow:rate", "Silo USDC Borrow APR", 0.09, "apr")],
        });
        let scheduler = scheduler(&dir, source, sink.clone(), status.clone(), HealthRegistry::new());

        let delivery = scheduler.run_once().await.unwrap();

        // Initial-value announcement for the new rate metric
        assert_eq!(delivery.delivered, 1);
        assert_eq!(sink.alerts.lock().unwrap().len(), 1);

        let snapshot = status.snapshot().await;
        assert_eq!(snapshot.passes_completed, 1);
        assert_eq!(snapshot.last_alert_count, 1);
        assert!(snapshot.last_run_at.is_some());

        // Same value again: nothing new to deliver
        let delivery = scheduler.run_once().await.unwrap();
        assert_eq!(delivery.delivered, 0);
    }

    #[tokio::test]
    async fn test_failed_pass_is_not_delivered_as_alert() {
        let dir = TempDir::new().unwrap();
        let sink = Arc::new(CollectingSink::default());
        let status = RunStatus::new();
        let health = HealthRegistry::new();
        health.register(Component::Engine).await;
        let scheduler = scheduler(&dir, Arc::new(DownSource), sink.clone(), status.clone(), health.clone());

        let result = scheduler.run_once().await;

        assert!(matches!(result, Err(WatchError::Adapter { .. })));
        assert!(sink.alerts.lock().unwrap().is_empty());

        let snapshot = status.snapshot().await;
        assert_eq!(snapshot.passes_failed, 1);
        assert!(snapshot.last_error.unwrap().contains("connection refused"));

        let engine = health.component(Component::Engine).await.unwrap();
        assert_eq!(engine.status, ComponentStatus::Degraded);
    }

    #[tokio::test]
    async fn test_run_loop_stops_on_shutdown() {
        let dir = TempDir::new().unwrap();
        let sink = Arc::new(CollectingSink::default());
        let status = RunStatus::new();
        let source = Arc::new(FixedSource {
            readings: vec![Reading::new("aave:usdc:supply:cap", "Aave USDC Supply Cap", 0.5, "ratio")],
        });
        let scheduler = scheduler(&dir, source, sink, status.clone(), HealthRegistry::new());

        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
        let handle = tokio::spawn(scheduler.run(shutdown_rx));

        // The first tick fires immediately
        for _ in 0..50 {
            if status.snapshot().await.passes_completed > 0 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        shutdown_tx.send(()).unwrap();

        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("scheduler did not stop")
            .unwrap();
        assert_eq!(status.snapshot().await.passes_completed, 1);

        let store = JsonFileStore::open(StoreConfig::new(dir.path().join("state.json"))).unwrap();
        assert_eq!(store.get_last("aave:usdc:supply:cap").unwrap(), Some(0.5));
    }

    #[tokio::test]
    async fn test_store_failure_marks_store_unhealthy() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state.json");
        let store = Arc::new(JsonFileStore::open(StoreConfig::new(&path)).unwrap());
        // A non-empty directory at the state path makes every write fail
        std::fs::create_dir_all(path.join("occupied")).unwrap();

        let sink = Arc::new(CollectingSink::default());
        let status = RunStatus::new();
        let health = HealthRegistry::new();
        health.register_all().await;
        health.set_ready(true).await;
        let source = Arc::new(FixedSource {
            readings: vec![Reading::new("r", "Silo USDC Borrow APR", 0.05, "apr")],
        });
        let scheduler =
            scheduler_with_store(store.clone(), source, sink.clone(), status.clone(), health.clone());

        let result = scheduler.run_once().await;

        assert!(matches!(result, Err(WatchError::Store(_))));
        // The initial-value alert of the failed pass is never delivered
        assert!(sink.alerts.lock().unwrap().is_empty());
        assert_eq!(store.get_last("r").unwrap(), None);

        let store_health = health.component(Component::Store).await.unwrap();
        assert_eq!(store_health.status, ComponentStatus::Unhealthy);
        assert!(!health.readiness().await.ready);
        assert_eq!(status.snapshot().await.passes_failed, 1);
    }
}
