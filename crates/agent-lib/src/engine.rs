//! Ingestion orchestrator
//!
//! Runs one evaluation pass: every reading from every source is recorded
//! and classified, and the alerts are returned in source order, then
//! reading order. Passes are sequential; callers must not run two passes
//! against the same store concurrently.

use crate::alerts::{Alert, CapClassifier, RateClassifier};
use crate::error::{StoreError, WatchError};
use crate::models::{baseline_key, MetricKind, Reading, SampleRecord};
use crate::source::DataSource;
use crate::store::SampleStore;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// Evaluation engine over a set of sources and a store
pub struct Engine {
    sources: Vec<Arc<dyn DataSource>>,
    store: Arc<dyn SampleStore>,
    caps: CapClassifier,
    rates: RateClassifier,
}

impl Engine {
    pub fn new(
        sources: Vec<Arc<dyn DataSource>>,
        store: Arc<dyn SampleStore>,
        caps: CapClassifier,
        rates: RateClassifier,
    ) -> Self {
        Self {
            sources,
            store,
            caps,
            rates,
        }
    }

    pub fn store(&self) -> Arc<dyn SampleStore> {
        self.store.clone()
    }

    pub fn source_names(&self) -> Vec<String> {
        self.sources.iter().map(|s| s.name().to_string()).collect()
    }

    pub fn cap_classifier(&self) -> &CapClassifier {
        &self.caps
    }

    pub fn rate_classifier(&self) -> &RateClassifier {
        &self.rates
    }

    /// Run one evaluation pass and return every emitted alert
    ///
    /// Any source or store failure aborts the pass; no alerts are returned
    /// in that case. Batches written for earlier sources stay recorded.
    pub async fn run_pass(&self) -> Result<PassReport, WatchError> {
        let mut report = PassReport::default();

        for source in &self.sources {
            let readings = source.fetch().await.map_err(|e| {
                warn!(source = %source.name(), error = %e, "Data source failed");
                e
            })?;

            // Reject the whole batch before anything from it is written
            for reading in &readings {
                reading
                    .validate()
                    .map_err(|reason| WatchError::adapter(source.name(), reason))?;
            }

            let batch = self.evaluate(&readings)?;

            // File I/O stays off the async workers
            let store = self.store.clone();
            let records = batch.records;
            tokio::task::spawn_blocking(move || store.record_samples(&records))
                .await
                .map_err(StoreError::from)??;

            report.alerts.extend(batch.alerts);
            report.samples_recorded += readings.len();
            debug!(source = %source.name(), readings = readings.len(), "Source ingested");
        }

        Ok(report)
    }

    /// Record one reading and classify it by kind
    pub fn ingest(&self, reading: &Reading) -> Result<Option<Alert>, WatchError> {
        let batch = self.evaluate(std::slice::from_ref(reading))?;
        self.store.record_samples(&batch.records)?;
        Ok(batch.alerts.into_iter().next())
    }

    /// Classify readings in order and collect the writes they imply
    ///
    /// Values written earlier in the same batch shadow the store, so a key
    /// repeated within one batch still sees its own previous value.
    fn evaluate(&self, readings: &[Reading]) -> Result<Batch, WatchError> {
        let mut batch = Batch::default();
        let mut pending: HashMap<String, f64> = HashMap::new();

        let last = |pending: &HashMap<String, f64>, key: &str| -> Result<Option<f64>, StoreError> {
            match pending.get(key) {
                Some(value) => Ok(Some(*value)),
                None => self.store.get_last(key),
            }
        };

        for reading in readings {
            // Read before write: the cap transition needs the prior value
            let previous = last(&pending, reading.key.as_str())?;
            pending.insert(reading.key.clone(), reading.value);
            batch.records.push(SampleRecord::new(
                &reading.key,
                &reading.name,
                reading.value,
                &reading.unit,
            ));

            let alert = match reading.kind() {
                MetricKind::Ratio => self.caps.classify(reading, previous),
                MetricKind::Rate => {
                    let key = baseline_key(&reading.key);
                    let decision = self.rates.classify(reading, last(&pending, key.as_str())?);

                    if let Some(value) = decision.new_baseline {
                        pending.insert(key.clone(), value);
                        batch.records.push(SampleRecord::new(
                            key,
                            format!("{} (baseline)", reading.name),
                            value,
                            &reading.unit,
                        ));
                    }
                    decision.alert
                }
            };

            batch.alerts.extend(alert);
        }

        Ok(batch)
    }
}

/// Alerts and store writes produced by one batch of readings
#[derive(Debug, Default)]
struct Batch {
    alerts: Vec<Alert>,
    records: Vec<SampleRecord>,
}

/// Output of a successful pass
#[derive(Debug, Default, Clone)]
pub struct PassReport {
    /// Alerts in source order, then reading order
    pub alerts: Vec<Alert>,
    pub samples_recorded: usize,
}
