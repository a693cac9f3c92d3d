//! Durable sample storage
//!
//! Keeps the latest sample per metric key (baselines share the same
//! namespace under the `:baseline` suffix) plus a bounded audit history.

mod json_file;

pub use json_file::{JsonFileStore, StoreConfig};

use crate::error::StoreError;
use crate::models::{HistoryEntry, MetricInfo, Sample, SampleRecord};

/// Trait for sample persistence implementations
pub trait SampleStore: Send + Sync {
    /// Most recently recorded value for `key`, or `None` if never recorded
    fn get_last(&self, key: &str) -> Result<Option<f64>, StoreError> {
        Ok(self.get_sample(key)?.map(|s| s.value))
    }

    /// Most recently recorded sample for `key` including metadata
    fn get_sample(&self, key: &str) -> Result<Option<Sample>, StoreError>;

    /// Unconditionally overwrite the value and metadata stored for `key`
    fn record_sample(
        &self,
        key: &str,
        display_name: &str,
        value: f64,
        unit: &str,
    ) -> Result<(), StoreError>;

    /// Write several records in order
    ///
    /// Implementations that persist should make the whole batch durable
    /// with a single write; either every record lands or none does.
    fn record_samples(&self, records: &[SampleRecord]) -> Result<(), StoreError> {
        for r in records {
            self.record_sample(&r.key, &r.display_name, r.value, &r.unit)?;
        }
        Ok(())
    }

    /// All keys ever recorded, baselines included
    fn list_metrics(&self) -> Result<Vec<MetricInfo>, StoreError>;

    /// Most recent audit entries for `key`, oldest first
    fn history(&self, key: &str, limit: usize) -> Result<Vec<HistoryEntry>, StoreError>;
}
