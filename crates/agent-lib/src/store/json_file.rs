//! JSON file backed sample store
//!
//! State is held in memory and written through to disk once per
//! `record_samples` batch using a temp file + rename, so a crash never
//! leaves a half-written state file behind.

use super::SampleStore;
use crate::error::StoreError;
use crate::models::{HistoryEntry, MetricInfo, Sample, SampleRecord};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};
use std::fs::{File, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use tracing::{debug, info};

/// Default maximum number of audit history entries (across all keys)
const DEFAULT_HISTORY_LIMIT: usize = 10_000;

/// Current on-disk format version
const STATE_VERSION: u32 = 1;

/// Configuration for the file store
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Path of the state file
    pub path: PathBuf,
    /// Maximum number of history entries kept, oldest evicted first
    pub history_limit: usize,
}

impl StoreConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            history_limit: DEFAULT_HISTORY_LIMIT,
        }
    }

    pub fn with_history_limit(mut self, limit: usize) -> Self {
        self.history_limit = limit;
        self
    }
}

/// Serialized state document
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct StoreState {
    version: u32,
    samples: BTreeMap<String, Sample>,
    #[serde(default)]
    history: VecDeque<HistoryEntry>,
}

/// Sample store persisted as a single JSON document
pub struct JsonFileStore {
    config: StoreConfig,
    state: RwLock<StoreState>,
}

impl JsonFileStore {
    /// Open the store, loading existing state if the file exists
    ///
    /// An unreadable or corrupt file is an error: starting fresh would
    /// silently reset every baseline.
    pub fn open(config: StoreConfig) -> Result<Self, StoreError> {
        let state = if config.path.exists() {
            let state = load_from_disk(&config.path)?;
            info!(
                path = %config.path.display(),
                metrics = state.samples.len(),
                history = state.history.len(),
                "Loaded sample store from disk"
            );
            state
        } else {
            info!(path = %config.path.display(), "Starting with empty sample store");
            StoreState {
                version: STATE_VERSION,
                ..Default::default()
            }
        };

        Ok(Self {
            config,
            state: RwLock::new(state),
        })
    }

    /// Path of the backing file
    pub fn path(&self) -> &Path {
        &self.config.path
    }

    /// Number of keys currently stored
    pub fn len(&self) -> usize {
        self.state.read().map(|s| s.samples.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl SampleStore for JsonFileStore {
    fn get_sample(&self, key: &str) -> Result<Option<Sample>, StoreError> {
        let state = self.state.read().map_err(|_| StoreError::Poisoned)?;
        Ok(state.samples.get(key).cloned())
    }

    fn record_sample(
        &self,
        key: &str,
        display_name: &str,
        value: f64,
        unit: &str,
    ) -> Result<(), StoreError> {
        self.record_samples(&[SampleRecord::new(key, display_name, value, unit)])
    }

    fn record_samples(&self, records: &[SampleRecord]) -> Result<(), StoreError> {
        if records.is_empty() {
            return Ok(());
        }

        let mut state = self.state.write().map_err(|_| StoreError::Poisoned)?;
        let observed_at = Utc::now();
        let limit = self.config.history_limit.max(1);

        // Applied in place; the undo log restores the old state if the write fails
        let mut replaced: Vec<(String, Option<Sample>)> = Vec::with_capacity(records.len());
        let mut evicted: Vec<HistoryEntry> = Vec::new();

        for r in records {
            let previous = state.samples.insert(
                r.key.clone(),
                Sample {
                    key: r.key.clone(),
                    display_name: r.display_name.clone(),
                    value: r.value,
                    unit: r.unit.clone(),
                    observed_at,
                },
            );
            replaced.push((r.key.clone(), previous));

            while state.history.len() >= limit {
                if let Some(entry) = state.history.pop_front() {
                    evicted.push(entry);
                }
            }
            state.history.push_back(HistoryEntry {
                key: r.key.clone(),
                value: r.value,
                observed_at,
            });
        }

        if let Err(e) = save_to_disk(&self.config.path, &state) {
            // Evicted entries followed by the current history is the old
            // history with this batch appended
            let mut restored: VecDeque<HistoryEntry> = evicted.into();
            restored.extend(state.history.drain(..));
            restored.truncate(restored.len() - records.len());
            state.history = restored;
            for (key, previous) in replaced.into_iter().rev() {
                match previous {
                    Some(sample) => state.samples.insert(key, sample),
                    None => state.samples.remove(&key),
                };
            }
            return Err(e);
        }

        debug!(records = records.len(), "Samples recorded");
        Ok(())
    }

    fn list_metrics(&self) -> Result<Vec<MetricInfo>, StoreError> {
        let state = self.state.read().map_err(|_| StoreError::Poisoned)?;
        Ok(state
            .samples
            .values()
            .map(|s| MetricInfo {
                key: s.key.clone(),
                display_name: s.display_name.clone(),
            })
            .collect())
    }

    fn history(&self, key: &str, limit: usize) -> Result<Vec<HistoryEntry>, StoreError> {
        let state = self.state.read().map_err(|_| StoreError::Poisoned)?;
        let mut entries: Vec<HistoryEntry> = state
            .history
            .iter()
            .rev()
            .filter(|e| e.key == key)
            .take(limit)
            .cloned()
            .collect();
        entries.reverse();
        Ok(entries)
    }
}

/// Write state atomically via a temp file
fn save_to_disk(path: &Path, state: &StoreState) -> Result<(), StoreError> {
    let io_err = |error| StoreError::Io {
        path: path.to_path_buf(),
        error,
    };

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }
    }

    let json = serde_json::to_vec(state).map_err(StoreError::Serialize)?;

    let temp_path = path.with_extension("tmp");
    let mut file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(&temp_path)
        .map_err(io_err)?;

    file.write_all(&json).map_err(io_err)?;
    file.sync_all().map_err(io_err)?;

    std::fs::rename(&temp_path, path).map_err(io_err)?;

    Ok(())
}

fn load_from_disk(path: &Path) -> Result<StoreState, StoreError> {
    let io_err = |error| StoreError::Io {
        path: path.to_path_buf(),
        error,
    };

    let mut file = File::open(path).map_err(io_err)?;
    let mut data = Vec::new();
    file.read_to_end(&mut data).map_err(io_err)?;

    serde_json::from_slice(&data).map_err(|error| StoreError::Corrupt {
        path: path.to_path_buf(),
        error,
    })
}
