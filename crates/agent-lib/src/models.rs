//! Core data models for lending-market metric tracking

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Reserved suffix for baseline entries stored alongside rate metrics
pub const BASELINE_SUFFIX: &str = ":baseline";

/// Unit string that selects cap (ratio) classification
pub const RATIO_UNIT: &str = "ratio";

/// Build the store key holding the sticky baseline for a rate metric
pub fn baseline_key(metric_key: &str) -> String {
    format!("{}{}", metric_key, BASELINE_SUFFIX)
}

/// Returns true if the key lives in the baseline namespace
pub fn is_baseline_key(key: &str) -> bool {
    key.ends_with(BASELINE_SUFFIX)
}

/// How a metric is classified
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricKind {
    /// Fractional utilization of a hard limit, conceptually in [0, 1]
    Ratio,
    /// Percentage/APR/APY-like quantity
    Rate,
}

impl MetricKind {
    pub fn from_unit(unit: &str) -> Self {
        if unit == RATIO_UNIT {
            MetricKind::Ratio
        } else {
            MetricKind::Rate
        }
    }
}

/// Market side a metric refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Supply,
    Borrow,
}

impl Side {
    /// Fallback for adapters that do not tag readings with a side
    pub fn from_display_name(name: &str) -> Option<Self> {
        if name.contains("Supply") {
            Some(Side::Supply)
        } else if name.contains("Borrow") {
            Some(Side::Borrow)
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Supply => "supply",
            Side::Borrow => "borrow",
        }
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single reading produced by a data source adapter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    /// Stable identifier, conventionally `<source>:<instrument>:<side>:<kind>`
    pub key: String,
    /// Human-readable name
    pub name: String,
    pub value: f64,
    /// `"ratio"` selects cap classification, anything else rate classification
    pub unit: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub side: Option<Side>,
}

impl Reading {
    pub fn new(
        key: impl Into<String>,
        name: impl Into<String>,
        value: f64,
        unit: impl Into<String>,
    ) -> Self {
        Self {
            key: key.into(),
            name: name.into(),
            value,
            unit: unit.into(),
            side: None,
        }
    }

    pub fn with_side(mut self, side: Side) -> Self {
        self.side = Some(side);
        self
    }

    pub fn kind(&self) -> MetricKind {
        MetricKind::from_unit(&self.unit)
    }

    /// Explicit side if tagged, otherwise derived from the display name
    pub fn resolved_side(&self) -> Option<Side> {
        self.side.or_else(|| Side::from_display_name(&self.name))
    }

    /// Check that the reading can be stored without corrupting state
    pub fn validate(&self) -> Result<(), String> {
        if self.key.trim().is_empty() {
            return Err("reading has an empty key".to_string());
        }
        if is_baseline_key(&self.key) {
            return Err(format!(
                "key '{}' uses the reserved '{}' suffix",
                self.key, BASELINE_SUFFIX
            ));
        }
        if !self.value.is_finite() {
            return Err(format!("key '{}' has non-finite value {}", self.key, self.value));
        }
        Ok(())
    }
}

/// Latest recorded sample for a key
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub key: String,
    pub display_name: String,
    pub value: f64,
    pub unit: String,
    pub observed_at: DateTime<Utc>,
}

impl Sample {
    pub fn kind(&self) -> MetricKind {
        MetricKind::from_unit(&self.unit)
    }
}

/// A value to be written to the store under `key`
#[derive(Debug, Clone, PartialEq)]
pub struct SampleRecord {
    pub key: String,
    pub display_name: String,
    pub value: f64,
    pub unit: String,
}

impl SampleRecord {
    pub fn new(
        key: impl Into<String>,
        display_name: impl Into<String>,
        value: f64,
        unit: impl Into<String>,
    ) -> Self {
        Self {
            key: key.into(),
            display_name: display_name.into(),
            value,
            unit: unit.into(),
        }
    }
}

/// Key and display name pair for discovery
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricInfo {
    pub key: String,
    pub display_name: String,
}

/// One audit entry in the sample history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub key: String,
    pub value: f64,
    pub observed_at: DateTime<Utc>,
}
