//! Cap state classification for ratio metrics
//!
//! Cap state (full / not full) is derived from the previous and the new
//! value on every call; nothing besides the raw samples is persisted.
//! Alerts fire only on state edges, never on levels.

use super::alert::{format_percent, Alert, AlertCategory};
use crate::error::WatchError;
use crate::models::Reading;

/// Default full threshold for the hysteresis policy (99.9%)
pub const DEFAULT_FULL_THRESHOLD: f64 = 0.999;

/// Default clear threshold for the hysteresis policy (99.5%)
pub const DEFAULT_CLEAR_THRESHOLD: f64 = 0.995;

/// Default threshold for the single-threshold policy (99.995%)
pub const DEFAULT_SINGLE_THRESHOLD: f64 = 0.99995;

/// Which cap transition rule to apply
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CapPolicy {
    /// Full at `full`; only reported free again once below `clear`
    Hysteresis { full: f64, clear: f64 },
    /// Full at `full`; any drop below it is reported
    SingleThreshold { full: f64 },
}

impl CapPolicy {
    pub fn hysteresis(full: f64, clear: f64) -> Result<Self, WatchError> {
        if !(clear < full) {
            return Err(WatchError::Configuration(format!(
                "cap clear threshold {} must be below full threshold {}",
                clear, full
            )));
        }
        Ok(CapPolicy::Hysteresis { full, clear })
    }

    pub fn single(full: f64) -> Result<Self, WatchError> {
        if !full.is_finite() || full <= 0.0 {
            return Err(WatchError::Configuration(format!(
                "cap full threshold {} must be positive",
                full
            )));
        }
        Ok(CapPolicy::SingleThreshold { full })
    }

    pub fn full_threshold(&self) -> f64 {
        match self {
            CapPolicy::Hysteresis { full, .. } | CapPolicy::SingleThreshold { full } => *full,
        }
    }

    /// Value below which a previously full cap is reported as freed
    pub fn clear_threshold(&self) -> f64 {
        match self {
            CapPolicy::Hysteresis { clear, .. } => *clear,
            CapPolicy::SingleThreshold { full } => *full,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            CapPolicy::Hysteresis { .. } => "hysteresis",
            CapPolicy::SingleThreshold { .. } => "single",
        }
    }
}

impl Default for CapPolicy {
    fn default() -> Self {
        CapPolicy::Hysteresis {
            full: DEFAULT_FULL_THRESHOLD,
            clear: DEFAULT_CLEAR_THRESHOLD,
        }
    }
}

/// Classifies ratio readings against the previously stored value
#[derive(Debug, Clone, Default)]
pub struct CapClassifier {
    policy: CapPolicy,
}

impl CapClassifier {
    pub fn new(policy: CapPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> CapPolicy {
        self.policy
    }

    /// Classify a new ratio reading
    ///
    /// `previous` must be the stored value read before this reading was
    /// recorded. Returns at most one alert; `None` on first observation.
    pub fn classify(&self, reading: &Reading, previous: Option<f64>) -> Option<Alert> {
        let previous = previous?;

        let full = self.policy.full_threshold();
        let was_full = previous >= full;
        let is_full = reading.value >= full;

        if !was_full && is_full {
            Some(Alert::minor(
                AlertCategory::Caps,
                &reading.key,
                format!(
                    "🧢 {} has reached its {}\nUsage: {}",
                    reading.name,
                    cap_label(reading),
                    format_percent(reading.value, 4)
                ),
            ))
        } else if was_full && reading.value < self.policy.clear_threshold() {
            Some(Alert::major(
                AlertCategory::Caps,
                &reading.key,
                format!(
                    "🚨 {} is no longer at its {}\nUsage: {}",
                    reading.name,
                    cap_label(reading),
                    format_percent(reading.value, 4)
                ),
            ))
        } else {
            None
        }
    }
}

fn cap_label(reading: &Reading) -> String {
    match reading.resolved_side() {
        Some(side) => format!("{} cap", side),
        None => "cap".to_string(),
    }
}
