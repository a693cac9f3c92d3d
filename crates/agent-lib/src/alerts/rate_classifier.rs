//! Delta classification for rate metrics
//!
//! Each rate metric has a sticky baseline stored under `<key>:baseline`.
//! The baseline moves only when a reading triggers an alert (or on first
//! observation). It is not a rolling average and it is not time-windowed:
//! a reported move becomes the new reference point, so the next alert
//! needs a fresh move of the same size from there.

use super::alert::{format_percent, format_threshold, Alert, AlertCategory};
use crate::error::WatchError;
use crate::models::Reading;

/// Default minor move (1 percentage point)
pub const DEFAULT_MINOR_CHANGE: f64 = 0.01;

/// Default major move (10 percentage points)
pub const DEFAULT_MAJOR_CHANGE: f64 = 0.10;

/// Magnitude bands for rate alerts
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RateThresholds {
    /// Absolute move that triggers a minor alert
    pub minor: f64,
    /// Absolute move that triggers a major alert
    pub major: f64,
    /// Emit a minor "initial value" alert when a baseline is first set
    pub announce_initial: bool,
}

impl RateThresholds {
    pub fn new(minor: f64, major: f64) -> Result<Self, WatchError> {
        if !(minor > 0.0 && minor < major) {
            return Err(WatchError::Configuration(format!(
                "rate thresholds must satisfy 0 < minor ({}) < major ({})",
                minor, major
            )));
        }
        Ok(Self {
            minor,
            major,
            announce_initial: true,
        })
    }

    pub fn with_announce_initial(mut self, announce: bool) -> Self {
        self.announce_initial = announce;
        self
    }
}

impl Default for RateThresholds {
    fn default() -> Self {
        Self {
            minor: DEFAULT_MINOR_CHANGE,
            major: DEFAULT_MAJOR_CHANGE,
            announce_initial: true,
        }
    }
}

/// Outcome of classifying one rate reading
#[derive(Debug, Clone, PartialEq)]
pub struct RateDecision {
    pub alert: Option<Alert>,
    /// New baseline to persist; `None` leaves the stored baseline untouched
    pub new_baseline: Option<f64>,
}

impl RateDecision {
    fn unchanged() -> Self {
        Self {
            alert: None,
            new_baseline: None,
        }
    }
}

/// Classifies rate readings against their sticky baseline
#[derive(Debug, Clone, Default)]
pub struct RateClassifier {
    thresholds: RateThresholds,
}

impl RateClassifier {
    pub fn new(thresholds: RateThresholds) -> Self {
        Self { thresholds }
    }

    pub fn thresholds(&self) -> RateThresholds {
        self.thresholds
    }

    /// Classify a rate reading against the current baseline
    ///
    /// Major is checked before minor; at most one alert per call. Any
    /// alert resets the baseline to the reading's value.
    pub fn classify(&self, reading: &Reading, baseline: Option<f64>) -> RateDecision {
        let Some(baseline) = baseline else {
            let alert = self.thresholds.announce_initial.then(|| {
                Alert::minor(
                    AlertCategory::Rates,
                    &reading.key,
                    format!(
                        "{} initial value: {}",
                        reading.name,
                        format_percent(reading.value, 2)
                    ),
                )
            });
            return RateDecision {
                alert,
                new_baseline: Some(reading.value),
            };
        };

        let delta = reading.value - baseline;
        let abs_delta = delta.abs();
        let direction = if delta > 0.0 { "⬆️" } else { "⬇️" };

        let alert = if abs_delta >= self.thresholds.major {
            Alert::major(
                AlertCategory::Rates,
                &reading.key,
                format!(
                    "🚨🚨 {} {} moved ≥ {}\nBaseline: {}\nCurrent: {}",
                    direction,
                    reading.name,
                    format_threshold(self.thresholds.major),
                    format_percent(baseline, 2),
                    format_percent(reading.value, 2)
                ),
            )
        } else if abs_delta >= self.thresholds.minor {
            Alert::minor(
                AlertCategory::Rates,
                &reading.key,
                format!(
                    "🚨 {} {} moved ≥ {}\nBaseline: {}\nCurrent: {}",
                    direction,
                    reading.name,
                    format_threshold(self.thresholds.minor),
                    format_percent(baseline, 2),
                    format_percent(reading.value, 2)
                ),
            )
        } else {
            return RateDecision::unchanged();
        };

        RateDecision {
            alert: Some(alert),
            new_baseline: Some(reading.value),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alerts::AlertLevel;

    fn rate(value: f64) -> Reading {
        Reading::new("silo:usdc:borrow:rate", "Silo USDC Borrow APR", value, "apr")
    }

    #[test]
    fn test_first_observation_sets_baseline() {
        let classifier = RateClassifier::default();
        let decision = classifier.classify(&rate(0.089), None);

        assert_eq!(decision.new_baseline, Some(0.089));
        let alert = decision.alert.unwrap();
        assert_eq!(alert.level, AlertLevel::Minor);
        assert_eq!(alert.category, AlertCategory::Rates);
        assert_eq!(alert.message, "Silo USDC Borrow APR initial value: 8.90%");
    }

    #[test]
    fn test_first_observation_can_be_silent() {
        let classifier =
            RateClassifier::new(RateThresholds::default().with_announce_initial(false));
        let decision = classifier.classify(&rate(0.089), None);

        assert!(decision.alert.is_none());
        assert_eq!(decision.new_baseline, Some(0.089));
    }

    #[test]
    fn test_minor_move_resets_baseline() {
        let classifier = RateClassifier::default();
        let decision = classifier.classify(&rate(0.112), Some(0.10));

        let alert = decision.alert.unwrap();
        assert_eq!(alert.level, AlertLevel::Minor);
        assert!(alert.message.contains("⬆️"));
        assert!(alert.message.contains("moved ≥ 1%"));
        assert!(alert.message.contains("Baseline: 10.00%"));
        assert!(alert.message.contains("Current: 11.20%"));
        assert_eq!(decision.new_baseline, Some(0.112));

        // Small drift from the new baseline stays quiet
        let next = classifier.classify(&rate(0.113), decision.new_baseline);
        assert_eq!(next, RateDecision::unchanged());
    }

    #[test]
    fn test_major_move_resets_baseline() {
        let classifier = RateClassifier::default();
        let decision = classifier.classify(&rate(0.20), Some(0.05));

        let alert = decision.alert.unwrap();
        assert_eq!(alert.level, AlertLevel::Major);
        assert!(alert.message.starts_with("🚨🚨 ⬆️"));
        assert!(alert.message.contains("moved ≥ 10%"));
        assert_eq!(decision.new_baseline, Some(0.20));
    }

    #[test]
    fn test_downward_move_direction() {
        let classifier = RateClassifier::default();
        let decision = classifier.classify(&rate(0.05), Some(0.08));

        let alert = decision.alert.unwrap();
        assert_eq!(alert.level, AlertLevel::Minor);
        assert!(alert.message.contains("⬇️"));
    }

    #[test]
    fn test_baseline_is_sticky_under_slow_drift() {
        let classifier = RateClassifier::default();
        let mut baseline = Some(0.10);
        let mut alerts = 0;

        // +0.3pp per step: only cumulative drift past 1pp may alert
        for value in [0.103, 0.106, 0.109, 0.1115, 0.1125] {
            let decision = classifier.classify(&rate(value), baseline);
            if decision.alert.is_some() {
                alerts += 1;
            }
            if let Some(b) = decision.new_baseline {
                baseline = Some(b);
            }
        }

        assert_eq!(alerts, 1);
        assert_eq!(baseline, Some(0.1115));
    }

    #[test]
    fn test_same_value_never_alerts() {
        let classifier = RateClassifier::default();
        for value in [0.0, 0.05, 0.5, 3.0] {
            assert_eq!(classifier.classify(&rate(value), Some(value)), RateDecision::unchanged());
        }
    }

    #[test]
    fn test_threshold_validation() {
        assert!(RateThresholds::new(0.01, 0.10).is_ok());
        assert!(RateThresholds::new(0.10, 0.01).is_err());
        assert!(RateThresholds::new(0.0, 0.10).is_err());
        assert!(RateThresholds::new(f64::NAN, 0.10).is_err());
    }
}
