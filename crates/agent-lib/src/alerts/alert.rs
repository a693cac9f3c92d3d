//! Alert events emitted by the classifiers

use serde::{Deserialize, Serialize};

/// Alert level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertLevel {
    Minor,
    Major,
}

impl AlertLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertLevel::Minor => "minor",
            AlertLevel::Major => "major",
        }
    }
}

impl std::fmt::Display for AlertLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Alert category, used by sinks for routing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertCategory {
    Caps,
    Rates,
}

impl AlertCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertCategory::Caps => "caps",
            AlertCategory::Rates => "rates",
        }
    }
}

impl std::fmt::Display for AlertCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single alert event; produced per pass and never persisted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alert {
    pub category: AlertCategory,
    pub level: AlertLevel,
    pub metric_key: String,
    pub message: String,
}

impl Alert {
    pub fn minor(category: AlertCategory, metric_key: &str, message: String) -> Self {
        Self {
            category,
            level: AlertLevel::Minor,
            metric_key: metric_key.to_string(),
            message,
        }
    }

    pub fn major(category: AlertCategory, metric_key: &str, message: String) -> Self {
        Self {
            category,
            level: AlertLevel::Major,
            metric_key: metric_key.to_string(),
            message,
        }
    }

    pub fn is_major(&self) -> bool {
        self.level == AlertLevel::Major
    }
}

/// Format a fraction as a percentage, e.g. `0.1243` -> `12.43%`
pub(crate) fn format_percent(value: f64, decimals: usize) -> String {
    format!("{:.*}%", decimals, value * 100.0)
}

/// Format a threshold compactly: whole percentages without decimals
pub(crate) fn format_threshold(threshold: f64) -> String {
    let pct = threshold * 100.0;
    if (pct - pct.round()).abs() < 1e-9 {
        format!("{:.0}%", pct)
    } else {
        format!("{:.2}%", pct)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alert_serialization() {
        let alert = Alert::major(AlertCategory::Caps, "euler:pyusd:supply:cap", "freed".to_string());
        let json = serde_json::to_value(&alert).unwrap();

        assert_eq!(json["category"], "caps");
        assert_eq!(json["level"], "major");
        assert_eq!(json["metric_key"], "euler:pyusd:supply:cap");
        assert!(alert.is_major());
    }

    #[test]
    fn test_format_helpers() {
        assert_eq!(format_percent(0.1243, 2), "12.43%");
        assert_eq!(format_threshold(0.10), "10%");
        assert_eq!(format_threshold(0.01), "1%");
        assert_eq!(format_threshold(0.005), "0.50%");
    }
}
