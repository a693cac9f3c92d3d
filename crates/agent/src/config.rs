//! Agent configuration

use anyhow::Result;
use lendwatch_lib::alerts::{
    CapPolicy, RateThresholds, DEFAULT_CLEAR_THRESHOLD, DEFAULT_FULL_THRESHOLD,
    DEFAULT_MAJOR_CHANGE, DEFAULT_MINOR_CHANGE, DEFAULT_SINGLE_THRESHOLD,
};
use lendwatch_lib::WatchError;
use serde::Deserialize;
use std::path::PathBuf;

/// A configured data source endpoint
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct SourceConfig {
    pub name: String,
    pub url: String,
}

/// Agent configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AgentConfig {
    /// Instance name used in structured logs
    #[serde(default = "default_instance")]
    pub instance: String,

    /// API server port for health/metrics/introspection
    #[serde(default = "default_api_port")]
    pub api_port: u16,

    /// Sample store file
    #[serde(default = "default_state_path")]
    pub state_path: PathBuf,

    /// Maximum audit history entries kept in the store
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,

    /// Evaluation pass interval in seconds
    #[serde(default = "default_interval")]
    pub interval_secs: u64,

    /// `hysteresis` or `single`
    #[serde(default = "default_cap_policy")]
    pub cap_policy: String,

    pub cap_full_threshold: Option<f64>,
    pub cap_clear_threshold: Option<f64>,

    #[serde(default = "default_minor_change")]
    pub rate_minor_change: f64,

    #[serde(default = "default_major_change")]
    pub rate_major_change: f64,

    /// Announce the first value seen for each rate metric
    #[serde(default = "default_true")]
    pub announce_initial_rate: bool,

    /// Marker prepended to major alerts (e.g. a role mention)
    pub mention: Option<String>,

    pub caps_webhook_url: Option<String>,
    pub rates_webhook_url: Option<String>,

    /// Log alerts instead of delivering them
    #[serde(default)]
    pub dry_run: bool,

    #[serde(default)]
    pub sources: Vec<SourceConfig>,
}

fn default_instance() -> String {
    std::env::var("HOSTNAME").unwrap_or_else(|_| "lendwatch".to_string())
}

fn default_api_port() -> u16 {
    8080
}

fn default_state_path() -> PathBuf {
    PathBuf::from("data/state.json")
}

fn default_history_limit() -> usize {
    10_000
}

fn default_interval() -> u64 {
    300
}

fn default_cap_policy() -> String {
    "hysteresis".to_string()
}

fn default_minor_change() -> f64 {
    DEFAULT_MINOR_CHANGE
}

fn default_major_change() -> f64 {
    DEFAULT_MAJOR_CHANGE
}

fn default_true() -> bool {
    true
}

/// `LENDWATCH_API_PORT` style variables; `__` only separates nested keys
fn environment() -> config::Environment {
    config::Environment::with_prefix("LENDWATCH")
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true)
}

impl AgentConfig {
    /// Load configuration from an optional file and `LENDWATCH_*` environment
    pub fn load() -> Result<Self> {
        let file = std::env::var("LENDWATCH_CONFIG").unwrap_or_else(|_| "lendwatch".to_string());
        Self::load_from(&file)
    }

    pub fn load_from(file: &str) -> Result<Self> {
        Self::load_with(file, environment())
    }

    fn load_with(file: &str, env: config::Environment) -> Result<Self> {
        let config = config::Config::builder()
            .add_source(config::File::with_name(file).required(false))
            .add_source(env)
            .build()?;

        let config: AgentConfig = config.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Check startup requirements; failures are fatal
    pub fn validate(&self) -> Result<(), WatchError> {
        if self.sources.is_empty() {
            return Err(WatchError::Configuration(
                "at least one data source must be configured".to_string(),
            ));
        }
        if !self.dry_run {
            if self.caps_webhook_url.as_deref().map_or(true, str::is_empty) {
                return Err(WatchError::Configuration(
                    "caps_webhook_url not set".to_string(),
                ));
            }
            if self.rates_webhook_url.as_deref().map_or(true, str::is_empty) {
                return Err(WatchError::Configuration(
                    "rates_webhook_url not set".to_string(),
                ));
            }
        }
        if self.interval_secs == 0 {
            return Err(WatchError::Configuration(
                "interval_secs must be positive".to_string(),
            ));
        }
        self.cap_policy()?;
        self.rate_thresholds()?;
        Ok(())
    }

    pub fn cap_policy(&self) -> Result<CapPolicy, WatchError> {
        match self.cap_policy.as_str() {
            "hysteresis" => CapPolicy::hysteresis(
                self.cap_full_threshold.unwrap_or(DEFAULT_FULL_THRESHOLD),
                self.cap_clear_threshold.unwrap_or(DEFAULT_CLEAR_THRESHOLD),
            ),
            "single" => {
                CapPolicy::single(self.cap_full_threshold.unwrap_or(DEFAULT_SINGLE_THRESHOLD))
            }
            other => Err(WatchError::Configuration(format!(
                "unknown cap_policy '{}', expected 'hysteresis' or 'single'",
                other
            ))),
        }
    }

    pub fn rate_thresholds(&self) -> Result<RateThresholds, WatchError> {
        Ok(
            RateThresholds::new(self.rate_minor_change, self.rate_major_change)?
                .with_announce_initial(self.announce_initial_rate),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn write_config(dir: &tempfile::TempDir, body: &str) -> String {
        let path = dir.path().join("lendwatch.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(body.as_bytes()).unwrap();
        path.to_string_lossy().into_owned()
    }

    const VALID: &str = r#"
        caps_webhook_url = "http://hooks.local/caps"
        rates_webhook_url = "http://hooks.local/rates"

        [[sources]]
        name = "euler"
        url = "http://feeds.local/euler"
    "#;

    #[test]
    fn test_defaults_from_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let config = AgentConfig::load_from(&write_config(&dir, VALID)).unwrap();

        assert_eq!(config.api_port, 8080);
        assert_eq!(config.interval_secs, 300);
        assert_eq!(config.state_path, PathBuf::from("data/state.json"));
        assert_eq!(config.sources.len(), 1);
        assert_eq!(config.cap_policy().unwrap(), CapPolicy::default());
        assert!(config.rate_thresholds().unwrap().announce_initial);
    }

    #[test]
    fn test_single_threshold_policy() {
        let dir = tempfile::TempDir::new().unwrap();
        let body = format!("cap_policy = \"single\"\n{}", VALID);
        let config = AgentConfig::load_from(&write_config(&dir, &body)).unwrap();

        assert_eq!(
            config.cap_policy().unwrap(),
            CapPolicy::SingleThreshold {
                full: DEFAULT_SINGLE_THRESHOLD
            }
        );
    }

    #[test]
    fn test_missing_destination_is_fatal() {
        let dir = tempfile::TempDir::new().unwrap();
        let body = r#"
            caps_webhook_url = "http://hooks.local/caps"
            [[sources]]
            name = "euler"
            url = "http://feeds.local/euler"
        "#;
        let err = AgentConfig::load_from(&write_config(&dir, body)).unwrap_err();
        assert!(err.to_string().contains("rates_webhook_url"));
    }

    #[test]
    fn test_dry_run_needs_no_destinations() {
        let dir = tempfile::TempDir::new().unwrap();
        let body = r#"
            dry_run = true
            [[sources]]
            name = "silo"
            url = "http://feeds.local/silo"
        "#;
        assert!(AgentConfig::load_from(&write_config(&dir, body)).is_ok());
    }

    #[test]
    fn test_no_sources_is_fatal() {
        let dir = tempfile::TempDir::new().unwrap();
        let body = "dry_run = true\n";
        let err = AgentConfig::load_from(&write_config(&dir, body)).unwrap_err();
        assert!(err.to_string().contains("data source"));
    }

    #[test]
    fn test_inconsistent_thresholds_are_fatal() {
        let dir = tempfile::TempDir::new().unwrap();
        let body = format!(
            "cap_full_threshold = 0.99\ncap_clear_threshold = 0.999\n{}",
            VALID
        );
        assert!(AgentConfig::load_from(&write_config(&dir, &body)).is_err());

        let body = format!("rate_minor_change = 0.2\n{}", VALID);
        assert!(AgentConfig::load_from(&write_config(&dir, &body)).is_err());

        let body = format!("cap_policy = \"sometimes\"\n{}", VALID);
        assert!(AgentConfig::load_from(&write_config(&dir, &body)).is_err());
    }

    #[test]
    fn test_environment_overrides_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let vars: HashMap<String, String> = [
            ("LENDWATCH_API_PORT", "9999"),
            ("LENDWATCH_INTERVAL_SECS", "60"),
            ("LENDWATCH_CAPS_WEBHOOK_URL", "http://hooks.local/env-caps"),
            ("LENDWATCH_DRY_RUN", "false"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        let config = AgentConfig::load_with(
            &write_config(&dir, VALID),
            environment().source(Some(vars)),
        )
        .unwrap();

        assert_eq!(config.api_port, 9999);
        assert_eq!(config.interval_secs, 60);
        assert_eq!(
            config.caps_webhook_url.as_deref(),
            Some("http://hooks.local/env-caps")
        );
        assert!(!config.dry_run);
    }

    #[test]
    fn test_environment_supplies_destinations() {
        let dir = tempfile::TempDir::new().unwrap();
        let body = r#"
            [[sources]]
            name = "euler"
            url = "http://feeds.local/euler"
        "#;
        let vars: HashMap<String, String> = [
            ("LENDWATCH_CAPS_WEBHOOK_URL", "http://hooks.local/caps"),
            ("LENDWATCH_RATES_WEBHOOK_URL", "http://hooks.local/rates"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        let config =
            AgentConfig::load_with(&write_config(&dir, body), environment().source(Some(vars)))
                .unwrap();

        assert_eq!(
            config.rates_webhook_url.as_deref(),
            Some("http://hooks.local/rates")
        );
    }
}
