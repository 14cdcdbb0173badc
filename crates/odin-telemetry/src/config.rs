//! Aggregator configuration

use odin_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Largest accepted `window_capacity`
pub const MAX_WINDOW_CAPACITY: usize = 100_000;

/// Largest accepted `suggestion_capacity`
pub const MAX_SUGGESTION_CAPACITY: usize = 10_000;

/// Thresholds and capacities for [`MetricsAggregator`](crate::MetricsAggregator)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregatorConfig {
    /// Number of recent latencies kept for statistics
    #[serde(default = "default_window_capacity")]
    pub window_capacity: usize,

    /// Latency above which a request is recorded as a bottleneck (ms)
    #[serde(default = "default_advisory_latency_ms")]
    pub advisory_latency_ms: u64,

    /// Latency above which a warning is logged (ms)
    #[serde(default = "default_warn_latency_ms")]
    pub warn_latency_ms: u64,

    /// Success rate below which a warning is logged
    #[serde(default = "default_min_success_rate")]
    pub min_success_rate: f64,

    /// Success rate is only checked once total requests exceed this
    #[serde(default = "default_min_requests_for_rate")]
    pub min_requests_for_rate: u64,

    /// Maximum number of suggestions retained
    #[serde(default = "default_suggestion_capacity")]
    pub suggestion_capacity: usize,

    /// Minimum gap between two suggestions of the same kind (seconds)
    #[serde(default = "default_suggestion_cooldown_secs")]
    pub suggestion_cooldown_secs: u64,

    /// Sample count at which per-model averages stop growing their
    /// denominator and start weighting recent responses
    #[serde(default = "default_model_average_window")]
    pub model_average_window: u64,

    /// Interval between periodic reports (seconds)
    #[serde(default = "default_report_interval_secs")]
    pub report_interval_secs: u64,

    /// Age after which an unfinished request is dropped as abandoned (seconds)
    #[serde(default = "default_in_flight_ttl_secs")]
    pub in_flight_ttl_secs: u64,
}

impl AggregatorConfig {
    /// Parse configuration from YAML; missing fields take their defaults
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml)
            .map_err(|e| Error::config(format!("invalid aggregator config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a YAML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    /// Check that capacities are within bounds and rates are within range
    pub fn validate(&self) -> Result<()> {
        if !(1..=MAX_WINDOW_CAPACITY).contains(&self.window_capacity) {
            return Err(Error::config(format!(
                "window_capacity must be within 1-{}, got {}",
                MAX_WINDOW_CAPACITY, self.window_capacity
            )));
        }
        if !(1..=MAX_SUGGESTION_CAPACITY).contains(&self.suggestion_capacity) {
            return Err(Error::config(format!(
                "suggestion_capacity must be within 1-{}, got {}",
                MAX_SUGGESTION_CAPACITY, self.suggestion_capacity
            )));
        }
        if self.model_average_window == 0 {
            return Err(Error::config("model_average_window must be greater than 0"));
        }
        if self.report_interval_secs == 0 {
            return Err(Error::config("report_interval_secs must be greater than 0"));
        }
        if !(0.0..=1.0).contains(&self.min_success_rate) {
            return Err(Error::config(format!(
                "min_success_rate must be within 0.0-1.0, got {}",
                self.min_success_rate
            )));
        }
        if self.warn_latency_ms < self.advisory_latency_ms {
            return Err(Error::config(
                "warn_latency_ms must not be lower than advisory_latency_ms",
            ));
        }
        Ok(())
    }

    /// Saturate every field into the range [`validate`](Self::validate)
    /// accepts. Used for configs built in code that never went through
    /// validation.
    pub fn normalized(mut self) -> Self {
        self.window_capacity = self.window_capacity.clamp(1, MAX_WINDOW_CAPACITY);
        self.suggestion_capacity = self.suggestion_capacity.clamp(1, MAX_SUGGESTION_CAPACITY);
        self.model_average_window = self.model_average_window.max(1);
        self.report_interval_secs = self.report_interval_secs.max(1);
        self.min_success_rate = if self.min_success_rate.is_nan() {
            default_min_success_rate()
        } else {
            self.min_success_rate.clamp(0.0, 1.0)
        };
        self.warn_latency_ms = self.warn_latency_ms.max(self.advisory_latency_ms);
        self
    }

    pub fn advisory_latency(&self) -> Duration {
        Duration::from_millis(self.advisory_latency_ms)
    }

    pub fn warn_latency(&self) -> Duration {
        Duration::from_millis(self.warn_latency_ms)
    }

    pub fn suggestion_cooldown(&self) -> Duration {
        Duration::from_secs(self.suggestion_cooldown_secs)
    }

    pub fn report_interval(&self) -> Duration {
        Duration::from_secs(self.report_interval_secs)
    }

    pub fn in_flight_ttl(&self) -> Duration {
        Duration::from_secs(self.in_flight_ttl_secs)
    }
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            window_capacity: default_window_capacity(),
            advisory_latency_ms: default_advisory_latency_ms(),
            warn_latency_ms: default_warn_latency_ms(),
            min_success_rate: default_min_success_rate(),
            min_requests_for_rate: default_min_requests_for_rate(),
            suggestion_capacity: default_suggestion_capacity(),
            suggestion_cooldown_secs: default_suggestion_cooldown_secs(),
            model_average_window: default_model_average_window(),
            report_interval_secs: default_report_interval_secs(),
            in_flight_ttl_secs: default_in_flight_ttl_secs(),
        }
    }
}

fn default_window_capacity() -> usize {
    1000
}

fn default_advisory_latency_ms() -> u64 {
    50
}

fn default_warn_latency_ms() -> u64 {
    100
}

fn default_min_success_rate() -> f64 {
    0.95
}

fn default_min_requests_for_rate() -> u64 {
    10
}

fn default_suggestion_capacity() -> usize {
    50
}

fn default_suggestion_cooldown_secs() -> u64 {
    60
}

fn default_model_average_window() -> u64 {
    1000
}

fn default_report_interval_secs() -> u64 {
    60
}

fn default_in_flight_ttl_secs() -> u64 {
    300 // 5 minutes
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AggregatorConfig::default();
        assert_eq!(config.advisory_latency(), Duration::from_millis(50));
        assert_eq!(config.warn_latency(), Duration::from_millis(100));
        assert_eq!(config.min_success_rate, 0.95);
        assert_eq!(config.min_requests_for_rate, 10);
        assert_eq!(config.suggestion_capacity, 50);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let config = AggregatorConfig::from_yaml_str(
            "advisory_latency_ms: 20\nwarn_latency_ms: 40\nwindow_capacity: 100\n",
        )
        .unwrap();
        assert_eq!(config.advisory_latency_ms, 20);
        assert_eq!(config.warn_latency_ms, 40);
        assert_eq!(config.window_capacity, 100);
        assert_eq!(config.suggestion_cooldown_secs, 60);
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(matches!(
            AggregatorConfig::from_yaml_str("window_capacity: 0"),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            AggregatorConfig::from_yaml_str("min_success_rate: 1.5"),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            AggregatorConfig::from_yaml_str("advisory_latency_ms: 500"),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            AggregatorConfig::from_yaml_str("window_capacity: [1, 2]"),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_oversized_capacities_rejected() {
        assert!(matches!(
            AggregatorConfig::from_yaml_str("window_capacity: 18446744073709551615"),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            AggregatorConfig::from_yaml_str("suggestion_capacity: 10001"),
            Err(Error::Config(_))
        ));
        assert!(AggregatorConfig::from_yaml_str("window_capacity: 100000").is_ok());
    }

    #[test]
    fn test_normalized_passes_validation() {
        let config = AggregatorConfig {
            window_capacity: usize::MAX,
            suggestion_capacity: 0,
            model_average_window: 0,
            report_interval_secs: 0,
            min_success_rate: f64::NAN,
            advisory_latency_ms: 200,
            warn_latency_ms: 100,
            ..AggregatorConfig::default()
        }
        .normalized();

        assert!(config.validate().is_ok());
        assert_eq!(config.window_capacity, MAX_WINDOW_CAPACITY);
        assert_eq!(config.suggestion_capacity, 1);
        assert_eq!(config.report_interval(), Duration::from_secs(1));
        assert_eq!(config.min_success_rate, 0.95);
        assert_eq!(config.warn_latency_ms, 200);

        let defaults = AggregatorConfig::default();
        assert_eq!(defaults.clone().normalized(), defaults);
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("metrics.yaml");
        std::fs::write(&path, "report_interval_secs: 5\n").unwrap();

        let config = AggregatorConfig::from_file(&path).unwrap();
        assert_eq!(config.report_interval(), Duration::from_secs(5));

        let missing = AggregatorConfig::from_file(dir.path().join("missing.yaml"));
        assert!(matches!(missing, Err(Error::Io(_))));
    }
}
