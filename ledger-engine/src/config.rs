//! Configuration for the performance engine.

use std::time::Duration;

use scoring::{AttendanceRates, Decimal, Granularity, NormalizeContext};
use serde::{Deserialize, Serialize};

/// Errors raised when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// YAML could not be parsed
    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_yaml::Error),

    /// A value is out of range
    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Configuration for a [`PerformanceEngine`](crate::PerformanceEngine).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Normalization settings
    #[serde(default)]
    pub scoring: ScoringConfig,
    /// Source fetch settings
    #[serde(default)]
    pub sources: SourceConfig,
    /// Access audit settings
    #[serde(default)]
    pub audit: AuditConfig,
}

impl EngineConfig {
    /// Load and validate config from YAML.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize to YAML.
    pub fn to_yaml(&self) -> Result<String, serde_yaml::Error> {
        serde_yaml::to_string(self)
    }

    /// Check value ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sources.fetch_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "sources.fetch_timeout_ms must be positive".to_string(),
            ));
        }

        let rates = &self.scoring.rates;
        for (name, rate) in [
            ("overtime_points_per_hour", rates.overtime_points_per_hour),
            ("absence_points_per_day", rates.absence_points_per_day),
            ("absence_points_per_hour", rates.absence_points_per_hour),
        ] {
            if rate < Decimal::ZERO {
                return Err(ConfigError::Invalid(format!(
                    "scoring.rates.{} must not be negative",
                    name
                )));
            }
        }

        if self.audit.enabled && self.audit.max_entries == 0 {
            return Err(ConfigError::Invalid(
                "audit.max_entries must be positive when audit is enabled".to_string(),
            ));
        }

        Ok(())
    }

    /// Per-source fetch timeout.
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.sources.fetch_timeout_ms)
    }

    /// Normalization context at the configured granularity.
    pub fn normalize_context(&self) -> NormalizeContext {
        NormalizeContext::default()
            .with_granularity(self.scoring.granularity)
            .with_rates(self.scoring.rates.clone())
    }
}

/// Normalization configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoringConfig {
    /// Default bucket size for `current_period`
    #[serde(default)]
    pub granularity: Granularity,
    /// Attendance conversion rates
    #[serde(default)]
    pub rates: AttendanceRates,
}

/// Source fetch configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Timeout for each source read (ms)
    pub fetch_timeout_ms: u64,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            fetch_timeout_ms: 5_000,
        }
    }
}

/// Access audit configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditConfig {
    /// Record every authorization decision
    pub enabled: bool,
    /// Maximum entries retained
    pub max_entries: usize,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_entries: 10_000,
        }
    }
}
