use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::daily_metrics::DailyMetricsConfig;
use crate::error::ConfigError;
use crate::logging::LogConfig;
use crate::overload::{OverloadSettings, OverloadThresholds};
use crate::personalization::PersonalizationConfig;
use crate::readiness::ReadinessSettings;
use crate::set_classifier::SetClassifierConfig;

/// Engine configuration
///
/// `overload` and `readiness` are required sections because they carry the
/// formula versions; every other section falls back to its defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Configuration metadata
    #[serde(default)]
    pub metadata: ConfigMetadata,

    /// Set role thresholds
    #[serde(default)]
    pub classifier: SetClassifierConfig,

    /// Overload rule set and thresholds
    pub overload: OverloadSettings,

    /// Readiness formula and caps
    pub readiness: ReadinessSettings,

    /// Daily table windows and fatigue flag
    #[serde(default)]
    pub daily: DailyMetricsConfig,

    /// Personal baseline settings
    #[serde(default)]
    pub personalization: PersonalizationConfig,

    /// Logging
    #[serde(default)]
    pub logging: LogConfig,
}

/// Configuration metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigMetadata {
    /// Configuration format version
    pub version: String,

    /// Last time the file was written
    pub updated_at: Option<DateTime<Utc>>,
}

impl Default for ConfigMetadata {
    fn default() -> Self {
        Self {
            version: "1".to_string(),
            updated_at: None,
        }
    }
}

/// Defaults pick the V2 overload rules and the objective readiness formula
impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            metadata: ConfigMetadata::default(),
            classifier: SetClassifierConfig::default(),
            overload: OverloadSettings::default(),
            readiness: ReadinessSettings::default(),
            daily: DailyMetricsConfig::default(),
            personalization: PersonalizationConfig::default(),
            logging: LogConfig::default(),
        }
    }
}

fn invalid(parameter: &str, value: impl ToString, reason: &str) -> ConfigError {
    ConfigError::InvalidParameter {
        parameter: parameter.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

fn check_fraction(parameter: &str, value: f64) -> std::result::Result<(), ConfigError> {
    if value > 0.0 && value <= 1.0 {
        Ok(())
    } else {
        Err(invalid(parameter, value, "must be in (0, 1]"))
    }
}

fn check_thresholds(prefix: &str, t: &OverloadThresholds) -> std::result::Result<(), ConfigError> {
    if t.window_sessions < 2 {
        return Err(invalid(
            &format!("{}.window_sessions", prefix),
            t.window_sessions,
            "a window needs at least 2 sessions",
        ));
    }
    if t.min_sessions == 0 {
        return Err(invalid(&format!("{}.min_sessions", prefix), 0, "must be positive"));
    }
    if t.load_tolerance_kg <= 0.0 {
        return Err(invalid(
            &format!("{}.load_tolerance_kg", prefix),
            t.load_tolerance_kg,
            "must be positive",
        ));
    }
    check_fraction(&format!("{}.near_failure_prop", prefix), t.near_failure_prop)?;
    check_fraction(&format!("{}.max_intent_prop", prefix), t.max_intent_prop)
}

/// Configuration management implementation
impl EngineConfig {
    /// Load configuration from TOML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: EngineConfig = toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.as_ref().to_path_buf(),
            reason: e.to_string(),
        })?;
        config.validate()?;

        Ok(config)
    }

    /// Save configuration to TOML file
    pub fn save_to_file<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        self.metadata.updated_at = Some(Utc::now());

        if let Some(parent) = path.as_ref().parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {}", parent.display()))?;
        }

        let toml_content = toml::to_string_pretty(self)
            .with_context(|| "Failed to serialize configuration to TOML")?;

        fs::write(&path, toml_content)
            .with_context(|| format!("Failed to write config file: {}", path.as_ref().display()))?;

        Ok(())
    }

    /// Get default configuration file path
    pub fn default_config_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".liftready")
            .join("config.toml")
    }

    /// Load configuration with fallback to defaults
    pub fn load_or_default() -> Self {
        let config_path = Self::default_config_path();

        match Self::load_from_file(&config_path) {
            Ok(config) => config,
            Err(e) => {
                tracing::debug!("Using default configuration ({}): {:#}", config_path.display(), e);
                Self::default()
            }
        }
    }

    /// Check thresholds for impossible values
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        let c = &self.classifier;
        check_fraction("classifier.warmup_threshold", c.warmup_threshold)?;
        check_fraction("classifier.backoff_drop_pct", c.backoff_drop_pct)?;
        check_fraction("classifier.warmup_max_intensity", c.warmup_max_intensity)?;
        if !(0.0..1.0).contains(&c.multi_top_within_pct) {
            return Err(invalid(
                "classifier.multi_top_within_pct",
                c.multi_top_within_pct,
                "must be in [0, 1)",
            ));
        }

        if self.overload.score_cap == 0 || self.overload.score_cap > 100 {
            return Err(invalid("overload.score_cap", self.overload.score_cap, "must be in 1..=100"));
        }
        if let Some(t) = &self.overload.thresholds {
            check_thresholds("overload.thresholds", t)?;
        }
        if let Some(t) = &self.overload.advanced_thresholds {
            check_thresholds("overload.advanced_thresholds", t)?;
        }

        let caps = &self.readiness.caps;
        for (name, value) in [
            ("readiness.caps.fatigue_flag", caps.fatigue_flag),
            ("readiness.caps.low_sleep", caps.low_sleep),
            ("readiness.caps.performance_drop", caps.performance_drop),
            ("readiness.caps.overload_moderate", caps.overload_moderate),
            ("readiness.caps.overload_high", caps.overload_high),
            ("readiness.caps.overload_severe", caps.overload_severe),
        ] {
            if value > 100 {
                return Err(invalid(name, value, "caps are scores in 0..=100"));
            }
        }

        let d = &self.daily;
        for (name, window, min_periods) in [
            ("daily.acute_window", d.acute_window, d.acute_min_periods),
            ("daily.chronic_window", d.chronic_window, d.chronic_min_periods),
            ("daily.performance_window", d.performance_window, d.performance_min_periods),
        ] {
            if window == 0 || min_periods > window {
                return Err(invalid(name, window, "must be positive and cover its min periods"));
            }
        }
        check_fraction("daily.fatigue_volume_quantile", d.fatigue_volume_quantile)?;
        check_fraction("daily.fatigue_sleep_quantile", d.fatigue_sleep_quantile)?;

        if self.personalization.min_days == 0 {
            return Err(invalid("personalization.min_days", 0, "must be positive"));
        }
        Ok(())
    }
}
