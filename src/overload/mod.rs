//! Neuromuscular overload detection
//!
//! Slides a fixed-size window over each exercise's top sets and evaluates a set
//! of independent rules. Every rule that fires yields an [`OverloadFlag`] with a
//! severity weight, the evidence behind the trigger and a short list of actions.
//!
//! Two rule sets exist side by side. [`OverloadVersion::V1`] runs the four
//! original rules with their per-rule quirks; [`OverloadVersion::V2`] adds
//! comparable-band rules for maximal-intent variability and rising CNS cost.
//! The version is always chosen explicitly through configuration.

pub mod advanced;
pub mod aggregate;
pub mod cross_check;
pub mod detector;
pub mod rules;
pub mod thresholds;

pub use advanced::classify_advanced;
pub use aggregate::{aggregate_daily, DailyOverloadRecord};
pub use cross_check::{recovery_cross_check, CrossCheckCause};
pub use detector::{OverloadDetector, OverloadReport};
pub use thresholds::{OverloadThresholds, OverloadWeights};

use crate::models::TopSet;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Ordered evidence payload (key -> JSON value)
pub type Evidence = serde_json::Map<String, serde_json::Value>;

/// Overload pattern detected on one exercise
///
/// Variant order is the rule evaluation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FlagType {
    SustainedNearFailure,
    FixedLoadDrift,
    HighVolatility,
    PlateauEffortRise,
    MaxIntentVariability,
    CnsCostRising,
}

impl FlagType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FlagType::SustainedNearFailure => "SUSTAINED_NEAR_FAILURE",
            FlagType::FixedLoadDrift => "FIXED_LOAD_DRIFT",
            FlagType::HighVolatility => "HIGH_VOLATILITY",
            FlagType::PlateauEffortRise => "PLATEAU_EFFORT_RISE",
            FlagType::MaxIntentVariability => "MAX_INTENT_VARIABILITY",
            FlagType::CnsCostRising => "CNS_COST_RISING",
        }
    }

    /// Short description of the pattern
    pub fn description(&self) -> &'static str {
        match self {
            FlagType::SustainedNearFailure => "Most recent top sets were taken to or near failure",
            FlagType::FixedLoadDrift => "Performance dropped at a load that used to be manageable",
            FlagType::HighVolatility => "Large session-to-session swings while grinding near failure",
            FlagType::PlateauEffortRise => "Load is flat while effort keeps rising",
            FlagType::MaxIntentVariability => {
                "Unstable e1RM across comparable maximal-intent sessions"
            }
            FlagType::CnsCostRising => "Same work costs more effort than in the previous block",
        }
    }
}

impl fmt::Display for FlagType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One triggered rule for one exercise on one date
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverloadFlag {
    pub date: NaiveDate,
    pub exercise: String,
    pub flag_type: FlagType,
    pub severity: u32,
    pub evidence: Evidence,
    pub recommendations: Vec<String>,
}

/// Rule-set version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverloadVersion {
    V1,
    V2,
}

impl OverloadVersion {
    pub fn strategy(&self) -> Box<dyn OverloadStrategy> {
        match self {
            OverloadVersion::V1 => Box::new(OverloadV1),
            OverloadVersion::V2 => Box::new(OverloadV2),
        }
    }
}

impl fmt::Display for OverloadVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OverloadVersion::V1 => write!(f, "v1"),
            OverloadVersion::V2 => write!(f, "v2"),
        }
    }
}

impl std::str::FromStr for OverloadVersion {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "v1" | "1" => Ok(OverloadVersion::V1),
            "v2" | "2" => Ok(OverloadVersion::V2),
            _ => Err(format!("Unknown overload version: {}", s)),
        }
    }
}

/// A versioned overload rule set
pub trait OverloadStrategy: Send + Sync {
    fn version(&self) -> OverloadVersion;

    /// Rules evaluated on every window, in order
    fn rules(&self) -> &'static [FlagType];

    /// Thresholds for regular lifts
    fn thresholds(&self) -> OverloadThresholds;

    /// Tighter thresholds for advanced lifts
    fn advanced_thresholds(&self) -> OverloadThresholds;

    /// Evaluate every window of one exercise's chronological top sets
    ///
    /// A window ends at each session index once `min_sessions` rows exist; it
    /// spans at most `window_sessions` rows. Fewer rows yield no flags.
    fn analyze(
        &self,
        exercise: &str,
        rows: &[TopSet],
        thresholds: &OverloadThresholds,
        is_advanced: bool,
    ) -> Vec<OverloadFlag> {
        let mut flags = Vec::new();
        let min_rows = thresholds.min_sessions.max(1);
        if rows.len() < min_rows {
            return flags;
        }

        for end in (min_rows - 1)..rows.len() {
            let start = (end + 1).saturating_sub(thresholds.window_sessions);
            let ctx = rules::WindowContext {
                exercise,
                history: rows,
                end,
                window: &rows[start..=end],
                thresholds,
                is_advanced,
            };
            for rule in self.rules() {
                if let Some(flag) = rules::evaluate(*rule, &ctx) {
                    flags.push(flag);
                }
            }
        }
        flags
    }
}

/// Four-rule detector
pub struct OverloadV1;

/// Six-rule detector with comparable-band rules
pub struct OverloadV2;

const V1_RULES: [FlagType; 4] = [
    FlagType::SustainedNearFailure,
    FlagType::FixedLoadDrift,
    FlagType::HighVolatility,
    FlagType::PlateauEffortRise,
];

const V2_RULES: [FlagType; 6] = [
    FlagType::SustainedNearFailure,
    FlagType::FixedLoadDrift,
    FlagType::HighVolatility,
    FlagType::PlateauEffortRise,
    FlagType::MaxIntentVariability,
    FlagType::CnsCostRising,
];

impl OverloadStrategy for OverloadV1 {
    fn version(&self) -> OverloadVersion {
        OverloadVersion::V1
    }

    fn rules(&self) -> &'static [FlagType] {
        &V1_RULES
    }

    fn thresholds(&self) -> OverloadThresholds {
        OverloadThresholds::v1()
    }

    fn advanced_thresholds(&self) -> OverloadThresholds {
        OverloadThresholds::v1_advanced()
    }
}

impl OverloadStrategy for OverloadV2 {
    fn version(&self) -> OverloadVersion {
        OverloadVersion::V2
    }

    fn rules(&self) -> &'static [FlagType] {
        &V2_RULES
    }

    fn thresholds(&self) -> OverloadThresholds {
        OverloadThresholds::v2()
    }

    fn advanced_thresholds(&self) -> OverloadThresholds {
        OverloadThresholds::v2_advanced()
    }
}

/// Overload detection settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverloadSettings {
    /// Rule-set version (required)
    pub version: OverloadVersion,

    /// Exercises to analyse; empty means all
    #[serde(default)]
    pub key_lifts: Vec<String>,

    /// Scale severities by recovery context of the latest day
    #[serde(default)]
    pub recovery_cross_check: bool,

    /// Upper bound of the daily overload score
    #[serde(default = "default_score_cap")]
    pub score_cap: u32,

    /// Replace the version's regular preset
    #[serde(default)]
    pub thresholds: Option<OverloadThresholds>,

    /// Replace the version's advanced preset
    #[serde(default)]
    pub advanced_thresholds: Option<OverloadThresholds>,
}

fn default_score_cap() -> u32 {
    100
}

impl Default for OverloadSettings {
    fn default() -> Self {
        Self {
            version: OverloadVersion::V2,
            key_lifts: Vec::new(),
            recovery_cross_check: false,
            score_cap: default_score_cap(),
            thresholds: None,
            advanced_thresholds: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flag_type_serializes_screaming_snake() {
        let json = serde_json::to_string(&FlagType::CnsCostRising).unwrap();
        assert_eq!(json, "\"CNS_COST_RISING\"");
        assert_eq!(FlagType::FixedLoadDrift.to_string(), "FIXED_LOAD_DRIFT");
    }

    #[test]
    fn test_version_rule_sets() {
        assert_eq!(OverloadVersion::V1.strategy().rules().len(), 4);
        assert_eq!(OverloadVersion::V2.strategy().rules().len(), 6);
        assert!(!OverloadV1.rules().contains(&FlagType::CnsCostRising));
        assert_eq!("V2".parse::<OverloadVersion>().unwrap(), OverloadVersion::V2);
    }

    #[test]
    fn test_settings_require_version() {
        let parsed: Result<OverloadSettings, _> = toml::from_str("key_lifts = [\"squat\"]");
        assert!(parsed.is_err());

        let parsed: OverloadSettings = toml::from_str("version = \"v1\"").unwrap();
        assert_eq!(parsed.version, OverloadVersion::V1);
        assert_eq!(parsed.score_cap, 100);
        assert!(!parsed.recovery_cross_check);
    }
}
