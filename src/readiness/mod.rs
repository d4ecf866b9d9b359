//! Readiness scoring and daily decisions
//!
//! A [`ReadinessStrategy`] turns one day into weighted components and a base
//! score. The [`DecisionEngine`] then applies one-directional caps, picks a
//! recommendation and explains it. Which strategy runs is explicit
//! configuration ([`ReadinessVersion`]).

pub mod components;
pub mod curves;
pub mod cycle;
pub mod day_plan;
pub mod decision;
pub mod wellness;

pub use components::{Component, ComponentBreakdown};
pub use cycle::{CycleAdjustment, CyclePhase};
pub use day_plan::{
    build_day_plan, session_plan, DayPlan, DayStatus, LiftConstraint, PainZone, SessionPlan,
};
pub use decision::{DecisionEngine, ReadinessRecord, ReasonCode};
pub use wellness::{SleepBaseline, WellnessV1, WellnessV2, WellnessV3};

use crate::models::DailyMetrics;
use components::{
    acwr_score, performance_score, rir_fatigue_score, sleep_hours_score, sleep_quality_score,
    trend_score,
};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Readiness formula version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReadinessVersion {
    /// Sleep, performance and load from the daily table
    Objective,
    /// Legacy wellness check-in
    WellnessV1,
    /// Wellness check-in with naps, energy and penalty switches
    WellnessV2,
    /// Wellness check-in scored with smooth curves and soft penalties
    WellnessV3,
}

impl ReadinessVersion {
    pub fn strategy(&self) -> Box<dyn ReadinessStrategy> {
        match self {
            ReadinessVersion::Objective => Box::new(ObjectiveReadiness),
            ReadinessVersion::WellnessV1 => Box::new(WellnessV1),
            ReadinessVersion::WellnessV2 => Box::new(WellnessV2),
            ReadinessVersion::WellnessV3 => Box::new(WellnessV3::default()),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ReadinessVersion::Objective => "objective",
            ReadinessVersion::WellnessV1 => "wellness_v1",
            ReadinessVersion::WellnessV2 => "wellness_v2",
            ReadinessVersion::WellnessV3 => "wellness_v3",
        }
    }
}

impl fmt::Display for ReadinessVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ReadinessVersion {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "objective" => Ok(ReadinessVersion::Objective),
            "wellness_v1" | "v1" => Ok(ReadinessVersion::WellnessV1),
            "wellness_v2" | "v2" => Ok(ReadinessVersion::WellnessV2),
            "wellness_v3" | "v3" => Ok(ReadinessVersion::WellnessV3),
            _ => Err(format!("Unknown readiness version: {}", s)),
        }
    }
}

/// A versioned readiness formula
pub trait ReadinessStrategy: Send + Sync {
    fn version(&self) -> ReadinessVersion;

    /// Weighted components for the day, `None` when required inputs are missing
    fn components(&self, day: &DailyMetrics) -> Option<ComponentBreakdown>;

    /// Components after cycle-phase scaling when the check-in has a cycle day
    fn breakdown(&self, day: &DailyMetrics) -> Option<ComponentBreakdown> {
        let mut breakdown = self.components(day)?;
        if let Some(cycle) = day.wellness.as_ref().and_then(CycleAdjustment::from_entry) {
            cycle.apply(&mut breakdown);
        }
        Some(breakdown)
    }

    /// Uncapped base score in [0, 100]
    fn score(&self, day: &DailyMetrics) -> Option<u32> {
        self.breakdown(day).map(|c| c.score())
    }
}

/// Score from the daily derived table
///
/// Needs sleep hours, sleep quality and a performance index; load terms fall
/// back to neutral 0.5 when absent.
pub struct ObjectiveReadiness;

impl ReadinessStrategy for ObjectiveReadiness {
    fn version(&self) -> ReadinessVersion {
        ReadinessVersion::Objective
    }

    fn components(&self, day: &DailyMetrics) -> Option<ComponentBreakdown> {
        let sleep = day.sleep_hours?;
        let quality = day.sleep_quality?;
        let pi = day.performance_index?;

        let components = vec![
            Component::new("sleep_hours", sleep_hours_score(sleep), 0.25),
            Component::new("sleep_quality", sleep_quality_score(quality), 0.15),
            Component::new("performance", performance_score(pi), 0.25),
            Component::new("trend", trend_score(Some(pi), day.performance_7d_mean), 0.10),
            Component::new("acwr", acwr_score(day.acwr_7_28), 0.15),
            Component::new("rir_fatigue", rir_fatigue_score(day.rir_weighted), 0.10),
        ];
        Some(ComponentBreakdown::new(components, day.perceived_readiness))
    }
}

/// Ceilings applied after the base score
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReadinessCaps {
    pub fatigue_flag: u32,
    pub low_sleep: u32,

    /// Below this many hours the low-sleep cap applies
    pub low_sleep_hours: f64,
    pub performance_drop: u32,
    pub overload_moderate: u32,
    pub overload_high: u32,
    pub overload_severe: u32,
}

impl Default for ReadinessCaps {
    fn default() -> Self {
        Self {
            fatigue_flag: 60,
            low_sleep: 55,
            low_sleep_hours: 6.0,
            performance_drop: 50,
            overload_moderate: 65,
            overload_high: 55,
            overload_severe: 45,
        }
    }
}

/// Readiness settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadinessSettings {
    /// Formula version (required)
    pub version: ReadinessVersion,

    #[serde(default)]
    pub caps: ReadinessCaps,
}

impl Default for ReadinessSettings {
    fn default() -> Self {
        Self {
            version: ReadinessVersion::Objective,
            caps: ReadinessCaps::default(),
        }
    }
}

/// Coarse readiness band
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReadinessZone {
    High,
    Medium,
    Low,
    Unknown,
}

impl fmt::Display for ReadinessZone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ReadinessZone::High => "high",
            ReadinessZone::Medium => "medium",
            ReadinessZone::Low => "low",
            ReadinessZone::Unknown => "unknown",
        };
        write!(f, "{}", label)
    }
}

pub fn zone(score: Option<u32>) -> ReadinessZone {
    match score {
        Some(s) if s >= 80 => ReadinessZone::High,
        Some(s) if s >= 55 => ReadinessZone::Medium,
        Some(_) => ReadinessZone::Low,
        None => ReadinessZone::Unknown,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::WellnessEntry;
    use chrono::NaiveDate;

    fn day() -> DailyMetrics {
        let mut d = DailyMetrics::empty(NaiveDate::from_ymd_opt(2024, 6, 3).unwrap());
        d.sleep_hours = Some(7.5);
        d.sleep_quality = Some(5.0);
        d.performance_index = Some(1.02);
        d.performance_7d_mean = Some(1.01);
        d.acwr_7_28 = Some(1.0);
        d.rir_weighted = Some(2.0);
        d
    }

    #[test]
    fn test_objective_full_marks() {
        assert_eq!(ObjectiveReadiness.score(&day()), Some(100));
    }

    #[test]
    fn test_objective_missing_inputs() {
        let mut d = day();
        d.performance_index = None;
        assert_eq!(ObjectiveReadiness.score(&d), None);

        let mut d = day();
        d.sleep_hours = None;
        assert_eq!(ObjectiveReadiness.score(&d), None);

        let mut d = day();
        d.rir_weighted = None;
        d.performance_7d_mean = None;
        // 0.25 + 0.15 + 0.25 + 0.10 * 0.5 + 0.15 + 0.10 * 0.5
        assert_eq!(ObjectiveReadiness.score(&d), Some(90));
    }

    #[test]
    fn test_perceived_blend() {
        let mut d = day();
        d.perceived_readiness = Some(2.0);
        // 0.25 * 0.2 + 0.75 * 1.0
        assert_eq!(ObjectiveReadiness.score(&d), Some(80));
    }

    #[test]
    fn test_zone_and_version_parsing() {
        assert_eq!(zone(Some(80)), ReadinessZone::High);
        assert_eq!(zone(Some(55)), ReadinessZone::Medium);
        assert_eq!(zone(Some(54)), ReadinessZone::Low);
        assert_eq!(zone(None), ReadinessZone::Unknown);
        assert_eq!(
            "wellness-v2".parse::<ReadinessVersion>().unwrap(),
            ReadinessVersion::WellnessV2
        );
        assert_eq!(ReadinessVersion::Objective.strategy().version(), ReadinessVersion::Objective);
        assert_eq!("v3".parse::<ReadinessVersion>().unwrap(), ReadinessVersion::WellnessV3);
        assert_eq!(ReadinessVersion::WellnessV3.strategy().version(), ReadinessVersion::WellnessV3);
        assert_eq!(ReadinessVersion::WellnessV3.to_string(), "wellness_v3");
    }

    #[test]
    fn test_cycle_day_scales_objective_sleep() {
        let mut d = day();
        d.sleep_hours = Some(7.0);
        let mut entry = WellnessEntry::new(d.date, 7.0, 5.0);
        d.wellness = Some(entry.clone());
        let plain = ObjectiveReadiness.score(&d).unwrap();

        entry.cycle_day = Some(3);
        d.wellness = Some(entry);
        let breakdown = ObjectiveReadiness.breakdown(&d).unwrap();
        // recovery factor 0.90 on both sleep terms
        assert!((breakdown.get("sleep_quality").unwrap() - 0.9).abs() < 1e-9);
        assert!(ObjectiveReadiness.score(&d).unwrap() < plain);
        assert_eq!(ObjectiveReadiness.components(&d).unwrap().get("sleep_quality"), Some(1.0));
    }

    #[test]
    fn test_settings_require_version() {
        assert!(toml::from_str::<ReadinessSettings>("[caps]\nlow_sleep = 50").is_err());
        let parsed: ReadinessSettings = toml::from_str("version = \"wellness_v2\"").unwrap();
        assert_eq!(parsed.version, ReadinessVersion::WellnessV2);
        assert_eq!(parsed.caps.fatigue_flag, 60);
    }
}
