//! Caps, recommendation ladder and reason codes
//!
//! Caps only ever lower the base score. The ladder reads the capped score,
//! and an active overload softens whatever action it picks.

use super::components::ComponentBreakdown;
use super::cycle::{CycleAdjustment, CyclePhase};
use super::{ReadinessCaps, ReadinessSettings, ReadinessStrategy, ReadinessVersion};
use crate::models::DailyMetrics;
use crate::overload::aggregate::{lookup, DailyOverloadRecord};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use tracing::{debug, info};

/// Why the day was scored the way it was
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReasonCode {
    LowSleep,
    HighAcwr,
    PerfDrop,
    HighEffort,
    Fatigue,
    HighStrainDay,
    Understim,
    NeuralOverload,
    NeuralOverloadMod,
    NeuralOverloadHigh,
    NeuralOverloadSevere,
}

impl ReasonCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReasonCode::LowSleep => "LOW_SLEEP",
            ReasonCode::HighAcwr => "HIGH_ACWR",
            ReasonCode::PerfDrop => "PERF_DROP",
            ReasonCode::HighEffort => "HIGH_EFFORT",
            ReasonCode::Fatigue => "FATIGUE",
            ReasonCode::HighStrainDay => "HIGH_STRAIN_DAY",
            ReasonCode::Understim => "UNDERSTIM",
            ReasonCode::NeuralOverload => "NEURAL_OVERLOAD",
            ReasonCode::NeuralOverloadMod => "NEURAL_OVERLOAD_MOD",
            ReasonCode::NeuralOverloadHigh => "NEURAL_OVERLOAD_HIGH",
            ReasonCode::NeuralOverloadSevere => "NEURAL_OVERLOAD_SEVERE",
        }
    }
}

impl fmt::Display for ReasonCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Decision for one day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadinessRecord {
    pub date: NaiveDate,
    pub strategy: ReadinessVersion,

    /// Final score after caps; `None` when inputs were missing
    pub readiness_score: Option<u32>,
    pub readiness_uncapped: Option<u32>,
    pub components: ComponentBreakdown,
    pub recommendation: String,
    pub action_intensity: String,

    /// Insertion-ordered, without duplicates
    pub reason_codes: Vec<ReasonCode>,
    pub explanation: String,

    pub overload_score: u32,
    pub overload_lifts: BTreeSet<String>,
    pub understim: bool,
    pub high_strain_day: bool,

    /// Set when the check-in carried a cycle day
    pub cycle_phase: Option<CyclePhase>,
}

impl ReadinessRecord {
    /// Pipe-joined reason codes, or "NONE"
    pub fn reasons_label(&self) -> String {
        reasons_label(&self.reason_codes)
    }

    pub fn has_reason(&self, code: ReasonCode) -> bool {
        self.reason_codes.contains(&code)
    }
}

fn reasons_label(codes: &[ReasonCode]) -> String {
    if codes.is_empty() {
        return "NONE".to_string();
    }
    codes.iter().map(|c| c.as_str()).collect::<Vec<_>>().join("|")
}

/// RIR >= 4 with effort <= 6.5: too little stimulus
pub fn is_understim(rir_weighted: Option<f64>, effort_mean: Option<f64>) -> bool {
    matches!((rir_weighted, effort_mean), (Some(rir), Some(effort)) if rir >= 4.0 && effort <= 6.5)
}

/// RIR <= 1 with effort >= 8.5: a very demanding session
pub fn is_high_strain_day(rir_weighted: Option<f64>, effort_mean: Option<f64>) -> bool {
    matches!((rir_weighted, effort_mean), (Some(rir), Some(effort)) if rir <= 1.0 && effort >= 8.5)
}

/// Apply the load and recovery caps in order, then the overload cap
///
/// Returns the capped score and the overload reason when that cap lowered it.
pub fn apply_caps(
    score: u32,
    day: &DailyMetrics,
    overload_score: u32,
    caps: &ReadinessCaps,
) -> (u32, Option<ReasonCode>) {
    let mut capped = score;
    if day.fatigue_flag {
        capped = capped.min(caps.fatigue_flag);
    }
    if day.sleep_hours.map_or(false, |h| h < caps.low_sleep_hours) {
        capped = capped.min(caps.low_sleep);
    }
    let perf_drop = day.performance_index.map_or(false, |pi| pi < 0.98);
    let hard = day.effort_mean.map_or(false, |e| e >= 8.5);
    if perf_drop && hard {
        capped = capped.min(caps.performance_drop);
    }

    let overload_cap = if overload_score >= 60 {
        Some((caps.overload_severe, ReasonCode::NeuralOverloadSevere))
    } else if overload_score >= 45 {
        Some((caps.overload_high, ReasonCode::NeuralOverloadHigh))
    } else if overload_score >= 30 {
        Some((caps.overload_moderate, ReasonCode::NeuralOverloadMod))
    } else {
        None
    };

    match overload_cap {
        Some((cap, reason)) if capped > cap => (cap, Some(reason)),
        _ => (capped.min(100), None),
    }
}

/// Recommendation and action for a capped score
pub fn recommend(score: Option<u32>, day: &DailyMetrics, overload_active: bool) -> (String, String) {
    let Some(score) = score else {
        return ("Need data".to_string(), "Log sleep + session".to_string());
    };
    let understim = is_understim(day.rir_weighted, day.effort_mean);

    let (recommendation, mut action) = if score >= 80 {
        let action = if understim {
            "+1 set (key lift) OR target RIR 1–2"
        } else if overload_active {
            "+1 set (key lift) at RIR 2"
        } else {
            "+2.5% load (key lift) if PI>=1.01 else +1 set"
        };
        ("Push day", action.to_string())
    } else if score >= 65 {
        let action = if day.acwr_7_28.map_or(false, |a| a > 1.3) {
            "Maintain load, -10% volume"
        } else {
            "Maintain (target RIR 1–2)"
        };
        ("Normal", action.to_string())
    } else if score >= 50 {
        let action = if day.performance_index.map_or(true, |pi| pi >= 1.0) {
            "-15% volume, keep technique, target RIR 2–3"
        } else {
            "-20% volume, avoid RIR<=1"
        };
        ("Reduce", action.to_string())
    } else {
        let action = if day.sleep_hours.map_or(false, |h| h < 6.0) {
            "-40% volume, target RIR 3–5 OR rest"
        } else {
            "-30–50% volume, target RIR 3–5"
        };
        ("Deload / Rest", action.to_string())
    };

    if overload_active {
        action.push_str(", avoid maximal attempts");
    }
    (recommendation.to_string(), action)
}

/// Reason codes in their fixed order, without the cap reason
pub fn reason_codes(day: &DailyMetrics, overload_score: u32) -> Vec<ReasonCode> {
    let mut codes = Vec::new();
    if day.sleep_hours.map_or(false, |h| h < 6.5) {
        codes.push(ReasonCode::LowSleep);
    }
    if day.acwr_7_28.map_or(false, |a| a > 1.5) {
        codes.push(ReasonCode::HighAcwr);
    }
    if day.performance_index.map_or(false, |pi| pi < 0.98) {
        codes.push(ReasonCode::PerfDrop);
    }
    if day.effort_mean.map_or(false, |e| e >= 8.5) {
        codes.push(ReasonCode::HighEffort);
    }
    if day.fatigue_flag {
        codes.push(ReasonCode::Fatigue);
    }
    if is_high_strain_day(day.rir_weighted, day.effort_mean) {
        codes.push(ReasonCode::HighStrainDay);
    }
    if is_understim(day.rir_weighted, day.effort_mean) {
        codes.push(ReasonCode::Understim);
    }
    if overload_score > 0 {
        codes.push(ReasonCode::NeuralOverload);
    }
    codes
}

/// `Readiness {n|NA}: {recommendation} - {action} (reasons: {codes}).`
pub fn explain(score: Option<u32>, recommendation: &str, action: &str, codes: &[ReasonCode]) -> String {
    let score = score.map_or_else(|| "NA".to_string(), |s| s.to_string());
    format!(
        "Readiness {}: {} - {} (reasons: {}).",
        score,
        recommendation,
        action,
        reasons_label(codes)
    )
}

/// Readiness decision engine
pub struct DecisionEngine {
    strategy: Box<dyn ReadinessStrategy>,
    caps: ReadinessCaps,
}

impl DecisionEngine {
    pub fn new(version: ReadinessVersion) -> Self {
        Self {
            strategy: version.strategy(),
            caps: ReadinessCaps::default(),
        }
    }

    pub fn from_settings(settings: &ReadinessSettings) -> Self {
        Self {
            strategy: settings.version.strategy(),
            caps: settings.caps.clone(),
        }
    }

    /// Replace the formula, e.g. with one tuned to personal baselines
    pub fn with_strategy(mut self, strategy: Box<dyn ReadinessStrategy>) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn version(&self) -> ReadinessVersion {
        self.strategy.version()
    }

    /// Decide one day given its overload record
    pub fn evaluate(&self, day: &DailyMetrics, overload: &DailyOverloadRecord) -> ReadinessRecord {
        let breakdown = self.strategy.breakdown(day);
        let uncapped = breakdown.as_ref().map(ComponentBreakdown::score);
        let components = breakdown.unwrap_or_default();

        let (score, cap_reason) = match uncapped {
            Some(base) => {
                let (capped, reason) = apply_caps(base, day, overload.overload_score, &self.caps);
                (Some(capped), reason)
            }
            None => (None, None),
        };

        let mut codes = reason_codes(day, overload.overload_score);
        if let Some(reason) = cap_reason {
            codes.push(reason);
        }

        let (recommendation, action_intensity) = recommend(score, day, overload.is_active());
        let explanation = explain(score, &recommendation, &action_intensity, &codes);
        debug!("{}: {}", day.date, explanation);

        ReadinessRecord {
            date: day.date,
            strategy: self.strategy.version(),
            readiness_score: score,
            readiness_uncapped: uncapped,
            components,
            recommendation,
            action_intensity,
            reason_codes: codes,
            explanation,
            overload_score: overload.overload_score,
            overload_lifts: overload.overload_lifts.clone(),
            understim: is_understim(day.rir_weighted, day.effort_mean),
            high_strain_day: is_high_strain_day(day.rir_weighted, day.effort_mean),
            cycle_phase: day
                .wellness
                .as_ref()
                .and_then(CycleAdjustment::from_entry)
                .map(|c| c.phase),
        }
    }

    /// Decide every day; dates without overload records score 0 overload
    pub fn evaluate_all(
        &self,
        daily: &[DailyMetrics],
        overload: &[DailyOverloadRecord],
    ) -> Vec<ReadinessRecord> {
        let records: Vec<ReadinessRecord> = daily
            .iter()
            .map(|day| self.evaluate(day, &lookup(overload, day.date)))
            .collect();

        let scored = records.iter().filter(|r| r.readiness_score.is_some()).count();
        info!(
            "Readiness ({}): {} of {} days scored",
            self.strategy.version(),
            scored,
            records.len()
        );
        records
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::overload::FlagType;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 3).unwrap()
    }

    fn good_day() -> DailyMetrics {
        let mut d = DailyMetrics::empty(date());
        d.sleep_hours = Some(7.5);
        d.sleep_quality = Some(5.0);
        d.performance_index = Some(1.02);
        d.performance_7d_mean = Some(1.01);
        d.acwr_7_28 = Some(1.0);
        d.rir_weighted = Some(2.0);
        d.effort_mean = Some(8.0);
        d
    }

    fn overload(score: u32) -> DailyOverloadRecord {
        let mut record = DailyOverloadRecord::none(date());
        if score > 0 {
            record.overload_score = score;
            record.overload_flags.insert(FlagType::CnsCostRising);
            record.overload_lifts.insert("squat".to_string());
        }
        record
    }

    #[test]
    fn test_push_day() {
        let engine = DecisionEngine::new(ReadinessVersion::Objective);
        let record = engine.evaluate(&good_day(), &overload(0));
        assert_eq!(record.readiness_score, Some(100));
        assert_eq!(record.recommendation, "Push day");
        assert_eq!(record.action_intensity, "+2.5% load (key lift) if PI>=1.01 else +1 set");
        assert_eq!(record.reasons_label(), "NONE");
        assert_eq!(
            record.explanation,
            "Readiness 100: Push day - +2.5% load (key lift) if PI>=1.01 else +1 set (reasons: NONE)."
        );
    }

    #[test]
    fn test_caps_only_lower() {
        let caps = ReadinessCaps::default();
        let mut day = good_day();
        day.fatigue_flag = true;
        assert_eq!(apply_caps(90, &day, 0, &caps), (60, None));
        assert_eq!(apply_caps(40, &day, 0, &caps), (40, None));

        day.sleep_hours = Some(5.5);
        assert_eq!(apply_caps(90, &day, 0, &caps).0, 55);

        day.performance_index = Some(0.95);
        day.effort_mean = Some(9.0);
        assert_eq!(apply_caps(90, &day, 0, &caps).0, 50);
    }

    #[test]
    fn test_overload_cap_reason_only_when_it_bites() {
        let caps = ReadinessCaps::default();
        let day = good_day();
        assert_eq!(apply_caps(90, &day, 65, &caps), (45, Some(ReasonCode::NeuralOverloadSevere)));
        assert_eq!(apply_caps(90, &day, 50, &caps), (55, Some(ReasonCode::NeuralOverloadHigh)));
        assert_eq!(apply_caps(90, &day, 30, &caps), (65, Some(ReasonCode::NeuralOverloadMod)));
        assert_eq!(apply_caps(60, &day, 30, &caps), (60, None));
        assert_eq!(apply_caps(90, &day, 29, &caps), (90, None));
    }

    #[test]
    fn test_overload_softens_action() {
        let engine = DecisionEngine::new(ReadinessVersion::Objective);
        let record = engine.evaluate(&good_day(), &overload(20));
        assert_eq!(record.readiness_score, Some(100));
        assert_eq!(record.action_intensity, "+1 set (key lift) at RIR 2, avoid maximal attempts");
        assert_eq!(record.reason_codes, vec![ReasonCode::NeuralOverload]);

        let record = engine.evaluate(&good_day(), &overload(62));
        assert_eq!(record.readiness_score, Some(45));
        assert_eq!(record.readiness_uncapped, Some(100));
        assert_eq!(record.recommendation, "Deload / Rest");
        assert_eq!(record.reasons_label(), "NEURAL_OVERLOAD|NEURAL_OVERLOAD_SEVERE");
        assert!(record.explanation.starts_with("Readiness 45: Deload / Rest"));
    }

    #[test]
    fn test_missing_data() {
        let engine = DecisionEngine::new(ReadinessVersion::Objective);
        let mut day = good_day();
        day.performance_index = None;
        let record = engine.evaluate(&day, &overload(0));
        assert_eq!(record.readiness_score, None);
        assert_eq!(record.recommendation, "Need data");
        assert_eq!(record.action_intensity, "Log sleep + session");
        assert!(record.explanation.starts_with("Readiness NA: Need data"));
    }

    #[test]
    fn test_ladder_branches() {
        let mut day = good_day();
        day.acwr_7_28 = Some(1.4);
        assert_eq!(recommend(Some(70), &day, false).1, "Maintain load, -10% volume");

        day.performance_index = Some(0.99);
        assert_eq!(recommend(Some(55), &day, false).1, "-20% volume, avoid RIR<=1");
        day.performance_index = None;
        assert_eq!(recommend(Some(55), &day, false).1, "-15% volume, keep technique, target RIR 2–3");

        day.sleep_hours = Some(5.0);
        assert_eq!(recommend(Some(30), &day, false).1, "-40% volume, target RIR 3–5 OR rest");

        day.rir_weighted = Some(4.5);
        day.effort_mean = Some(5.5);
        assert_eq!(recommend(Some(85), &day, false).1, "+1 set (key lift) OR target RIR 1–2");
    }

    #[test]
    fn test_reason_code_order() {
        let mut day = good_day();
        day.sleep_hours = Some(6.0);
        day.acwr_7_28 = Some(1.6);
        day.performance_index = Some(0.97);
        day.effort_mean = Some(9.0);
        day.rir_weighted = Some(0.5);
        day.fatigue_flag = true;
        let codes = reason_codes(&day, 10);
        assert_eq!(
            reasons_label(&codes),
            "LOW_SLEEP|HIGH_ACWR|PERF_DROP|HIGH_EFFORT|FATIGUE|HIGH_STRAIN_DAY|NEURAL_OVERLOAD"
        );
    }

    #[test]
    fn test_cycle_phase_recorded_and_scaled() {
        use crate::models::WellnessEntry;
        use crate::readiness::WellnessV3;

        let mut day = good_day();
        let mut entry = WellnessEntry::new(date(), 7.5, 4.0);
        entry.fatigue = Some(3.0);
        day.wellness = Some(entry.clone());
        let engine = DecisionEngine::new(ReadinessVersion::WellnessV3);
        let plain = engine.evaluate(&day, &overload(0));
        assert_eq!(plain.strategy, ReadinessVersion::WellnessV3);
        assert_eq!(plain.cycle_phase, None);

        entry.cycle_day = Some(2);
        entry.cramping = Some(4.0);
        day.wellness = Some(entry);
        let menstrual = engine.evaluate(&day, &overload(0));
        assert_eq!(menstrual.cycle_phase, Some(CyclePhase::Menstrual));
        assert!(menstrual.readiness_uncapped < plain.readiness_uncapped);

        let tuned = DecisionEngine::new(ReadinessVersion::Objective)
            .with_strategy(Box::new(WellnessV3::default()));
        assert_eq!(tuned.version(), ReadinessVersion::WellnessV3);
    }
}
