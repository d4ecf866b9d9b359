//! Central vs peripheral fatigue
//!
//! Central fatigue (sleep debt, stress, general tiredness) calls for rest or
//! light technique work; peripheral fatigue (soreness, local pain) can be
//! trained around by switching body region.

use super::baselines::BaselineSet;
use crate::models::WellnessEntry;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Fallback sleep baseline in hours
const DEFAULT_SLEEP_BASELINE: f64 = 7.0;

/// Pain locations that point at the lower body
const LOWER_BODY_TERMS: [&str; 9] = [
    "lower", "leg", "knee", "quad", "hamstring", "calf", "glute", "hip", "ankle",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FatigueType {
    Central,
    Peripheral,
    Mixed,
    Fresh,
    Fatigued,
}

impl fmt::Display for FatigueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            FatigueType::Central => "central",
            FatigueType::Peripheral => "peripheral",
            FatigueType::Mixed => "mixed",
            FatigueType::Fresh => "fresh",
            FatigueType::Fatigued => "fatigued",
        };
        write!(f, "{}", label)
    }
}

/// Body region to train today
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetSplit {
    Rest,
    Upper,
    Lower,
}

impl fmt::Display for TargetSplit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            TargetSplit::Rest => "rest",
            TargetSplit::Upper => "upper",
            TargetSplit::Lower => "lower",
        };
        write!(f, "{}", label)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FatigueClassification {
    pub fatigue_type: FatigueType,
    pub reason: String,
    pub primary_issue: Option<String>,
    pub target_split: TargetSplit,
    pub intensity_hint: String,
    pub recommendations: Vec<String>,

    pub central_points: u32,
    pub peripheral_points: u32,
}

fn intensity_hint_for(readiness: u32) -> &'static str {
    if readiness >= 80 {
        "Push: RIR 1-2 (consider PRs if technique is solid)"
    } else if readiness >= 55 {
        "Normal: RIR 2-3 (clean technique)"
    } else {
        "Conservative: RIR 3-5 (reduce load)"
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// Classify today's fatigue from the wellness entry
///
/// A readiness below 50 never yields `Fresh`: when symptoms look mild but the
/// score is low the result is `Fatigued`.
pub fn detect_fatigue_type(
    entry: &WellnessEntry,
    baselines: &BaselineSet,
    readiness_instant: u32,
) -> FatigueClassification {
    let sleep_baseline = baselines.sleep_p50().unwrap_or(DEFAULT_SLEEP_BASELINE);
    let stress = entry.stress.unwrap_or(0.0);
    let fatigue = entry.fatigue.unwrap_or(0.0);
    let soreness = entry.soreness.unwrap_or(0.0);
    let location = entry
        .pain_location
        .as_deref()
        .map(str::trim)
        .filter(|l| !l.is_empty());

    let mut central = 0;
    if entry.sleep_hours < sleep_baseline - 0.5 {
        central += 2;
    } else if entry.sleep_hours < sleep_baseline {
        central += 1;
    }
    if entry.sleep_quality <= 2.0 {
        central += 1;
    }
    if stress >= 7.0 {
        central += 1;
    }
    if fatigue >= 7.0 {
        central += 1;
    }

    let mut peripheral = 0;
    if soreness >= 7.0 {
        peripheral += 2;
    }
    if entry.pain_flag && location.is_some() {
        peripheral += 2;
    }

    let hint = intensity_hint_for(readiness_instant).to_string();

    let (fatigue_type, reason, primary_issue, target_split, intensity_hint, recommendations) =
        if central >= 3 && peripheral < 2 {
            (
                FatigueType::Central,
                format!(
                    "Low sleep ({}h < {:.1}h) plus high stress/fatigue",
                    entry.sleep_hours, sleep_baseline
                ),
                Some("CNS fatigue"),
                TargetSplit::Rest,
                hint,
                strings(&[
                    "Technique session or light accessories",
                    "Easy zone 2 cardio or mobility",
                    "Avoid heavy compound lifts (squat, deadlift)",
                    "Prioritize 1-2h of extra sleep tonight",
                ]),
            )
        } else if peripheral >= 2 && central < 2 {
            let lower = location.map_or(false, |l| {
                let l = l.to_lowercase();
                LOWER_BODY_TERMS.iter().any(|term| l.contains(term))
            });
            let target = if lower { TargetSplit::Upper } else { TargetSplit::Lower };
            let area = location.unwrap_or("muscles");
            (
                FatigueType::Peripheral,
                format!("High soreness/pain in {}", area),
                Some("Local soreness"),
                target,
                hint,
                vec![
                    format!("{} body training is OK", if lower { "Upper" } else { "Lower" }),
                    format!("Avoid loading the {} area", location.unwrap_or("painful")),
                    "Mobility plus long stretching (15-20 min)".to_string(),
                    "Local cold if there is swelling".to_string(),
                ],
            )
        } else if central >= 2 && peripheral >= 2 {
            (
                FatigueType::Mixed,
                format!(
                    "Central fatigue ({}h sleep) plus peripheral ({}/10 soreness)",
                    entry.sleep_hours, soreness
                ),
                Some("Overreaching"),
                TargetSplit::Rest,
                "Deload: RIR 3-5 (cut volume -30%)".to_string(),
                strings(&[
                    "Cut overall volume -20%",
                    "Consider light activity (zone 2 cardio, mobility)",
                    "Rest at least 2 days or take a full deload",
                ]),
            )
        } else if readiness_instant < 50 {
            (
                FatigueType::Fatigued,
                format!(
                    "Low readiness ({}/100) despite normal-looking symptoms",
                    readiness_instant
                ),
                Some("Accumulated fatigue / incomplete recovery"),
                TargetSplit::Rest,
                "Conservative: RIR 3-5 (cut volume -20%)".to_string(),
                strings(&[
                    "Symptoms look fine but the score shows accumulated fatigue",
                    "Cut volume by at least 20%",
                    "Prioritize passive recovery: extra sleep, low stress",
                    "If it persists, take a full deload",
                ]),
            )
        } else {
            let recs = if readiness_instant >= 80 {
                strings(&[
                    "You can push today",
                    "Consider PR attempts if technique is solid",
                    "Train freely",
                ])
            } else {
                strings(&[
                    "Train normally (technique first)",
                    "Keep tempo and execution under control",
                    "Do not force it if fatigue shows up",
                ])
            };
            (
                FatigueType::Fresh,
                format!("Well rested ({}h, stress {}/10)", entry.sleep_hours, stress),
                None,
                TargetSplit::Upper,
                hint,
                recs,
            )
        };

    FatigueClassification {
        fatigue_type,
        reason,
        primary_issue: primary_issue.map(str::to_string),
        target_split,
        intensity_hint,
        recommendations,
        central_points: central,
        peripheral_points: peripheral,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::personalization::baselines::{calculate_baselines, PersonalizationConfig};
    use chrono::NaiveDate;

    fn no_history() -> BaselineSet {
        calculate_baselines(&[], &[], &[], &PersonalizationConfig::default())
    }

    fn entry(sleep: f64, quality: f64) -> WellnessEntry {
        WellnessEntry::new(NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(), sleep, quality)
    }

    #[test]
    fn test_central_fatigue() {
        let mut e = entry(5.5, 2.0);
        e.stress = Some(8.0);
        let c = detect_fatigue_type(&e, &no_history(), 45);
        assert_eq!(c.fatigue_type, FatigueType::Central);
        assert_eq!(c.target_split, TargetSplit::Rest);
        assert_eq!(c.central_points, 4);
    }

    #[test]
    fn test_peripheral_lower_body_redirects_upper() {
        let mut e = entry(7.5, 4.0);
        e.soreness = Some(8.0);
        e.pain_flag = true;
        e.pain_location = Some("Left knee".to_string());
        let c = detect_fatigue_type(&e, &no_history(), 70);
        assert_eq!(c.fatigue_type, FatigueType::Peripheral);
        assert_eq!(c.target_split, TargetSplit::Upper);
        assert_eq!(c.peripheral_points, 4);
    }

    #[test]
    fn test_pain_without_location_is_ignored() {
        let mut e = entry(7.5, 4.0);
        e.pain_flag = true;
        e.pain_location = Some("   ".to_string());
        let c = detect_fatigue_type(&e, &no_history(), 70);
        assert_eq!(c.peripheral_points, 0);
        assert_eq!(c.fatigue_type, FatigueType::Fresh);
    }

    #[test]
    fn test_mixed_fatigue() {
        let mut e = entry(6.0, 3.0);
        e.soreness = Some(9.0);
        let c = detect_fatigue_type(&e, &no_history(), 60);
        assert_eq!(c.fatigue_type, FatigueType::Mixed);
    }

    #[test]
    fn test_low_readiness_overrides_fresh() {
        let e = entry(7.5, 4.0);
        let c = detect_fatigue_type(&e, &no_history(), 42);
        assert_eq!(c.fatigue_type, FatigueType::Fatigued);
        assert_eq!(c.target_split, TargetSplit::Rest);

        let c = detect_fatigue_type(&e, &no_history(), 85);
        assert_eq!(c.fatigue_type, FatigueType::Fresh);
        assert!(c.intensity_hint.starts_with("Push"));
    }
}
