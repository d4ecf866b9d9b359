//! Day plan: a go/no-go status, per-lift constraints from overload flags and
//! session guidance from the morning check-in

use super::cycle::CycleAdjustment;
use super::decision::ReadinessRecord;
use super::{zone, ReadinessZone};
use crate::models::{DailyMetrics, WellnessEntry};
use crate::overload::aggregate::DailyOverloadRecord;
use crate::overload::{FlagType, OverloadFlag};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

const DEFAULT_ACWR: f64 = 1.0;
const DEFAULT_SLEEP: f64 = 7.0;

/// Check-in ratings (0-10) at which session rules kick in
const HIGH_FATIGUE: f64 = 8.0;
const HIGH_STIFFNESS: f64 = 7.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DayStatus {
    Go,
    GoWithConstraints,
    Recover,
    Redirect,
}

impl DayStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DayStatus::Go => "GO",
            DayStatus::GoWithConstraints => "GO_WITH_CONSTRAINTS",
            DayStatus::Recover => "RECOVER",
            DayStatus::Redirect => "REDIRECT",
        }
    }
}

impl fmt::Display for DayStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Constraints for one lift, merged over all of its flags that day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiftConstraint {
    pub exercise: String,
    pub constraints: Vec<String>,
    pub why: Vec<FlagType>,

    /// Highest severity among the lift's flags
    pub severity: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DayPlan {
    pub date: NaiveDate,
    pub day_status: DayStatus,
    pub readiness_score: Option<u32>,
    pub overload_score: u32,
    pub reason_codes: BTreeSet<FlagType>,
    pub affected_lifts: BTreeSet<String>,
    pub lift_constraints: Vec<LiftConstraint>,
    pub session: SessionPlan,
}

/// Body region named in a pain report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PainZone {
    Shoulder,
    ElbowWrist,
    LowerBack,
    Knee,
    Ankle,
    Other,
}

impl PainZone {
    /// Match a free-text location; unknown text maps to `Other`
    pub fn from_location(location: &str) -> Self {
        let location = location.to_lowercase();
        let has = |words: &[&str]| words.iter().any(|w| location.contains(w));
        if has(&["shoulder"]) {
            PainZone::Shoulder
        } else if has(&["elbow", "wrist", "forearm"]) {
            PainZone::ElbowWrist
        } else if has(&["back", "lumbar", "spine"]) {
            PainZone::LowerBack
        } else if has(&["knee"]) {
            PainZone::Knee
        } else if has(&["ankle", "achilles"]) {
            PainZone::Ankle
        } else {
            PainZone::Other
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PainZone::Shoulder => "shoulder",
            PainZone::ElbowWrist => "elbow/wrist",
            PainZone::LowerBack => "lower back",
            PainZone::Knee => "knee",
            PainZone::Ankle => "ankle",
            PainZone::Other => "affected area",
        }
    }

    /// (movements to avoid, movements that are usually fine)
    pub fn movements(&self) -> (&'static [&'static str], &'static [&'static str]) {
        match self {
            PainZone::Shoulder => (
                &["bench press", "overhead press", "dips", "pull-ups"],
                &["squat", "deadlift", "leg curl", "leg press"],
            ),
            PainZone::ElbowWrist => (
                &["close-grip bench press", "curls", "triceps extensions"],
                &["squat", "trap-bar deadlift", "leg press"],
            ),
            PainZone::LowerBack => (
                &["conventional deadlift", "good mornings", "low-bar squat"],
                &["leg press", "leg extensions", "leg curl", "bench press"],
            ),
            PainZone::Knee => (
                &["deep squat", "leg extensions", "jumps"],
                &["upper body", "leg curl (light)"],
            ),
            PainZone::Ankle => (
                &["squat", "deadlift", "standing calf raises"],
                &["upper body", "leg press (reduced range)"],
            ),
            PainZone::Other => (
                &["movements that reproduce the pain"],
                &["patterns away from the affected area"],
            ),
        }
    }
}

/// What to do in the gym today
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionPlan {
    pub headline: String,

    /// RIR range for working sets; `None` on rest days
    pub target_rir: Option<String>,
    pub volume_change: Option<String>,
    pub pain_zone: Option<PainZone>,
    pub avoid: Vec<String>,
    pub allowed: Vec<String>,

    /// Preparation and recovery advice
    pub notes: Vec<String>,

    /// Hard rules for the session, base rules first
    pub rules: Vec<String>,
}

fn owned(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// Session guidance from the readiness band and the check-in
///
/// Sickness overrides everything. Pain adds a movement filter for the
/// reported zone; high fatigue, stiffness and low readiness add rules.
pub fn session_plan(readiness: Option<u32>, wellness: Option<&WellnessEntry>) -> SessionPlan {
    if wellness.map_or(false, |w| w.sick) {
        return SessionPlan {
            headline: "Sick: do not train".to_string(),
            target_rir: None,
            volume_change: None,
            pain_zone: None,
            avoid: Vec::new(),
            allowed: Vec::new(),
            notes: owned(&["Full rest; prioritize hydration, sleep and nutrition"]),
            rules: owned(&["Do not train", "Avoid exercise until fully recovered"]),
        };
    }

    let (headline, rir, volume) = match zone(readiness) {
        ReadinessZone::High => ("Push day: go for PRs", "1-2", "+10% sets"),
        ReadinessZone::Medium => ("Normal: keep technique", "2-3", "standard volume"),
        ReadinessZone::Low | ReadinessZone::Unknown => ("Deload: reduce load", "3-5", "-20% sets"),
    };
    let mut plan = SessionPlan {
        headline: headline.to_string(),
        target_rir: Some(rir.to_string()),
        volume_change: Some(volume.to_string()),
        pain_zone: None,
        avoid: Vec::new(),
        allowed: Vec::new(),
        notes: Vec::new(),
        rules: owned(&[
            "Warm up progressively for 5-10 min",
            "Respect the prescribed RIR",
            "Stay hydrated",
        ]),
    };

    if let Some(entry) = wellness {
        if entry.pain_flag {
            let pain = entry
                .pain_location
                .as_deref()
                .map_or(PainZone::Other, PainZone::from_location);
            let (avoid, allowed) = pain.movements();
            plan.avoid = owned(avoid);
            plan.allowed = owned(allowed);
            plan.pain_zone = Some(pain);
            plan.rules.push(format!("Stop if pain in the {} gets worse", pain.as_str()));
            plan.rules.push("15 min of gentle mobility after the session".to_string());
        }
        if entry.fatigue.map_or(false, |f| f >= HIGH_FATIGUE) {
            plan.rules.push("Cut volume by at least 30%".to_string());
            plan.rules.push("Stop the session on dizziness or nausea".to_string());
        }
        if entry.stiffness.map_or(false, |s| s >= HIGH_STIFFNESS) {
            plan.notes.push("Add 15 min of warm-up: foam rolling and dynamic mobility".to_string());
            plan.rules.push("Consider cold or heat therapy".to_string());
            plan.rules.push("Do not force a limited range of motion".to_string());
        }
        if let Some(cycle) = CycleAdjustment::from_entry(entry) {
            plan.notes.extend(cycle.recommendations);
        }
    }

    if readiness.map_or(false, |r| r < 55) {
        plan.rules.push("Technique over load".to_string());
        plan.rules.push("Use a slower tempo".to_string());
    }
    plan
}

/// Training constraints implied by one flag type
pub fn constraints_for(flag: FlagType) -> &'static [&'static str] {
    match flag {
        FlagType::CnsCostRising => &["NO_RIR0", "TOP_SET_RIR>=2", "SWAP_VARIANT"],
        FlagType::FixedLoadDrift => &["VOLUME_CAP_-20%", "NO_RIR0"],
        FlagType::SustainedNearFailure => &["NO_RIR0", "BACKOFF_ONLY"],
        FlagType::MaxIntentVariability => &["STANDARDIZE_TECHNIQUE", "NO_RIR0"],
        FlagType::HighVolatility => &["STANDARDIZE_TECHNIQUE"],
        FlagType::PlateauEffortRise => &["SWAP_VARIANT", "VOLUME_CAP_-25%"],
    }
}

/// Status from readiness, overload, ACWR and sleep
///
/// A missing readiness reads as 0.
pub fn day_status(readiness: Option<u32>, overload_score: u32, acwr: f64, sleep: f64) -> DayStatus {
    let readiness = readiness.unwrap_or(0);
    if readiness >= 80 && overload_score < 30 && acwr < 1.3 && sleep >= 7.0 {
        DayStatus::Go
    } else if readiness >= 60 && overload_score < 60 && acwr < 1.5 && sleep >= 6.0 {
        DayStatus::GoWithConstraints
    } else if overload_score >= 80 || readiness < 40 || sleep < 5.0 {
        DayStatus::Recover
    } else {
        DayStatus::Redirect
    }
}

fn lift_constraints(flags: &[&OverloadFlag]) -> Vec<LiftConstraint> {
    let mut by_lift: BTreeMap<&str, LiftConstraint> = BTreeMap::new();
    for flag in flags {
        let entry = by_lift
            .entry(flag.exercise.as_str())
            .or_insert_with(|| LiftConstraint {
                exercise: flag.exercise.clone(),
                constraints: Vec::new(),
                why: Vec::new(),
                severity: 0,
            });
        for constraint in constraints_for(flag.flag_type) {
            if !entry.constraints.iter().any(|c| c == constraint) {
                entry.constraints.push(constraint.to_string());
            }
        }
        if !entry.why.contains(&flag.flag_type) {
            entry.why.push(flag.flag_type);
        }
        entry.severity = entry.severity.max(flag.severity);
    }
    by_lift.into_values().collect()
}

/// Build the plan for one day
///
/// `flags` may hold the whole history; only flags dated on the record's day
/// are used. A sick check-in forces `RECOVER`.
pub fn build_day_plan(
    record: &ReadinessRecord,
    day: &DailyMetrics,
    overload: &DailyOverloadRecord,
    flags: &[OverloadFlag],
) -> DayPlan {
    let todays: Vec<&OverloadFlag> = flags.iter().filter(|f| f.date == record.date).collect();
    let wellness = day.wellness.as_ref();
    let status = if wellness.map_or(false, |w| w.sick) {
        DayStatus::Recover
    } else {
        day_status(
            record.readiness_score,
            overload.overload_score,
            day.acwr_7_28.unwrap_or(DEFAULT_ACWR),
            day.sleep_hours.unwrap_or(DEFAULT_SLEEP),
        )
    };

    DayPlan {
        date: record.date,
        day_status: status,
        readiness_score: record.readiness_score,
        overload_score: overload.overload_score,
        reason_codes: overload.overload_flags.clone(),
        affected_lifts: overload.overload_lifts.clone(),
        lift_constraints: lift_constraints(&todays),
        session: session_plan(record.readiness_score, wellness),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::overload::Evidence;

    #[test]
    fn test_day_status_rules() {
        assert_eq!(day_status(Some(85), 0, 1.0, 8.0), DayStatus::Go);
        assert_eq!(day_status(Some(85), 30, 1.0, 8.0), DayStatus::GoWithConstraints);
        assert_eq!(day_status(Some(85), 85, 1.0, 8.0), DayStatus::Recover);
        assert_eq!(day_status(Some(50), 0, 1.0, 8.0), DayStatus::Redirect);
        assert_eq!(day_status(Some(70), 0, 1.0, 4.5), DayStatus::Recover);
        assert_eq!(day_status(None, 0, 1.0, 8.0), DayStatus::Recover);
    }

    #[test]
    fn test_constraints_merge_per_lift() {
        let date = NaiveDate::from_ymd_opt(2024, 6, 3).unwrap();
        let flag = |exercise: &str, flag_type, severity| OverloadFlag {
            date,
            exercise: exercise.to_string(),
            flag_type,
            severity,
            evidence: Evidence::new(),
            recommendations: Vec::new(),
        };
        let flags = vec![
            flag("squat", FlagType::CnsCostRising, 22),
            flag("squat", FlagType::FixedLoadDrift, 20),
            flag("bench press", FlagType::HighVolatility, 10),
        ];
        let refs: Vec<&OverloadFlag> = flags.iter().collect();
        let merged = lift_constraints(&refs);

        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].exercise, "bench press");
        assert_eq!(merged[1].constraints, vec![
            "NO_RIR0",
            "TOP_SET_RIR>=2",
            "SWAP_VARIANT",
            "VOLUME_CAP_-20%",
        ]);
        assert_eq!(merged[1].why, vec![FlagType::CnsCostRising, FlagType::FixedLoadDrift]);
        assert_eq!(merged[1].severity, 22);
    }

    fn check_in() -> WellnessEntry {
        WellnessEntry::new(NaiveDate::from_ymd_opt(2024, 6, 3).unwrap(), 7.5, 4.0)
    }

    #[test]
    fn test_session_follows_readiness_band() {
        let push = session_plan(Some(85), None);
        assert_eq!(push.headline, "Push day: go for PRs");
        assert_eq!(push.target_rir.as_deref(), Some("1-2"));
        assert_eq!(push.rules.len(), 3);

        let low = session_plan(Some(50), Some(&check_in()));
        assert_eq!(low.volume_change.as_deref(), Some("-20% sets"));
        assert_eq!(low.rules.last().map(String::as_str), Some("Use a slower tempo"));
        assert_eq!(session_plan(None, None).target_rir.as_deref(), Some("3-5"));
    }

    #[test]
    fn test_pain_filters_movements_for_the_zone() {
        let mut entry = check_in();
        entry.pain_flag = true;
        entry.pain_location = Some("Left Shoulder".to_string());
        entry.fatigue = Some(8.0);
        entry.stiffness = Some(7.0);

        let plan = session_plan(Some(70), Some(&entry));
        assert_eq!(plan.pain_zone, Some(PainZone::Shoulder));
        assert!(plan.avoid.contains(&"bench press".to_string()));
        assert!(plan.allowed.contains(&"squat".to_string()));
        assert!(plan.rules.contains(&"Stop if pain in the shoulder gets worse".to_string()));
        assert!(plan.rules.contains(&"Cut volume by at least 30%".to_string()));
        assert!(plan.notes[0].starts_with("Add 15 min of warm-up"));

        assert_eq!(PainZone::from_location("lumbar"), PainZone::LowerBack);
        assert_eq!(PainZone::from_location("right wrist"), PainZone::ElbowWrist);
        assert_eq!(PainZone::from_location("hip"), PainZone::Other);
    }

    #[test]
    fn test_sick_day_overrides_plan_and_status() {
        let mut entry = check_in();
        entry.sick = true;
        let mut day = DailyMetrics::empty(entry.date);
        day.sleep_hours = Some(8.0);
        day.wellness = Some(entry);

        let engine = crate::readiness::DecisionEngine::new(crate::readiness::ReadinessVersion::WellnessV2);
        let mut record = engine.evaluate(&day, &DailyOverloadRecord::none(day.date));
        record.readiness_score = Some(90);
        let plan = build_day_plan(&record, &day, &DailyOverloadRecord::none(day.date), &[]);

        assert_eq!(plan.day_status, DayStatus::Recover);
        assert_eq!(plan.session.headline, "Sick: do not train");
        assert_eq!(plan.session.target_rir, None);
        assert_eq!(plan.session.rules[0], "Do not train");
    }

    #[test]
    fn test_cycle_advice_lands_in_notes() {
        let mut entry = check_in();
        entry.cycle_day = Some(9);
        let plan = session_plan(Some(82), Some(&entry));
        assert_eq!(plan.notes.len(), 2);
        assert!(plan.notes[0].contains("PR attempts"));
    }
}
