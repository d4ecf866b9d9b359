//! Core data records shared across the engine.
//!
//! Every record here is an immutable input or a derived output of a pure
//! transform. Optional fields are `Option<T>`; absence means "no data", never zero.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Normalize an exercise name for grouping: trimmed, lowercase, single spaces
pub fn normalize_exercise(name: &str) -> String {
    name.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// One logged set-group for an exercise on a given day
///
/// `sets` is the multiplicity of the row: a row with `sets = 3` stands for three
/// identical sets at the same load, reps and effort.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingSet {
    /// Training date
    pub date: NaiveDate,

    /// Normalized exercise name
    pub exercise: String,

    /// Position of the row within its (date, exercise) group, starting at 0
    pub set_index: u32,

    /// Number of identical sets this row represents
    pub sets: u32,

    /// Repetitions per set
    pub reps: u32,

    /// External load in kilograms
    pub load: f64,

    /// Rate of perceived exertion (1-10)
    pub rpe: Option<f64>,

    /// Reps in reserve (0-10)
    pub rir: Option<f64>,
}

impl TrainingSet {
    /// Reps in reserve, falling back to `10 - rpe` when only RPE was logged
    pub fn effective_rir(&self) -> Option<f64> {
        match (self.rir, self.rpe) {
            (Some(rir), _) => Some(rir),
            (None, Some(rpe)) => Some((10.0 - rpe).max(0.0)),
            (None, None) => None,
        }
    }

    /// Effort on a 0-10 scale (`10 - rir`)
    pub fn effort(&self) -> Option<f64> {
        self.effective_rir().map(|rir| 10.0 - rir)
    }

    /// Tonnage for the row: sets x reps x load
    pub fn volume(&self) -> f64 {
        self.sets as f64 * self.reps as f64 * self.load
    }

    /// Whether this row counts as a hard set (RIR <= 2 or RPE >= 8)
    pub fn is_hard(&self) -> bool {
        self.rir.map_or(false, |rir| rir <= 2.0) || self.rpe.map_or(false, |rpe| rpe >= 8.0)
    }
}

/// Role of a set within one exercise session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SetRole {
    Warmup,
    Top,
    Backoff,
    Work,
    Unknown,
}

impl fmt::Display for SetRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SetRole::Warmup => "WARMUP",
            SetRole::Top => "TOP",
            SetRole::Backoff => "BACKOFF",
            SetRole::Work => "WORK",
            SetRole::Unknown => "UNKNOWN",
        };
        write!(f, "{}", label)
    }
}

/// A training set with its inferred role
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifiedSet {
    pub set: TrainingSet,
    pub role: SetRole,

    /// RIR-adjusted estimated one-rep max
    pub e1rm: Option<f64>,

    /// Relative intensity within the session (0-1)
    pub intensity_score: f64,

    /// True for the single reference TOP set of the session
    pub is_primary_top: bool,
}

/// One row per (date, exercise) reduced from classified sets
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExerciseDaySummary {
    pub date: NaiveDate,
    pub exercise: String,
    pub top_load: Option<f64>,
    pub top_reps: Option<u32>,
    pub top_rir: Option<f64>,
    pub top_rpe: Option<f64>,
    pub top_e1rm: Option<f64>,

    /// Sum of load x reps over BACKOFF sets
    pub backoff_volume: f64,

    /// Mean BACKOFF load as a fraction of the top load
    pub backoff_mean_load_pct: Option<f64>,

    pub n_sets_total: u32,
    pub n_sets_hard: u32,
}

impl ExerciseDaySummary {
    /// Top-set view used by the overload detector; `None` when the day had no TOP set
    pub fn top_set(&self) -> Option<TopSet> {
        Some(TopSet {
            date: self.date,
            load: self.top_load?,
            reps: self.top_reps?,
            rir: self.top_rir?,
            rpe: self.top_rpe.unwrap_or(10.0 - self.top_rir?),
            e1rm: self.top_e1rm?,
        })
    }
}

/// Fully populated top set of one session
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TopSet {
    pub date: NaiveDate,
    pub load: f64,
    pub reps: u32,
    pub rir: f64,
    pub rpe: f64,
    pub e1rm: f64,
}

/// Daily wellness self-report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WellnessEntry {
    pub date: NaiveDate,
    pub sleep_hours: f64,

    /// Sleep quality (1 = terrible, 5 = excellent)
    pub sleep_quality: f64,

    /// General fatigue (0-10)
    pub fatigue: Option<f64>,

    /// Muscle soreness (0-10)
    pub soreness: Option<f64>,

    /// Stress (0-10)
    pub stress: Option<f64>,

    /// Motivation (0-10)
    pub motivation: Option<f64>,

    pub pain_flag: bool,
    pub pain_location: Option<String>,

    /// Subjective readiness (0-10)
    pub perceived_readiness: Option<f64>,

    pub nap_minutes: Option<u32>,
    pub sleep_disruptions: bool,
    pub energy: Option<f64>,
    pub stiffness: Option<f64>,

    /// Caffeine intake (0 none .. 3 high)
    pub caffeine: Option<u8>,
    pub alcohol: bool,
    pub sick: bool,

    /// Day of the menstrual cycle (1 = first day of bleeding)
    pub cycle_day: Option<u8>,

    /// Cramping (0-5)
    pub cramping: Option<f64>,

    /// Bloating (0-5)
    pub bloating: Option<f64>,
}

impl WellnessEntry {
    /// Minimal entry with only the required sleep fields
    pub fn new(date: NaiveDate, sleep_hours: f64, sleep_quality: f64) -> Self {
        Self {
            date,
            sleep_hours,
            sleep_quality,
            fatigue: None,
            soreness: None,
            stress: None,
            motivation: None,
            pain_flag: false,
            pain_location: None,
            perceived_readiness: None,
            nap_minutes: None,
            sleep_disruptions: false,
            energy: None,
            stiffness: None,
            caffeine: None,
            alcohol: false,
            sick: false,
            cycle_day: None,
            cramping: None,
            bloating: None,
        }
    }
}

/// Daily derived table consumed by the decision engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyMetrics {
    pub date: NaiveDate,
    pub volume: f64,
    pub volume_7d: Option<f64>,
    pub volume_28d: Option<f64>,
    pub acwr_7_28: Option<f64>,
    pub rir_weighted: Option<f64>,
    pub effort_mean: Option<f64>,
    pub performance_index: Option<f64>,
    pub performance_7d_mean: Option<f64>,
    pub sleep_hours: Option<f64>,
    pub sleep_quality: Option<f64>,
    pub fatigue_flag: bool,
    pub perceived_readiness: Option<f64>,

    /// Wellness entry merged for this date, if any
    #[serde(skip)]
    pub wellness: Option<WellnessEntry>,
}

impl DailyMetrics {
    /// Empty row for a date with no derived values yet
    pub fn empty(date: NaiveDate) -> Self {
        Self {
            date,
            volume: 0.0,
            volume_7d: None,
            volume_28d: None,
            acwr_7_28: None,
            rir_weighted: None,
            effort_mean: None,
            performance_index: None,
            performance_7d_mean: None,
            sleep_hours: None,
            sleep_quality: None,
            fatigue_flag: false,
            perceived_readiness: None,
            wellness: None,
        }
    }
}

/// Weekly load summary with monotony and strain
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeeklyLoad {
    /// Monday of the ISO week
    pub week_start: NaiveDate,
    pub days: u32,
    pub volume_week: f64,
    pub effort_week_mean: Option<f64>,
    pub rir_week_mean: Option<f64>,
    pub monotony: Option<f64>,
    pub strain: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(rir: Option<f64>, rpe: Option<f64>) -> TrainingSet {
        TrainingSet {
            date: NaiveDate::from_ymd_opt(2024, 3, 4).unwrap(),
            exercise: "squat".to_string(),
            set_index: 0,
            sets: 3,
            reps: 5,
            load: 100.0,
            rpe,
            rir,
        }
    }

    #[test]
    fn test_normalize_exercise() {
        assert_eq!(normalize_exercise("  Bench   Press "), "bench press");
        assert_eq!(normalize_exercise("SQUAT"), "squat");
    }

    #[test]
    fn test_effective_rir_falls_back_to_rpe() {
        assert_eq!(set(Some(2.0), Some(9.0)).effective_rir(), Some(2.0));
        assert_eq!(set(None, Some(8.5)).effective_rir(), Some(1.5));
        assert_eq!(set(None, None).effective_rir(), None);
    }

    #[test]
    fn test_volume_and_hard_set() {
        let s = set(Some(3.0), Some(7.0));
        assert_eq!(s.volume(), 1500.0);
        assert!(!s.is_hard());
        assert!(set(Some(2.0), None).is_hard());
        assert!(set(None, Some(8.0)).is_hard());
    }

    #[test]
    fn test_set_role_display() {
        assert_eq!(SetRole::Backoff.to_string(), "BACKOFF");
        assert_eq!(SetRole::Unknown.to_string(), "UNKNOWN");
    }
}
