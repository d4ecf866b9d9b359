//! Automatic set classification
//!
//! Labels every logged set of one exercise on one day as WARMUP, TOP, BACKOFF,
//! WORK or UNKNOWN. The athlete never tags sets; the role is inferred from the
//! session itself.
//!
//! # Strength Training Background
//!
//! - **Top set**: the heaviest effort of the session, identified by its estimated
//!   one-rep max (e1RM) rather than raw load so that 100kg x 5 beats 102.5kg x 1.
//! - **Warm-up sets**: light ramp-up sets before the top set, usually far from failure.
//! - **Back-off sets**: volume work after the top set at a reduced load (typically 7-15% off).
//! - **Work sets**: everything else that is neither a ramp-up nor a planned drop.
//!
//! The e1RM uses a RIR-adjusted Epley estimate: reps left in reserve are counted
//! at half weight, since RIR is itself an estimate.

use crate::models::{ClassifiedSet, SetRole, TrainingSet};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

/// Thresholds for set classification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SetClassifierConfig {
    /// Maximum load ratio vs the top set for a warm-up (0.70 = 70%)
    pub warmup_threshold: f64,

    /// Minimum load drop vs the top set for a back-off (0.07 = 7%)
    pub backoff_drop_pct: f64,

    /// Sets after the top set within this intensity margin are also TOP
    pub multi_top_within_pct: f64,

    /// Minimum number of logged sets needed to classify a session
    pub min_sets_for_detection: u32,

    /// Typical minimum RIR of a warm-up set
    pub warmup_min_rir: f64,

    /// Maximum intensity score of a warm-up set
    pub warmup_max_intensity: f64,
}

impl Default for SetClassifierConfig {
    fn default() -> Self {
        Self {
            warmup_threshold: 0.70,
            backoff_drop_pct: 0.07,
            multi_top_within_pct: 0.02,
            min_sets_for_detection: 2,
            warmup_min_rir: 3.0,
            warmup_max_intensity: 0.65,
        }
    }
}

/// RIR-adjusted Epley estimate
///
/// `e1RM = load x (1 + (reps + max(rir, 0) x 0.5) / 30)`. RIR falls back to
/// `10 - rpe`; with neither, plain Epley. Returns `None` for non-positive load or reps.
pub fn estimate_e1rm(load: f64, reps: u32, rir: Option<f64>, rpe: Option<f64>) -> Option<f64> {
    if load <= 0.0 || reps == 0 {
        return None;
    }

    let effective_rir = rir.or_else(|| rpe.map(|rpe| 10.0 - rpe)).map(|r| r.max(0.0));
    let reps_effective = reps as f64 + effective_rir.map_or(0.0, |r| r * 0.5);

    Some(load * (1.0 + reps_effective / 30.0))
}

/// Plain Epley estimate without effort adjustment
pub fn epley(load: f64, reps: u32) -> Option<f64> {
    estimate_e1rm(load, reps, None, None)
}

/// Intensity bonus for proximity to failure
///
/// RIR <= 1 -> 1.0, <= 2 -> 0.8, <= 3 -> 0.6, otherwise 0.4; unknown -> 0.5.
pub fn rir_bonus(rir: Option<f64>) -> f64 {
    match rir {
        None => 0.5,
        Some(r) if r <= 1.0 => 1.0,
        Some(r) if r <= 2.0 => 0.8,
        Some(r) if r <= 3.0 => 0.6,
        Some(_) => 0.4,
    }
}

/// Session-relative intensity: 45% load, 45% e1RM, 10% RIR bonus
pub fn intensity_score(
    load: f64,
    e1rm: Option<f64>,
    rir: Option<f64>,
    max_load: f64,
    max_e1rm: f64,
) -> f64 {
    if max_load <= 0.0 || max_e1rm <= 0.0 || load <= 0.0 {
        return 0.0;
    }
    let Some(e1rm) = e1rm else {
        return 0.0;
    };

    let load_norm = (load / max_load).min(1.0);
    let e1rm_norm = (e1rm / max_e1rm).min(1.0);
    (0.45 * load_norm + 0.45 * e1rm_norm + 0.10 * rir_bonus(rir)).clamp(0.0, 1.0)
}

/// Set classification engine
pub struct SetClassifier {
    config: SetClassifierConfig,
}

impl Default for SetClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl SetClassifier {
    /// Create classifier with default thresholds
    pub fn new() -> Self {
        Self {
            config: SetClassifierConfig::default(),
        }
    }

    /// Create classifier with custom thresholds
    pub fn with_config(config: SetClassifierConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SetClassifierConfig {
        &self.config
    }

    /// Classify every set, grouped by (date, exercise)
    ///
    /// Output is ordered by date, exercise, then set index.
    pub fn classify_all(&self, sets: &[TrainingSet]) -> Vec<ClassifiedSet> {
        let mut sessions: BTreeMap<(NaiveDate, &str), Vec<&TrainingSet>> = BTreeMap::new();
        for set in sets {
            sessions
                .entry((set.date, set.exercise.as_str()))
                .or_default()
                .push(set);
        }

        let mut classified = Vec::with_capacity(sets.len());
        for ((date, exercise), session) in sessions {
            let owned: Vec<TrainingSet> = session.into_iter().cloned().collect();
            let result = self.classify_session(&owned);
            debug!(
                %date,
                exercise,
                sets = result.len(),
                "classified session"
            );
            classified.extend(result);
        }
        classified
    }

    /// Classify the sets of one exercise on one day
    ///
    /// Never fails: a session without enough information is labelled UNKNOWN.
    pub fn classify_session(&self, sets: &[TrainingSet]) -> Vec<ClassifiedSet> {
        let mut ordered: Vec<&TrainingSet> = sets.iter().collect();
        ordered.sort_by_key(|s| s.set_index);

        let e1rms: Vec<Option<f64>> = ordered
            .iter()
            .map(|s| estimate_e1rm(s.load, s.reps, s.rir, s.rpe))
            .collect();

        let total_sets: u32 = ordered.iter().map(|s| s.sets).sum();
        let max_load = ordered.iter().map(|s| s.load).fold(0.0_f64, f64::max);

        if max_load <= 0.0 || total_sets < self.config.min_sets_for_detection {
            return ordered
                .iter()
                .zip(&e1rms)
                .map(|(s, e1rm)| ClassifiedSet {
                    set: (*s).clone(),
                    role: SetRole::Unknown,
                    e1rm: *e1rm,
                    intensity_score: 0.0,
                    is_primary_top: false,
                })
                .collect();
        }

        let max_e1rm = e1rms
            .iter()
            .flatten()
            .copied()
            .fold(None, |acc: Option<f64>, v| Some(acc.map_or(v, |a| a.max(v))))
            .filter(|v| *v > 0.0)
            .unwrap_or(max_load * 1.2);

        let intensities: Vec<f64> = ordered
            .iter()
            .zip(&e1rms)
            .map(|(s, e1rm)| intensity_score(s.load, *e1rm, s.effective_rir(), max_load, max_e1rm))
            .collect();

        let primary = Self::primary_top_index(&ordered, &e1rms);
        let top = ordered[primary];
        let top_threshold = intensities[primary] * (1.0 - self.config.multi_top_within_pct);

        ordered
            .iter()
            .enumerate()
            .map(|(pos, s)| {
                let role = if pos == primary {
                    SetRole::Top
                } else if s.load <= 0.0 {
                    SetRole::Unknown
                } else if pos > primary && intensities[pos] >= top_threshold {
                    SetRole::Top
                } else {
                    self.role_relative_to_top(s, top, intensities[pos], pos < primary)
                };

                ClassifiedSet {
                    set: (*s).clone(),
                    role,
                    e1rm: e1rms[pos],
                    intensity_score: intensities[pos],
                    is_primary_top: pos == primary,
                }
            })
            .collect()
    }

    /// Max e1RM, then max load, then earliest position
    fn primary_top_index(ordered: &[&TrainingSet], e1rms: &[Option<f64>]) -> usize {
        let mut best = 0usize;
        for pos in 1..ordered.len() {
            let (cand, cur) = (ordered[pos], ordered[best]);
            if cand.load <= 0.0 {
                continue;
            }
            if cur.load <= 0.0 {
                best = pos;
                continue;
            }
            let better = match (e1rms[pos], e1rms[best]) {
                (Some(c), Some(b)) if (c - b).abs() > 1e-9 => c > b,
                (Some(_), None) => true,
                (None, Some(_)) => false,
                _ => cand.load > cur.load + 1e-9,
            };
            if better {
                best = pos;
            }
        }
        best
    }

    fn role_relative_to_top(
        &self,
        set: &TrainingSet,
        top: &TrainingSet,
        intensity: f64,
        before_top: bool,
    ) -> SetRole {
        let load_ratio = set.load / top.load;

        if before_top {
            let high_rir = set
                .effective_rir()
                .map_or(false, |rir| rir >= self.config.warmup_min_rir);
            let light = intensity < self.config.warmup_max_intensity;
            if load_ratio <= self.config.warmup_threshold && (high_rir || light) {
                return SetRole::Warmup;
            }
            return SetRole::Work;
        }

        if load_ratio < 1.0 - self.config.backoff_drop_pct
            && (intensity >= self.config.warmup_max_intensity || set.reps >= top.reps)
        {
            return SetRole::Backoff;
        }
        SetRole::Work
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, 6).unwrap()
    }

    fn set(index: u32, load: f64, reps: u32, rir: Option<f64>) -> TrainingSet {
        TrainingSet {
            date: date(),
            exercise: "squat".to_string(),
            set_index: index,
            sets: 1,
            reps,
            load,
            rpe: rir.map(|r| 10.0 - r),
            rir,
        }
    }

    fn roles(result: &[ClassifiedSet]) -> Vec<SetRole> {
        result.iter().map(|c| c.role).collect()
    }

    #[test]
    fn test_estimate_e1rm() {
        // 100 x (1 + (5 + 2*0.5)/30) = 120
        let e = estimate_e1rm(100.0, 5, Some(2.0), None).unwrap();
        assert!((e - 120.0).abs() < 1e-9);

        // RPE fallback: rpe 8 -> rir 2
        let e = estimate_e1rm(100.0, 5, None, Some(8.0)).unwrap();
        assert!((e - 120.0).abs() < 1e-9);

        let plain = epley(100.0, 3).unwrap();
        assert!((plain - 110.0).abs() < 1e-9);

        assert!(estimate_e1rm(0.0, 5, None, None).is_none());
        assert!(estimate_e1rm(100.0, 0, None, None).is_none());
    }

    #[test]
    fn test_rir_bonus_ladder() {
        assert_eq!(rir_bonus(Some(0.0)), 1.0);
        assert_eq!(rir_bonus(Some(2.0)), 0.8);
        assert_eq!(rir_bonus(Some(3.0)), 0.6);
        assert_eq!(rir_bonus(Some(5.0)), 0.4);
        assert_eq!(rir_bonus(None), 0.5);
    }

    #[test]
    fn test_classic_pyramid_session() {
        let sets = vec![
            set(0, 60.0, 5, Some(5.0)),
            set(1, 80.0, 3, Some(4.0)),
            set(2, 120.0, 3, Some(1.0)),
            set(3, 100.0, 6, Some(2.0)),
            set(4, 100.0, 6, Some(2.0)),
        ];

        let result = SetClassifier::new().classify_session(&sets);
        assert_eq!(
            roles(&result),
            vec![
                SetRole::Warmup,
                SetRole::Warmup,
                SetRole::Top,
                SetRole::Backoff,
                SetRole::Backoff
            ]
        );
        assert!(result[2].is_primary_top);
        assert_eq!(result.iter().filter(|c| c.is_primary_top).count(), 1);
    }

    #[test]
    fn test_single_set_is_unknown() {
        let result = SetClassifier::new().classify_session(&[set(0, 100.0, 5, Some(2.0))]);
        assert_eq!(roles(&result), vec![SetRole::Unknown]);
        assert!(result[0].e1rm.is_some());
    }

    #[test]
    fn test_single_row_with_multiple_sets_is_top() {
        let mut row = set(0, 100.0, 5, Some(2.0));
        row.sets = 3;
        let result = SetClassifier::new().classify_session(&[row]);
        assert_eq!(roles(&result), vec![SetRole::Top]);
    }

    #[test]
    fn test_zero_load_session_is_unknown() {
        let sets = vec![set(0, 0.0, 10, None), set(1, 0.0, 12, None)];
        let result = SetClassifier::new().classify_session(&sets);
        assert!(result.iter().all(|c| c.role == SetRole::Unknown));
    }

    #[test]
    fn test_tie_break_prefers_heavier_then_earlier() {
        // Same e1RM: 100 x 5 @ RIR 2 = 120; 120 x 0 reps impossible, so use identical sets
        let sets = vec![set(0, 100.0, 5, Some(2.0)), set(1, 100.0, 5, Some(2.0))];
        let result = SetClassifier::new().classify_session(&sets);
        assert!(result[0].is_primary_top);
        // The repeat lands within the multi-top margin
        assert_eq!(roles(&result), vec![SetRole::Top, SetRole::Top]);
    }

    #[test]
    fn test_light_set_after_top_is_work_not_warmup() {
        let sets = vec![
            set(0, 140.0, 2, Some(1.0)),
            set(1, 135.0, 2, Some(2.0)),
        ];
        let result = SetClassifier::new().classify_session(&sets);
        assert_eq!(result[0].role, SetRole::Top);
        // 135/140 = 0.964 is above the back-off drop line
        assert_eq!(result[1].role, SetRole::Work);
    }

    #[test]
    fn test_classify_all_groups_by_exercise() {
        let mut bench = set(0, 80.0, 5, Some(2.0));
        bench.exercise = "bench press".to_string();
        let mut bench2 = set(1, 70.0, 8, Some(2.0));
        bench2.exercise = "bench press".to_string();

        let sets = vec![set(0, 120.0, 3, Some(1.0)), bench, set(1, 100.0, 6, Some(2.0)), bench2];
        let result = SetClassifier::new().classify_all(&sets);

        assert_eq!(result.len(), 4);
        assert_eq!(result[0].set.exercise, "bench press");
        assert_eq!(result[0].role, SetRole::Top);
        assert_eq!(result[1].role, SetRole::Backoff);
        assert_eq!(result[2].set.exercise, "squat");
        assert_eq!(result[2].role, SetRole::Top);
    }
}
