//! Per-exercise overload detection across the whole history
//!
//! Exercises are independent, so each one is analysed on its own rayon task.
//! The merged flags are re-sorted to keep output deterministic.

use super::advanced::classify_advanced;
use super::thresholds::OverloadThresholds;
use super::{OverloadFlag, OverloadSettings, OverloadStrategy, OverloadVersion};
use crate::models::{normalize_exercise, ExerciseDaySummary, TopSet};
use rayon::prelude::*;
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Flags plus the advanced classification used to produce them
#[derive(Debug, Clone, Default)]
pub struct OverloadReport {
    /// Sorted by (date, exercise, rule order)
    pub flags: Vec<OverloadFlag>,
    pub advanced: BTreeMap<String, bool>,
}

impl OverloadReport {
    pub fn advanced_lifts(&self) -> Vec<&str> {
        self.advanced
            .iter()
            .filter(|(_, adv)| **adv)
            .map(|(ex, _)| ex.as_str())
            .collect()
    }
}

/// Overload detector bound to one rule-set version
pub struct OverloadDetector {
    strategy: Box<dyn OverloadStrategy>,
    regular: OverloadThresholds,
    advanced: OverloadThresholds,
    key_lifts: Vec<String>,
}

impl OverloadDetector {
    /// Detector with the version's own presets
    pub fn new(version: OverloadVersion) -> Self {
        let strategy = version.strategy();
        Self {
            regular: strategy.thresholds(),
            advanced: strategy.advanced_thresholds(),
            strategy,
            key_lifts: Vec::new(),
        }
    }

    /// Detector configured from settings, honouring threshold overrides
    pub fn from_settings(settings: &OverloadSettings) -> Self {
        let mut detector = Self::new(settings.version).with_key_lifts(settings.key_lifts.clone());
        if let Some(regular) = &settings.thresholds {
            detector.regular = regular.clone();
        }
        if let Some(advanced) = &settings.advanced_thresholds {
            detector.advanced = advanced.clone();
        }
        detector
    }

    pub fn with_thresholds(mut self, regular: OverloadThresholds, advanced: OverloadThresholds) -> Self {
        self.regular = regular;
        self.advanced = advanced;
        self
    }

    /// Restrict detection to these exercises; empty means all
    pub fn with_key_lifts(mut self, key_lifts: Vec<String>) -> Self {
        self.key_lifts = key_lifts.iter().map(|l| normalize_exercise(l)).collect();
        self
    }

    pub fn version(&self) -> OverloadVersion {
        self.strategy.version()
    }

    pub fn thresholds(&self) -> &OverloadThresholds {
        &self.regular
    }

    /// Detect flags for every exercise in the summary table
    ///
    /// Rows without a complete top set are skipped.
    pub fn detect(&self, summaries: &[ExerciseDaySummary]) -> OverloadReport {
        let mut by_exercise: BTreeMap<&str, Vec<TopSet>> = BTreeMap::new();
        for row in summaries {
            if !self.is_key_lift(&row.exercise) {
                continue;
            }
            if let Some(top) = row.top_set() {
                by_exercise.entry(row.exercise.as_str()).or_default().push(top);
            }
        }
        for rows in by_exercise.values_mut() {
            rows.sort_by_key(|r| r.date);
        }

        let results: Vec<(String, bool, Vec<OverloadFlag>)> = by_exercise
            .par_iter()
            .map(|(exercise, rows)| {
                let is_advanced = classify_advanced(
                    rows,
                    self.regular.min_sessions_advanced,
                    self.regular.cv_advanced,
                );
                let thresholds = if is_advanced { &self.advanced } else { &self.regular };
                let flags = self.strategy.analyze(exercise, rows, thresholds, is_advanced);
                debug!(
                    exercise = *exercise,
                    sessions = rows.len(),
                    is_advanced,
                    flags = flags.len(),
                    "analysed exercise"
                );
                (exercise.to_string(), is_advanced, flags)
            })
            .collect();

        let mut report = OverloadReport::default();
        for (exercise, is_advanced, flags) in results {
            report.advanced.insert(exercise, is_advanced);
            report.flags.extend(flags);
        }
        report.flags.sort_by(|a, b| {
            (a.date, &a.exercise, a.flag_type).cmp(&(b.date, &b.exercise, b.flag_type))
        });

        info!(
            version = %self.version(),
            exercises = report.advanced.len(),
            flags = report.flags.len(),
            "overload detection complete"
        );
        report
    }

    fn is_key_lift(&self, exercise: &str) -> bool {
        self.key_lifts.is_empty() || self.key_lifts.iter().any(|k| k == exercise)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::overload::FlagType;
    use chrono::{Duration, NaiveDate};

    fn summary(day: i64, exercise: &str, load: f64, reps: u32, rir: f64) -> ExerciseDaySummary {
        let e1rm = load * (1.0 + (reps as f64 + rir * 0.5) / 30.0);
        ExerciseDaySummary {
            date: NaiveDate::from_ymd_opt(2024, 2, 1).unwrap() + Duration::days(day),
            exercise: exercise.to_string(),
            top_load: Some(load),
            top_reps: Some(reps),
            top_rir: Some(rir),
            top_rpe: Some(10.0 - rir),
            top_e1rm: Some(e1rm),
            backoff_volume: 0.0,
            backoff_mean_load_pct: None,
            n_sets_total: 3,
            n_sets_hard: 1,
        }
    }

    #[test]
    fn test_short_history_yields_no_flags() {
        let rows = vec![
            summary(0, "squat", 140.0, 3, 0.0),
            summary(2, "squat", 140.0, 3, 0.0),
        ];
        let report = OverloadDetector::new(OverloadVersion::V2).detect(&rows);
        assert!(report.flags.is_empty());
        assert_eq!(report.advanced.get("squat"), Some(&false));
    }

    #[test]
    fn test_rows_without_top_set_are_skipped() {
        let mut empty = summary(0, "squat", 100.0, 5, 2.0);
        empty.top_load = None;
        empty.top_e1rm = None;
        let report = OverloadDetector::new(OverloadVersion::V2).detect(&[empty]);
        assert!(report.advanced.is_empty());
    }

    #[test]
    fn test_key_lift_filter() {
        let mut rows = Vec::new();
        for day in 0..6 {
            rows.push(summary(day * 2, "squat", 140.0, 3, 0.0));
            rows.push(summary(day * 2, "curl", 20.0, 10, 0.0));
        }
        let detector = OverloadDetector::new(OverloadVersion::V2).with_key_lifts(vec!["Squat".into()]);
        let report = detector.detect(&rows);
        assert!(!report.flags.is_empty());
        assert!(report.flags.iter().all(|f| f.exercise == "squat"));
    }

    #[test]
    fn test_flags_sorted_and_parallel_deterministic() {
        let mut rows = Vec::new();
        for day in 0..8 {
            for ex in ["bench press", "deadlift", "squat"] {
                rows.push(summary(day * 2, ex, 100.0, 3, 0.0));
            }
        }
        let detector = OverloadDetector::new(OverloadVersion::V2);
        let first = detector.detect(&rows);
        let second = detector.detect(&rows);
        assert_eq!(first.flags, second.flags);

        for pair in first.flags.windows(2) {
            let a = (pair[0].date, &pair[0].exercise, pair[0].flag_type);
            let b = (pair[1].date, &pair[1].exercise, pair[1].flag_type);
            assert!(a <= b);
        }
        assert!(first
            .flags
            .iter()
            .any(|f| f.flag_type == FlagType::SustainedNearFailure));
    }

    #[test]
    fn test_threshold_override_from_settings() {
        let settings = OverloadSettings {
            thresholds: Some(OverloadThresholds::v2().with_window(3)),
            ..OverloadSettings::default()
        };
        let detector = OverloadDetector::from_settings(&settings);
        assert_eq!(detector.thresholds().window_sessions, 3);
        assert_eq!(detector.version(), OverloadVersion::V2);
    }
}
