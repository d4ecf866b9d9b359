//! Exercise-day summaries
//!
//! Reduces classified sets to one row per (date, exercise) carrying the top
//! set, back-off volume and hard-set counts. These rows are the only input of
//! the overload detector.

use crate::models::{ClassifiedSet, ExerciseDaySummary, SetRole};
use crate::stats;
use chrono::NaiveDate;
use std::collections::BTreeMap;

/// Summarize classified sets, sorted by (date, exercise)
pub fn summarize(classified: &[ClassifiedSet]) -> Vec<ExerciseDaySummary> {
    let mut groups: BTreeMap<(NaiveDate, &str), Vec<&ClassifiedSet>> = BTreeMap::new();
    for cs in classified {
        groups
            .entry((cs.set.date, cs.set.exercise.as_str()))
            .or_default()
            .push(cs);
    }

    groups
        .into_iter()
        .map(|((date, exercise), sets)| summarize_group(date, exercise, &sets))
        .collect()
}

fn summarize_group(date: NaiveDate, exercise: &str, sets: &[&ClassifiedSet]) -> ExerciseDaySummary {
    let top = sets.iter().find(|cs| cs.is_primary_top);

    let top_load = top.map(|cs| cs.set.load);
    let backoff: Vec<&&ClassifiedSet> = sets.iter().filter(|cs| cs.role == SetRole::Backoff).collect();

    let backoff_volume = backoff.iter().map(|cs| cs.set.volume()).sum();
    let backoff_mean_load_pct = top_load.filter(|l| *l > 0.0).and_then(|top_load| {
        let ratios: Vec<f64> = backoff.iter().map(|cs| cs.set.load / top_load).collect();
        stats::mean(&ratios)
    });

    ExerciseDaySummary {
        date,
        exercise: exercise.to_string(),
        top_load,
        top_reps: top.map(|cs| cs.set.reps),
        top_rir: top.and_then(|cs| cs.set.effective_rir()),
        top_rpe: top.and_then(|cs| cs.set.rpe.or_else(|| cs.set.rir.map(|r| 10.0 - r))),
        top_e1rm: top.and_then(|cs| cs.e1rm),
        backoff_volume,
        backoff_mean_load_pct,
        n_sets_total: sets.iter().map(|cs| cs.set.sets).sum(),
        n_sets_hard: sets
            .iter()
            .filter(|cs| cs.set.is_hard())
            .map(|cs| cs.set.sets)
            .sum(),
    }
}
