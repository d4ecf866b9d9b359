//! Daily and weekly load tables
//!
//! Builds the daily derived table the readiness engine reads: volume, rolling
//! acute/chronic load, ACWR, effort, a performance index over key lifts and a
//! fatigue flag. Rolling windows count training days, not calendar days.
//!
//! # Load metrics
//!
//! - **ACWR**: acute (7 sessions) over chronic (28 sessions) volume. Above 1.3-1.5
//!   is a spike; below 0.8 is undertraining.
//! - **Performance index**: each key-lift set's e1RM divided by that lift's
//!   all-time mean e1RM, averaged per day. 1.0 means a typical day.
//! - **Monotony**: weekly mean daily volume over its population std dev.
//! - **Strain**: weekly volume times monotony.

use crate::models::{normalize_exercise, DailyMetrics, TrainingSet, WeeklyLoad, WellnessEntry};
use crate::set_classifier::epley;
use crate::stats;
use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, warn};

/// Rolling-window and fatigue-flag settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DailyMetricsConfig {
    pub acute_window: usize,
    pub acute_min_periods: usize,
    pub chronic_window: usize,
    pub chronic_min_periods: usize,
    pub performance_window: usize,
    pub performance_min_periods: usize,

    /// Days with sleep needed before the fatigue flag is evaluated
    pub fatigue_min_sleep_days: usize,
    pub fatigue_volume_quantile: f64,
    pub fatigue_sleep_quantile: f64,

    /// Minimum days in a week for monotony
    pub monotony_min_days: usize,

    /// Lifts feeding the performance index; empty means every exercise
    pub key_lifts: Vec<String>,
}

impl Default for DailyMetricsConfig {
    fn default() -> Self {
        Self {
            acute_window: 7,
            acute_min_periods: 3,
            chronic_window: 28,
            chronic_min_periods: 10,
            performance_window: 7,
            performance_min_periods: 3,
            fatigue_min_sleep_days: 8,
            fatigue_volume_quantile: 0.75,
            fatigue_sleep_quantile: 0.25,
            monotony_min_days: 4,
            key_lifts: Vec::new(),
        }
    }
}

/// Whether logged RPE and RIR agree (|rpe - (10 - rir)| <= 0.75)
///
/// `None` unless both were logged.
pub fn intensity_coherent(set: &TrainingSet) -> Option<bool> {
    match (set.rpe, set.rir) {
        (Some(rpe), Some(rir)) => Some((rpe - (10.0 - rir)).abs() <= 0.75),
        _ => None,
    }
}

/// Sum over the trailing `window` values ending at `idx`, given `min_periods`
fn rolling_sum(values: &[f64], idx: usize, window: usize, min_periods: usize) -> Option<f64> {
    let start = (idx + 1).saturating_sub(window);
    let slice = &values[start..=idx];
    if slice.len() < min_periods {
        return None;
    }
    Some(slice.iter().sum())
}

/// Daily metrics builder
pub struct DailyMetricsBuilder {
    config: DailyMetricsConfig,
}

impl Default for DailyMetricsBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl DailyMetricsBuilder {
    pub fn new() -> Self {
        Self {
            config: DailyMetricsConfig::default(),
        }
    }

    pub fn with_config(config: DailyMetricsConfig) -> Self {
        Self { config }
    }

    fn is_key_lift(&self, exercise: &str) -> bool {
        self.config.key_lifts.is_empty()
            || self
                .config
                .key_lifts
                .iter()
                .any(|k| normalize_exercise(k) == exercise)
    }

    /// One row per training day, sorted by date
    pub fn build(&self, sets: &[TrainingSet], wellness: &[WellnessEntry]) -> Vec<DailyMetrics> {
        let cfg = &self.config;

        // Mean plain-Epley e1RM per key lift over the whole history
        let mut lift_e1rms: HashMap<&str, Vec<f64>> = HashMap::new();
        for set in sets.iter().filter(|s| self.is_key_lift(&s.exercise)) {
            if let Some(e) = epley(set.load, set.reps) {
                lift_e1rms.entry(set.exercise.as_str()).or_default().push(e);
            }
        }
        let lift_means: HashMap<&str, f64> = lift_e1rms
            .iter()
            .filter_map(|(ex, values)| stats::mean(values).map(|m| (*ex, m)))
            .filter(|(_, m)| *m > 0.0)
            .collect();

        let mut by_date: BTreeMap<NaiveDate, Vec<&TrainingSet>> = BTreeMap::new();
        for set in sets {
            by_date.entry(set.date).or_default().push(set);
        }
        let wellness_by_date: HashMap<NaiveDate, &WellnessEntry> =
            wellness.iter().map(|w| (w.date, w)).collect();

        let mut days: Vec<DailyMetrics> = by_date
            .iter()
            .map(|(date, day_sets)| {
                let mut row = DailyMetrics::empty(*date);
                row.volume = day_sets.iter().map(|s| s.volume()).sum();

                let efforts: Vec<f64> = day_sets.iter().filter_map(|s| s.effort()).collect();
                row.effort_mean = stats::mean(&efforts);
                row.rir_weighted = Self::weighted_rir(day_sets);

                let ratios: Vec<f64> = day_sets
                    .iter()
                    .filter_map(|s| {
                        let mean = lift_means.get(s.exercise.as_str())?;
                        epley(s.load, s.reps).map(|e| e / mean)
                    })
                    .collect();
                row.performance_index = stats::mean(&ratios);

                if let Some(w) = wellness_by_date.get(date) {
                    row.sleep_hours = Some(w.sleep_hours);
                    row.sleep_quality = Some(w.sleep_quality);
                    row.perceived_readiness = w.perceived_readiness;
                    row.wellness = Some((*w).clone());
                }
                row
            })
            .collect();

        let volumes: Vec<f64> = days.iter().map(|d| d.volume).collect();
        let pis: Vec<Option<f64>> = days.iter().map(|d| d.performance_index).collect();

        for (idx, day) in days.iter_mut().enumerate() {
            day.volume_7d = rolling_sum(&volumes, idx, cfg.acute_window, cfg.acute_min_periods);
            day.volume_28d = rolling_sum(&volumes, idx, cfg.chronic_window, cfg.chronic_min_periods);
            day.acwr_7_28 = match (day.volume_7d, day.volume_28d) {
                (Some(acute), Some(chronic)) if chronic > 0.0 => Some(acute / chronic),
                _ => None,
            };

            let start = (idx + 1).saturating_sub(cfg.performance_window);
            let recent: Vec<f64> = pis[start..=idx].iter().flatten().copied().collect();
            if recent.len() >= cfg.performance_min_periods {
                day.performance_7d_mean = stats::mean(&recent);
            }
        }

        self.apply_fatigue_flag(&mut days);

        debug!(days = days.len(), "built daily metrics");
        days
    }

    fn weighted_rir(day_sets: &[&TrainingSet]) -> Option<f64> {
        let pairs: Vec<(f64, f64)> = day_sets
            .iter()
            .filter_map(|s| s.effective_rir().map(|rir| (rir, s.volume())))
            .collect();
        if pairs.is_empty() {
            return None;
        }
        let total: f64 = pairs.iter().map(|(_, v)| v).sum();
        if total <= 0.0 {
            let rirs: Vec<f64> = pairs.iter().map(|(r, _)| *r).collect();
            return stats::mean(&rirs);
        }
        Some(pairs.iter().map(|(r, v)| r * v).sum::<f64>() / total)
    }

    fn apply_fatigue_flag(&self, days: &mut [DailyMetrics]) {
        let cfg = &self.config;
        let with_sleep: Vec<(f64, f64)> = days
            .iter()
            .filter_map(|d| d.sleep_hours.map(|s| (d.volume, s)))
            .collect();

        if with_sleep.len() < cfg.fatigue_min_sleep_days {
            warn!(
                sleep_days = with_sleep.len(),
                required = cfg.fatigue_min_sleep_days,
                "not enough sleep history for the fatigue flag"
            );
            return;
        }

        let volumes: Vec<f64> = with_sleep.iter().map(|(v, _)| *v).collect();
        let sleeps: Vec<f64> = with_sleep.iter().map(|(_, s)| *s).collect();
        let (Some(v_hi), Some(s_lo)) = (
            stats::percentile(&volumes, cfg.fatigue_volume_quantile),
            stats::percentile(&sleeps, cfg.fatigue_sleep_quantile),
        ) else {
            return;
        };

        for day in days.iter_mut() {
            day.fatigue_flag = day.sleep_hours.map_or(false, |s| day.volume >= v_hi && s <= s_lo);
        }
    }

    /// Weekly load table (Monday week start), sorted by week
    pub fn weekly(&self, daily: &[DailyMetrics]) -> Vec<WeeklyLoad> {
        let mut weeks: BTreeMap<NaiveDate, Vec<&DailyMetrics>> = BTreeMap::new();
        for day in daily {
            let monday = day.date - Duration::days(day.date.weekday().num_days_from_monday() as i64);
            weeks.entry(monday).or_default().push(day);
        }

        weeks
            .into_iter()
            .map(|(week_start, days)| {
                let volumes: Vec<f64> = days.iter().map(|d| d.volume).collect();
                let volume_week: f64 = volumes.iter().sum();
                let efforts: Vec<f64> = days.iter().filter_map(|d| d.effort_mean).collect();
                let rirs: Vec<f64> = days.iter().filter_map(|d| d.rir_weighted).collect();

                let monotony = if days.len() >= self.config.monotony_min_days {
                    match (stats::mean(&volumes), stats::population_std(&volumes)) {
                        (Some(mean), Some(std)) if std > 0.0 => Some(mean / std),
                        _ => None,
                    }
                } else {
                    None
                };

                WeeklyLoad {
                    week_start,
                    days: days.len() as u32,
                    volume_week,
                    effort_week_mean: stats::mean(&efforts),
                    rir_week_mean: stats::mean(&rirs),
                    monotony,
                    strain: monotony.map(|m| volume_week * m),
                }
            })
            .collect()
    }
}

/// Number of trailing days (ending at `date`) whose weekly strain exceeds `strain_p75`
///
/// Used by the injury-risk score; a day inherits its week's strain.
pub fn consecutive_high_strain_days(
    daily: &[DailyMetrics],
    weekly: &[WeeklyLoad],
    date: NaiveDate,
    strain_p75: Option<f64>,
) -> u32 {
    let Some(limit) = strain_p75 else {
        return 0;
    };
    let week_strain: HashMap<NaiveDate, Option<f64>> =
        weekly.iter().map(|w| (w.week_start, w.strain)).collect();

    let mut count = 0;
    for day in daily.iter().rev().filter(|d| d.date <= date) {
        let monday = day.date - Duration::days(day.date.weekday().num_days_from_monday() as i64);
        match week_strain.get(&monday).copied().flatten() {
            Some(strain) if strain > limit => count += 1,
            _ => break,
        }
    }
    count
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(day: i64) -> NaiveDate {
        // 2024-01-01 is a Monday
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap() + Duration::days(day)
    }

    fn set(day: i64, exercise: &str, load: f64, reps: u32, rir: f64) -> TrainingSet {
        TrainingSet {
            date: date(day),
            exercise: exercise.to_string(),
            set_index: 0,
            sets: 1,
            reps,
            load,
            rpe: Some(10.0 - rir),
            rir: Some(rir),
        }
    }

    #[test]
    fn test_rolling_windows_need_min_periods() {
        let sets: Vec<TrainingSet> = (0..12).map(|d| set(d, "squat", 100.0, 5, 2.0)).collect();
        let daily = DailyMetricsBuilder::new().build(&sets, &[]);

        assert_eq!(daily.len(), 12);
        assert!(daily[1].volume_7d.is_none());
        assert_eq!(daily[2].volume_7d, Some(1500.0));
        assert_eq!(daily[8].volume_7d, Some(3500.0));
        assert!(daily[8].volume_28d.is_none());
        assert_eq!(daily[9].volume_28d, Some(5000.0));
        assert!((daily[9].acwr_7_28.unwrap() - 0.7).abs() < 1e-9);
    }

    #[test]
    fn test_weighted_rir_and_effort() {
        let sets = vec![set(0, "squat", 100.0, 5, 1.0), set(0, "curl", 20.0, 5, 4.0)];
        let daily = DailyMetricsBuilder::new().build(&sets, &[]);
        // (1*500 + 4*100) / 600
        assert!((daily[0].rir_weighted.unwrap() - 1.5).abs() < 1e-9);
        assert!((daily[0].effort_mean.unwrap() - 7.5).abs() < 1e-9);
    }

    #[test]
    fn test_performance_index_uses_key_lifts_only() {
        let config = DailyMetricsConfig {
            key_lifts: vec!["Squat".to_string()],
            ..DailyMetricsConfig::default()
        };
        let sets = vec![
            set(0, "squat", 100.0, 5, 2.0),
            set(1, "squat", 110.0, 5, 2.0),
            set(2, "curl", 20.0, 10, 2.0),
        ];
        let daily = DailyMetricsBuilder::with_config(config).build(&sets, &[]);
        let pi0 = daily[0].performance_index.unwrap();
        let pi1 = daily[1].performance_index.unwrap();
        assert!((pi0 + pi1 - 2.0).abs() < 1e-9);
        assert!(pi1 > 1.0);
        assert!(daily[2].performance_index.is_none());
    }

    #[test]
    fn test_fatigue_flag_needs_sleep_history() {
        let sets: Vec<TrainingSet> = (0..10)
            .map(|d| set(d, "squat", 100.0 + d as f64 * 10.0, 5, 2.0))
            .collect();
        let short: Vec<WellnessEntry> = (0..5).map(|d| WellnessEntry::new(date(d), 7.5, 4.0)).collect();
        let daily = DailyMetricsBuilder::new().build(&sets, &short);
        assert!(daily.iter().all(|d| !d.fatigue_flag));

        let long: Vec<WellnessEntry> = (0..10)
            .map(|d| WellnessEntry::new(date(d), if d == 9 { 5.0 } else { 7.0 + d as f64 * 0.1 }, 4.0))
            .collect();
        let daily = DailyMetricsBuilder::new().build(&sets, &long);
        // Heaviest day coincides with the worst night
        assert!(daily[9].fatigue_flag);
        assert_eq!(daily.iter().filter(|d| d.fatigue_flag).count(), 1);
    }

    #[test]
    fn test_weekly_monotony_and_strain() {
        let volumes = [1000.0, 2000.0, 1000.0, 2000.0];
        let sets: Vec<TrainingSet> = volumes
            .iter()
            .enumerate()
            .map(|(d, v)| set(d as i64, "squat", v / 5.0, 5, 2.0))
            .collect();
        let builder = DailyMetricsBuilder::new();
        let weekly = builder.weekly(&builder.build(&sets, &[]));

        assert_eq!(weekly.len(), 1);
        assert_eq!(weekly[0].week_start, date(0));
        assert_eq!(weekly[0].volume_week, 6000.0);
        // mean 1500, population std 500
        assert!((weekly[0].monotony.unwrap() - 3.0).abs() < 1e-9);
        assert!((weekly[0].strain.unwrap() - 18000.0).abs() < 1e-6);
    }

    #[test]
    fn test_flat_week_has_no_monotony() {
        let sets: Vec<TrainingSet> = (0..5).map(|d| set(d, "squat", 100.0, 5, 2.0)).collect();
        let builder = DailyMetricsBuilder::new();
        let weekly = builder.weekly(&builder.build(&sets, &[]));
        assert!(weekly[0].monotony.is_none());
        assert!(weekly[0].strain.is_none());
    }

    #[test]
    fn test_intensity_coherence() {
        let mut s = set(0, "squat", 100.0, 5, 2.0);
        assert_eq!(intensity_coherent(&s), Some(true));
        s.rpe = Some(6.5);
        assert_eq!(intensity_coherent(&s), Some(false));
        s.rir = None;
        assert_eq!(intensity_coherent(&s), None);
    }
}
