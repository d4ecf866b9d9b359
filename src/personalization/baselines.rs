//! Personal baselines
//!
//! Percentiles of one user's own history. A metric with fewer than `min_days`
//! observations is left out entirely so callers read "unknown" rather than a
//! misleading zero.

use crate::models::{DailyMetrics, WeeklyLoad};
use crate::stats;
use serde::{Deserialize, Serialize};

/// Percentile summary of one metric
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonalBaseline {
    pub p25: f64,
    pub p50: f64,
    pub p75: f64,
    pub p90: f64,
    pub mean: f64,

    /// Sample standard deviation; absent with a single observation
    pub std: Option<f64>,
    pub n: usize,
}

impl PersonalBaseline {
    /// Summarize `values`, or `None` below `min_days` observations
    pub fn from_values(values: &[f64], min_days: usize) -> Option<Self> {
        if values.is_empty() || values.len() < min_days {
            return None;
        }
        Some(Self {
            p25: stats::percentile(values, 0.25)?,
            p50: stats::percentile(values, 0.50)?,
            p75: stats::percentile(values, 0.75)?,
            p90: stats::percentile(values, 0.90)?,
            mean: stats::mean(values)?,
            std: stats::sample_std(values),
            n: values.len(),
        })
    }
}

/// How much history the baselines were built from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataQuality {
    pub total_days: usize,
    pub sufficient: bool,
    pub min_required: usize,
}

/// Baselines for every tracked metric
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BaselineSet {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub readiness: Option<PersonalBaseline>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub volume: Option<PersonalBaseline>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sleep: Option<PersonalBaseline>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub acwr: Option<PersonalBaseline>,

    /// p75 of weekly strain, used to judge recent strain
    pub strain_p75: Option<f64>,
    pub data_quality: DataQuality,
}

impl BaselineSet {
    /// Personal median sleep, if known
    pub fn sleep_p50(&self) -> Option<f64> {
        self.sleep.as_ref().map(|b| b.p50)
    }
}

/// Personalization settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PersonalizationConfig {
    /// Observations required before a baseline is exposed
    pub min_days: usize,

    /// Weeks with strain required for `strain_p75`
    pub min_strain_weeks: usize,
}

impl Default for PersonalizationConfig {
    fn default() -> Self {
        Self {
            min_days: 7,
            min_strain_weeks: 2,
        }
    }
}

/// Compute baselines from the daily table, readiness history and weekly loads
pub fn calculate_baselines(
    daily: &[DailyMetrics],
    readiness_scores: &[f64],
    weekly: &[WeeklyLoad],
    config: &PersonalizationConfig,
) -> BaselineSet {
    let min_days = config.min_days;
    let volumes: Vec<f64> = daily.iter().map(|d| d.volume).collect();
    let sleeps: Vec<f64> = daily.iter().filter_map(|d| d.sleep_hours).collect();
    let acwrs: Vec<f64> = daily.iter().filter_map(|d| d.acwr_7_28).collect();
    let strains: Vec<f64> = weekly.iter().filter_map(|w| w.strain).collect();

    let strain_p75 = if strains.len() >= config.min_strain_weeks {
        stats::percentile(&strains, 0.75)
    } else {
        None
    };

    BaselineSet {
        readiness: PersonalBaseline::from_values(readiness_scores, min_days),
        volume: PersonalBaseline::from_values(&volumes, min_days),
        sleep: PersonalBaseline::from_values(&sleeps, min_days),
        acwr: PersonalBaseline::from_values(&acwrs, min_days),
        strain_p75,
        data_quality: DataQuality {
            total_days: daily.len(),
            sufficient: daily.len() >= min_days,
            min_required: min_days,
        },
    }
}

/// Readiness relative to the user's own history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadinessContext {
    pub label: String,
    pub short: String,
    pub delta: Option<f64>,
}

/// Compare today's score with the personal p50/p75
pub fn contextualize_readiness(score: u32, baselines: &BaselineSet) -> ReadinessContext {
    let readiness = match &baselines.readiness {
        Some(b) if baselines.data_quality.sufficient => b,
        _ => {
            return ReadinessContext {
                label: "Insufficient history".to_string(),
                short: "N/A".to_string(),
                delta: None,
            }
        }
    };

    let score = score as f64;
    let delta = score - readiness.p50;
    let (label, short) = if score >= readiness.p75 {
        (format!("High (p75: {:.0}, +{:.0})", readiness.p75, delta), "Push day")
    } else if score >= readiness.p50 {
        (format!("Normal (p50: {:.0}, {:+.0})", readiness.p50, delta), "Train as usual")
    } else {
        (format!("Low vs your median ({:.0}, {:+.0})", readiness.p50, delta), "Take care today")
    };

    ReadinessContext {
        label,
        short: short.to_string(),
        delta: Some(delta),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate};

    fn days(n: usize, with_sleep: usize) -> Vec<DailyMetrics> {
        let start = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        (0..n)
            .map(|i| {
                let mut d = DailyMetrics::empty(start + Duration::days(i as i64));
                d.volume = 1000.0 + i as f64 * 100.0;
                if i < with_sleep {
                    d.sleep_hours = Some(6.5 + (i % 3) as f64 * 0.5);
                }
                d
            })
            .collect()
    }

    #[test]
    fn test_baseline_present_iff_enough_samples() {
        let config = PersonalizationConfig::default();
        let set = calculate_baselines(&days(10, 6), &[], &[], &config);

        assert!(set.volume.is_some());
        assert!(set.sleep.is_none());
        assert!(set.readiness.is_none());
        assert!(set.acwr.is_none());
        assert!(set.data_quality.sufficient);

        let set = calculate_baselines(&days(10, 7), &[], &[], &config);
        assert_eq!(set.sleep.as_ref().map(|b| b.n), Some(7));
    }

    #[test]
    fn test_percentiles_are_linear() {
        let values: Vec<f64> = (1..=9).map(|v| v as f64 * 10.0).collect();
        let b = PersonalBaseline::from_values(&values, 7).unwrap();
        assert_eq!(b.p50, 50.0);
        assert_eq!(b.p25, 30.0);
        assert_eq!(b.p75, 70.0);
        assert!((b.p90 - 82.0).abs() < 1e-9);
        assert!(b.std.unwrap() > 0.0);
    }

    #[test]
    fn test_contextualize_readiness() {
        let config = PersonalizationConfig::default();
        let scores: Vec<f64> = vec![50.0, 55.0, 60.0, 65.0, 70.0, 75.0, 80.0];
        let set = calculate_baselines(&days(7, 0), &scores, &[], &config);

        let high = contextualize_readiness(85, &set);
        assert!(high.label.starts_with("High"));
        assert_eq!(high.delta, Some(20.0));

        let low = contextualize_readiness(40, &set);
        assert_eq!(low.short, "Take care today");

        let empty = calculate_baselines(&days(3, 0), &scores[..3], &[], &config);
        assert_eq!(contextualize_readiness(70, &empty).label, "Insufficient history");
    }
}
