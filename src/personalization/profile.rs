//! User profile
//!
//! Bundles the personal baselines with the factors derived from them: how much
//! sleep and volume move this user's readiness, a coarse archetype, and short
//! written insights.

use super::baselines::{calculate_baselines, BaselineSet, DataQuality, PersonalizationConfig};
use crate::models::{DailyMetrics, WeeklyLoad};
use crate::stats;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Correlation above which readiness is considered sleep driven
const SLEEP_RESPONSIVE_CORRELATION: f64 = 0.3;

/// Days required in each group when comparing readiness across conditions
const MIN_GROUP_DAYS: usize = 3;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdjustmentFactors {
    pub sleep_weight: f64,
    pub performance_weight: f64,

    /// >1 means readiness drops more than usual after high-volume days
    pub fatigue_sensitivity: f64,
    pub stress_sensitivity: f64,

    /// Fixed at 1.0
    pub recovery_speed: f64,
    pub sleep_responsive: bool,
}

impl Default for AdjustmentFactors {
    fn default() -> Self {
        Self {
            sleep_weight: 0.25,
            performance_weight: 0.25,
            fatigue_sensitivity: 1.0,
            stress_sensitivity: 1.0,
            recovery_speed: 1.0,
            sleep_responsive: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SleepResponsiveness {
    pub correlation: Option<f64>,
    pub n: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Archetype {
    /// short_sleeper, acwr_sensitive, consistent_performer or unknown
    pub archetype: String,
    pub confidence: f64,
    pub reason: String,
}

impl Archetype {
    fn unknown() -> Self {
        Self {
            archetype: "unknown".to_string(),
            confidence: 0.0,
            reason: String::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Insights {
    pub sleep: String,
    pub fatigue: String,
    pub recovery: String,
    pub archetype: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub baselines: BaselineSet,
    pub adjustment_factors: AdjustmentFactors,
    pub sleep_responsiveness: SleepResponsiveness,
    pub archetype: Archetype,
    pub insights: Insights,
    pub data_quality: DataQuality,
}

/// Readiness joined with the daily row of the same date
struct Observation<'a> {
    day: &'a DailyMetrics,
    readiness: f64,
}

fn mean_readiness<F>(observations: &[Observation<'_>], keep: F) -> (Option<f64>, usize)
where
    F: Fn(&Observation<'_>) -> bool,
{
    let values: Vec<f64> = observations
        .iter()
        .filter(|o| keep(o))
        .map(|o| o.readiness)
        .collect();
    (stats::mean(&values), values.len())
}

fn sleep_responsiveness(observations: &[Observation<'_>], min_days: usize) -> SleepResponsiveness {
    let (sleeps, scores): (Vec<f64>, Vec<f64>) = observations
        .iter()
        .filter_map(|o| o.day.sleep_hours.map(|s| (s, o.readiness)))
        .unzip();
    let correlation = if sleeps.len() >= min_days {
        stats::pearson(&sleeps, &scores)
    } else {
        None
    };
    SleepResponsiveness {
        correlation,
        n: sleeps.len(),
    }
}

fn fatigue_sensitivity(observations: &[Observation<'_>]) -> Option<f64> {
    let volumes: Vec<f64> = observations.iter().map(|o| o.day.volume).collect();
    let p75 = stats::percentile(&volumes, 0.75)?;

    let (high, n_high) = mean_readiness(observations, |o| o.day.volume >= p75);
    let (rest, n_rest) = mean_readiness(observations, |o| o.day.volume < p75);
    if n_high < MIN_GROUP_DAYS || n_rest < MIN_GROUP_DAYS {
        return None;
    }
    Some((1.0 + (rest? - high?) / 20.0).clamp(0.5, 1.5))
}

fn stress_sensitivity(observations: &[Observation<'_>], min_days: usize) -> Option<f64> {
    let (stress, scores): (Vec<f64>, Vec<f64>) = observations
        .iter()
        .filter_map(|o| {
            o.day
                .wellness
                .as_ref()
                .and_then(|w| w.stress)
                .map(|s| (s, o.readiness))
        })
        .unzip();
    if stress.len() < min_days {
        return None;
    }
    // Negative correlation means stress pulls readiness down
    stats::pearson(&stress, &scores).map(|r| (1.0 - r).clamp(0.5, 1.5))
}

fn classify_archetype(observations: &[Observation<'_>], baselines: &BaselineSet) -> Archetype {
    let Some(readiness) = &baselines.readiness else {
        return Archetype::unknown();
    };
    let confidence = (readiness.n as f64 / 30.0).min(1.0);

    if let Some(sleep) = &baselines.sleep {
        if sleep.p50 < 7.0 && readiness.mean >= 65.0 {
            return Archetype {
                archetype: "short_sleeper".to_string(),
                confidence,
                reason: format!(
                    "Median sleep {:.1}h with mean readiness {:.0}",
                    sleep.p50, readiness.mean
                ),
            };
        }
    }

    let (spike_mean, n_spike) =
        mean_readiness(observations, |o| o.day.acwr_7_28.map_or(false, |a| a > 1.5));
    if let Some(spike_mean) = spike_mean.filter(|_| n_spike >= MIN_GROUP_DAYS) {
        if spike_mean < readiness.mean - 10.0 {
            return Archetype {
                archetype: "acwr_sensitive".to_string(),
                confidence,
                reason: format!(
                    "Readiness {:.0} on ACWR>1.5 days vs {:.0} overall",
                    spike_mean, readiness.mean
                ),
            };
        }
    }

    if let Some(std) = readiness.std.filter(|s| *s < 10.0) {
        return Archetype {
            archetype: "consistent_performer".to_string(),
            confidence,
            reason: format!("Readiness std {:.1} below 10", std),
        };
    }

    Archetype::unknown()
}

fn generate_insights(
    baselines: &BaselineSet,
    factors: &AdjustmentFactors,
    archetype: &Archetype,
) -> Insights {
    let sleep = if factors.sleep_responsive {
        let median = baselines.sleep_p50().unwrap_or(7.5);
        format!(
            "Your readiness tracks your sleep. Your median is {:.1}h and every hour below it costs readiness. Aim for a consistent 7.5-8h.",
            median
        )
    } else {
        "Your readiness is not very sleep sensitive (some short nights go fine). Poor sleep quality still hurts, so focus on uninterrupted sleep.".to_string()
    };

    let fatigue = if factors.fatigue_sensitivity > 1.2 {
        "You are highly fatigue sensitive: readiness drops fast after high volume. Deload every 4-5 weeks rather than every 6."
    } else if factors.fatigue_sensitivity < 0.8 {
        "You tolerate fatigue well and can run high-load blocks. It still accumulates, you just notice it later."
    } else {
        "Normal fatigue sensitivity. Standard periodization applies."
    };

    let variable = baselines
        .readiness
        .as_ref()
        .and_then(|r| r.std)
        .map_or(false, |std| std > 15.0);
    let recovery = if variable {
        "Your readiness varies a lot, a sign of sensitivity to weekly load. Track load, sleep and stress daily."
    } else {
        "Your readiness is stable. Keep the consistency."
    };

    let archetype_text = match archetype.archetype.as_str() {
        "short_sleeper" => "Short sleeper: you perform well on under 7h. Use it for volume but watch accumulated fatigue.",
        "acwr_sensitive" => "ACWR sensitive: load spikes (ACWR > 1.5) drop your readiness quickly. Watch weekly ACWR.",
        "consistent_performer" => "Consistent performer: your readiness is predictable, so you can plan blocks with confidence.",
        _ => "",
    };

    Insights {
        sleep,
        fatigue: fatigue.to_string(),
        recovery: recovery.to_string(),
        archetype: archetype_text.to_string(),
    }
}

/// Build the profile from the daily table and dated readiness scores
pub fn build_user_profile(
    daily: &[DailyMetrics],
    readiness: &[(NaiveDate, f64)],
    weekly: &[WeeklyLoad],
    config: &PersonalizationConfig,
) -> UserProfile {
    let scores: Vec<f64> = readiness.iter().map(|(_, score)| *score).collect();
    let baselines = calculate_baselines(daily, &scores, weekly, config);

    let by_date: HashMap<NaiveDate, &DailyMetrics> = daily.iter().map(|d| (d.date, d)).collect();
    let observations: Vec<Observation<'_>> = readiness
        .iter()
        .filter_map(|(date, score)| {
            by_date.get(date).map(|day| Observation {
                day,
                readiness: *score,
            })
        })
        .collect();

    let responsiveness = sleep_responsiveness(&observations, config.min_days);
    let mut factors = AdjustmentFactors::default();
    if let Some(r) = responsiveness.correlation {
        factors.sleep_responsive = r > SLEEP_RESPONSIVE_CORRELATION;
        factors.sleep_weight = if factors.sleep_responsive { 0.30 } else { 0.20 };
    }
    if let Some(sensitivity) = fatigue_sensitivity(&observations) {
        factors.fatigue_sensitivity = sensitivity;
    }
    if let Some(sensitivity) = stress_sensitivity(&observations, config.min_days) {
        factors.stress_sensitivity = sensitivity;
    }

    let archetype = classify_archetype(&observations, &baselines);
    let insights = generate_insights(&baselines, &factors, &archetype);
    let data_quality = baselines.data_quality.clone();

    UserProfile {
        baselines,
        adjustment_factors: factors,
        sleep_responsiveness: responsiveness,
        archetype,
        insights,
        data_quality,
    }
}
