//! Instant readiness from the morning wellness check-in
//!
//! These strategies need no training history: sleep, subjective state,
//! motivation and a few penalty switches are enough for a score. The
//! curve-based formula can also center sleep on a personal baseline.

use super::components::{sleep_hours_score, sleep_quality_score, Component, ComponentBreakdown};
use super::curves::{saturating_curve, sigmoid, smootherstep, smoothstep};
use super::{ReadinessStrategy, ReadinessVersion};
use crate::models::{DailyMetrics, WellnessEntry};
use crate::personalization::profile::AdjustmentFactors;
use crate::personalization::BaselineSet;
use crate::stats::clip01;

/// Neutral value for an unanswered 0-10 question
const NEUTRAL_RATING: f64 = 5.0;
const DEFAULT_ENERGY: f64 = 7.0;
const DEFAULT_STIFFNESS: f64 = 2.0;

fn rating(value: Option<f64>) -> f64 {
    value.unwrap_or(NEUTRAL_RATING)
}

/// Nap bonus by duration: 20+ min 0.05, 45+ min 0.08, 90+ min 0.10
///
/// A nap between two steps gets the lower step, so 30 min counts as 20.
fn nap_bonus(minutes: Option<u32>) -> f64 {
    match minutes.unwrap_or(0) {
        m if m >= 90 => 0.10,
        m if m >= 45 => 0.08,
        m if m >= 20 => 0.05,
        _ => 0.0,
    }
}

/// Current check-in formula
pub fn wellness_v2_components(entry: &WellnessEntry) -> ComponentBreakdown {
    let fatigue = rating(entry.fatigue);
    let stress = rating(entry.stress);
    let soreness = rating(entry.soreness);
    let motivation = rating(entry.motivation);
    let energy = entry.energy.unwrap_or(DEFAULT_ENERGY);
    let stiffness = entry.stiffness.unwrap_or(DEFAULT_STIFFNESS);
    let caffeine_masking = entry.caffeine.unwrap_or(0) >= 2 && fatigue >= 6.0;

    let components = vec![
        Component::new("sleep_hours", sleep_hours_score(entry.sleep_hours), 0.25),
        Component::new("sleep_quality", sleep_quality_score(entry.sleep_quality), 0.15),
        Component::new("nap", nap_bonus(entry.nap_minutes), 1.0),
        Component::new("sleep_disruptions", f64::from(u8::from(entry.sleep_disruptions)), -0.15),
        Component::new("alcohol", f64::from(u8::from(entry.alcohol)), -0.20),
        Component::new("fatigue", 1.0 - fatigue / 10.0, 0.12),
        Component::new("stress", 1.0 - stress / 10.0, 0.08),
        Component::new("energy", energy / 10.0, 0.10),
        Component::new("soreness", 1.0 - soreness / 10.0, 0.05),
        Component::new("stiffness", stiffness / 10.0, -0.10),
        Component::new("motivation", motivation / 10.0, 0.15),
        Component::penalty("pain", entry.pain_flag, 0.25),
        Component::penalty("sick", entry.sick, 0.35),
        Component::penalty("caffeine_mask", caffeine_masking, 0.08),
    ];
    ComponentBreakdown::new(components, entry.perceived_readiness)
}

/// Legacy check-in formula
pub fn wellness_v1_components(entry: &WellnessEntry) -> ComponentBreakdown {
    let components = vec![
        Component::new("sleep_hours", clip01((entry.sleep_hours - 6.0) / 2.0), 0.25),
        Component::new("sleep_quality", sleep_quality_score(entry.sleep_quality), 0.15),
        Component::new("fatigue", 1.0 - rating(entry.fatigue) / 10.0, 0.15),
        Component::new("soreness", 1.0 - rating(entry.soreness) / 10.0, 0.10),
        Component::new("stress", 1.0 - rating(entry.stress) / 10.0, 0.10),
        Component::new("motivation", rating(entry.motivation) / 10.0, 0.15),
        Component::new("no_pain", if entry.pain_flag { 0.0 } else { 0.2 }, 0.10),
    ];
    ComponentBreakdown::new(components, entry.perceived_readiness)
}

/// Softness of the final tanh clip in the curve-based formula
const V3_SOFTNESS: f64 = 0.02;

/// A boolean sick flag scores as "sick" on the 0-5 illness scale
const SICK_LEVEL: f64 = 3.0;

/// Penalties that shrink when few inputs or little history back them
fn confidence(history_days: usize, entry: &WellnessEntry) -> f64 {
    let days = history_days as f64;
    let days_score = match history_days {
        0 => 0.15,
        n if n >= 28 => 0.95,
        n if n >= 14 => 0.70 + (days - 14.0) * 0.025 / 14.0,
        n if n >= 7 => 0.45 + (days - 7.0) * 0.025 / 7.0,
        _ => 0.20 + days * 0.035,
    };
    // sleep hours and quality are always present
    let answered = 2 + [entry.fatigue, entry.energy, entry.perceived_readiness]
        .iter()
        .filter(|v| v.is_some())
        .count();
    days_score * 0.60 + answered as f64 / 5.0 * 0.40
}

/// Personal sleep percentiles that center the sleep curve
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SleepBaseline {
    pub p50: f64,
    pub p25: f64,
}

/// Check-in scored with smooth curves instead of linear ramps
///
/// Four weighted blocks (sleep 0.32, state 0.36, perceived 0.18, motivation
/// 0.14) minus context-scaled penalties, squashed into [0, 1] with a soft
/// clip. Pain and alcohol penalties shrink when confidence is low.
#[derive(Debug, Clone, PartialEq)]
pub struct WellnessV3 {
    pub sleep_baseline: Option<SleepBaseline>,
    pub fatigue_sensitivity: f64,
    pub stress_sensitivity: f64,

    /// Days of history behind the baselines
    pub history_days: usize,
}

impl Default for WellnessV3 {
    fn default() -> Self {
        Self {
            sleep_baseline: None,
            fatigue_sensitivity: 1.0,
            stress_sensitivity: 1.0,
            history_days: 0,
        }
    }
}

impl WellnessV3 {
    /// Center sleep on the personal baseline when one exists
    pub fn from_baselines(baselines: &BaselineSet) -> Self {
        Self {
            sleep_baseline: baselines.sleep.as_ref().map(|b| SleepBaseline {
                p50: b.p50,
                p25: b.p25,
            }),
            history_days: baselines.data_quality.total_days,
            ..Self::default()
        }
    }

    pub fn with_sensitivities(mut self, factors: &AdjustmentFactors) -> Self {
        self.fatigue_sensitivity = factors.fatigue_sensitivity;
        self.stress_sensitivity = factors.stress_sensitivity;
        self
    }

    fn sleep_hours(&self, hours: f64) -> f64 {
        if hours <= 0.0 {
            return 0.5;
        }
        let (center, floor) = match self.sleep_baseline {
            Some(b) if b.p50 > 0.0 => (b.p50, b.p25),
            _ => (7.0, 5.0),
        };
        let normalized = (hours - floor) / (center + 1.0 - floor);
        let score = if normalized < 0.5 {
            smootherstep(normalized, -0.2, 0.6) * 0.85
        } else {
            0.85 + saturating_curve((normalized - 0.5) * 2.0, 0.7) * 0.15
        };
        clip01(score)
    }

    fn fatigue(&self, fatigue: f64) -> f64 {
        let fatigue = fatigue.clamp(0.0, 10.0);
        let raw = 1.0 - sigmoid(fatigue / 10.0, 0.60, 6.0);
        let mut score = raw.powf(self.fatigue_sensitivity.min(1.2));
        if fatigue <= 2.0 {
            score = score.max(0.92);
        }
        clip01(score)
    }

    fn stress(&self, stress: f64) -> f64 {
        let stress = stress.clamp(0.0, 10.0);
        let raw = 1.0 - sigmoid(stress / 10.0, 0.65, 5.5);
        let mut score = raw.powf(self.stress_sensitivity.min(1.15));
        if stress <= 2.0 {
            score = score.max(0.90);
        }
        clip01(score)
    }

    pub fn check_in_components(&self, entry: &WellnessEntry) -> ComponentBreakdown {
        let fatigue = entry.fatigue.unwrap_or(3.0);
        let stress = entry.stress.unwrap_or(3.0);
        let energy = entry.energy.unwrap_or(DEFAULT_ENERGY).clamp(0.0, 10.0) / 10.0;
        let soreness = entry.soreness.unwrap_or(2.0).clamp(0.0, 10.0);
        let motivation = entry.motivation.unwrap_or(7.0).clamp(0.0, 10.0) / 10.0;
        let stiffness = entry.stiffness.unwrap_or(DEFAULT_STIFFNESS);

        let quality = if entry.sleep_quality < 1.0 {
            0.5
        } else {
            smoothstep((entry.sleep_quality - 1.0) / 4.0, 0.0, 1.0)
        };
        let sleep = (self.sleep_hours(entry.sleep_hours) * 0.60
            + quality * 0.40
            + nap_bonus_v3(entry.nap_minutes))
        .min(1.0);

        let mut energy_score = saturating_curve(energy, 0.65);
        if energy >= 0.7 {
            energy_score = (energy_score + (energy - 0.7) * 0.25).min(1.0);
        }
        let fatigue_score = self.fatigue(fatigue);
        let soreness_score = 0.4 + (1.0 - sigmoid(soreness / 10.0, 0.65, 6.0)) * 0.6;
        let state = energy_score * 0.40
            + fatigue_score * 0.30
            + self.stress(stress) * 0.20
            + soreness_score * 0.10;

        let perceived = match entry.perceived_readiness {
            Some(p) => smootherstep(p.clamp(0.0, 10.0) / 10.0, 0.1, 0.9),
            None => energy_score * 0.4 + (1.0 - fatigue / 10.0) * 0.3 + motivation * 0.3,
        };

        let moderation = 0.5 + confidence(self.history_days, entry) * 0.5;
        let pain = pain_penalty_v3(entry, soreness, stiffness) * moderation;
        let alcohol = alcohol_penalty_v3(entry) * moderation;
        let disruption = disruption_penalty_v3(entry);
        let sick = if entry.sick {
            sigmoid(SICK_LEVEL / 5.0, 0.35, 6.0) * 0.40
        } else {
            0.0
        };
        let caffeine_mask = if entry.caffeine.unwrap_or(0) >= 3 && fatigue >= 7.0 {
            0.03
        } else {
            0.0
        };

        let components = vec![
            Component::new("sleep", sleep, 0.32),
            Component::new("state", state, 0.36),
            Component::new("perceived", perceived, 0.18),
            Component::new("motivation", saturating_curve(motivation, 0.6), 0.14),
            Component::penalty("pain", pain > 0.0, pain),
            Component::penalty("sick", sick > 0.0, sick),
            Component::penalty("alcohol", alcohol > 0.0, alcohol),
            Component::penalty("sleep_disruptions", disruption > 0.0, disruption),
            Component::penalty("caffeine_mask", caffeine_mask > 0.0, caffeine_mask),
        ];
        ComponentBreakdown::new(components, None).with_soft_clip(V3_SOFTNESS)
    }
}

/// Power naps and full cycles score best; very long naps drop back
fn nap_bonus_v3(minutes: Option<u32>) -> f64 {
    match minutes.unwrap_or(0) {
        0 => 0.0,
        1..=10 => 0.01,
        11..=25 => 0.03,
        26..=50 => 0.04,
        51..=100 => 0.05,
        _ => 0.04,
    }
}

/// 0.08 base, worse with soreness, stiffness or a back, shoulder or knee location
fn pain_penalty_v3(entry: &WellnessEntry, soreness: f64, stiffness: f64) -> f64 {
    const CRITICAL_ZONES: [&str; 4] = ["back", "lumbar", "shoulder", "knee"];
    if !entry.pain_flag {
        return 0.0;
    }
    let mut multiplier: f64 = 1.0;
    if soreness > 6.0 {
        multiplier += 0.3;
    }
    if stiffness > 5.0 {
        multiplier += 0.2;
    }
    if let Some(location) = &entry.pain_location {
        let location = location.to_lowercase();
        if CRITICAL_ZONES.iter().any(|zone| location.contains(zone)) {
            multiplier += 0.25;
        }
    }
    (0.08 * multiplier).min(0.20)
}

fn alcohol_penalty_v3(entry: &WellnessEntry) -> f64 {
    if !entry.alcohol {
        return 0.0;
    }
    let mut penalty = 0.06;
    if entry.sleep_hours < 6.5 || entry.sleep_quality <= 2.0 {
        penalty += 0.04;
    }
    if entry.sleep_hours < 5.5 {
        penalty += 0.03;
    }
    f64::min(penalty, 0.15)
}

fn disruption_penalty_v3(entry: &WellnessEntry) -> f64 {
    if !entry.sleep_disruptions {
        return 0.0;
    }
    let mut penalty = 0.03;
    if entry.sleep_hours < 6.0 {
        penalty += 0.02;
    }
    if entry.sleep_quality <= 2.0 {
        penalty += 0.02;
    }
    f64::min(penalty, 0.08)
}

/// Wellness check-in, current formula
pub struct WellnessV2;

/// Wellness check-in, legacy formula
pub struct WellnessV1;

impl ReadinessStrategy for WellnessV2 {
    fn version(&self) -> ReadinessVersion {
        ReadinessVersion::WellnessV2
    }

    fn components(&self, day: &DailyMetrics) -> Option<ComponentBreakdown> {
        day.wellness.as_ref().map(wellness_v2_components)
    }
}

impl ReadinessStrategy for WellnessV3 {
    fn version(&self) -> ReadinessVersion {
        ReadinessVersion::WellnessV3
    }

    fn components(&self, day: &DailyMetrics) -> Option<ComponentBreakdown> {
        day.wellness.as_ref().map(|entry| self.check_in_components(entry))
    }
}

impl ReadinessStrategy for WellnessV1 {
    fn version(&self) -> ReadinessVersion {
        ReadinessVersion::WellnessV1
    }

    fn components(&self, day: &DailyMetrics) -> Option<ComponentBreakdown> {
        day.wellness.as_ref().map(wellness_v1_components)
    }
}
