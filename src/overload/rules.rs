//! The six windowed overload rules
//!
//! Every rule inspects one window of top sets (oldest first, the last row is
//! the session being judged) and either returns a flag or `None`. A rule that
//! lacks the rows it needs returns `None`; that is "no verdict", not an error.

use super::thresholds::OverloadThresholds;
use super::{Evidence, FlagType, OverloadFlag};
use crate::models::TopSet;
use crate::stats::{self, round_to};
use serde_json::{json, Value};

/// One window of one exercise
pub struct WindowContext<'a> {
    pub exercise: &'a str,

    /// Full chronological history of the exercise
    pub history: &'a [TopSet],

    /// Index of the window's last row in `history`
    pub end: usize,
    pub window: &'a [TopSet],
    pub thresholds: &'a OverloadThresholds,
    pub is_advanced: bool,
}

impl WindowContext<'_> {
    fn last(&self) -> &TopSet {
        &self.window[self.window.len() - 1]
    }

    fn flag(&self, flag_type: FlagType, evidence: Evidence, recommendations: Vec<String>) -> OverloadFlag {
        OverloadFlag {
            date: self.last().date,
            exercise: self.exercise.to_string(),
            flag_type,
            severity: self.thresholds.weights.for_flag(flag_type),
            evidence,
            recommendations,
        }
    }
}

/// Evaluate one rule on one window
pub fn evaluate(rule: FlagType, ctx: &WindowContext<'_>) -> Option<OverloadFlag> {
    if ctx.window.is_empty() {
        return None;
    }
    match rule {
        FlagType::SustainedNearFailure => sustained_near_failure(ctx),
        FlagType::FixedLoadDrift => fixed_load_drift(ctx),
        FlagType::HighVolatility => high_volatility(ctx),
        FlagType::PlateauEffortRise => plateau_effort_rise(ctx),
        FlagType::MaxIntentVariability => max_intent_variability(ctx),
        FlagType::CnsCostRising => cns_cost_rising(ctx),
    }
}

fn evidence(pairs: Vec<(&str, Value)>) -> Evidence {
    pairs.into_iter().map(|(k, v)| (k.to_string(), v)).collect()
}

fn e1rms(rows: &[&TopSet]) -> Vec<f64> {
    rows.iter().map(|r| r.e1rm).collect()
}

/// Load band: load rounded to the nearest tolerance step
pub fn load_band(load: f64, tolerance: f64) -> f64 {
    if tolerance <= 0.0 {
        return load;
    }
    (load / tolerance).round() * tolerance
}

/// Rep band index: (0,2], (2,5], (5,8], (8,12], (12,inf)
pub fn rep_band(reps: u32) -> u8 {
    match reps {
        0..=2 => 0,
        3..=5 => 1,
        6..=8 => 2,
        9..=12 => 3,
        _ => 4,
    }
}

fn same_band(row: &TopSet, reference: &TopSet, tolerance: f64) -> bool {
    load_band(row.load, tolerance) == load_band(reference.load, tolerance)
        && rep_band(row.reps) == rep_band(reference.reps)
}

fn sustained_near_failure(ctx: &WindowContext<'_>) -> Option<OverloadFlag> {
    let t = ctx.thresholds;
    let k = t.near_failure_k.unwrap_or(ctx.window.len()).min(ctx.window.len());
    let recent = &ctx.window[ctx.window.len() - k..];
    if recent.is_empty() {
        return None;
    }

    let near: usize = recent
        .iter()
        .filter(|r| r.rir <= t.near_failure_rir || r.rpe >= t.near_failure_rpe)
        .count();
    let proportion = near as f64 / recent.len() as f64;
    let rirs: Vec<f64> = recent.iter().map(|r| r.rir).collect();
    let mean_rir = stats::mean(&rirs)?;

    if proportion < t.near_failure_prop || mean_rir > t.near_failure_rir {
        return None;
    }

    let ex = ctx.exercise;
    Some(ctx.flag(
        FlagType::SustainedNearFailure,
        evidence(vec![
            ("proportion", json!(round_to(proportion, 2))),
            ("mean_rir", json!(round_to(mean_rir, 2))),
            ("sessions_near_failure", json!(near)),
            ("sessions_checked", json!(recent.len())),
            ("is_advanced", json!(ctx.is_advanced)),
        ]),
        vec![
            format!("Avoid RIR0 on {} for 7 days", ex),
            format!("Top set at RIR2 plus 2 back-off sets on {}", ex),
            format!("Cut {} sets by 20%", ex),
        ],
    ))
}

fn fixed_load_drift(ctx: &WindowContext<'_>) -> Option<OverloadFlag> {
    let t = ctx.thresholds;
    let last = ctx.last();
    let prior = &ctx.window[..ctx.window.len() - 1];
    let comparable: Vec<&TopSet> = prior
        .iter()
        .filter(|r| (r.load - last.load).abs() <= t.load_tolerance_kg)
        .collect();

    if comparable.is_empty() || comparable.len() < t.drift_min_comparable {
        return None;
    }

    let reps: Vec<f64> = comparable.iter().map(|r| r.reps as f64).collect();
    let rirs: Vec<f64> = comparable.iter().map(|r| r.rir).collect();
    let baseline_reps = stats::median(&reps)?;
    let baseline_rir = stats::median(&rirs)?;
    let baseline_e1rm = stats::median(&e1rms(&comparable))?;

    let rep_drop = last.reps as f64 <= baseline_reps - t.drift_rep_drop;
    let rir_drop = last.rir <= baseline_rir - t.drift_rir_drop;
    let e1rm_drop = last.e1rm < baseline_e1rm * (1.0 - t.drift_e1rm_drop_pct);

    if !(rep_drop || rir_drop || e1rm_drop) {
        return None;
    }

    let drift_type: Vec<&str> = [("reps", rep_drop), ("rir", rir_drop), ("e1rm", e1rm_drop)]
        .iter()
        .filter(|(_, hit)| *hit)
        .map(|(name, _)| *name)
        .collect();

    let ex = ctx.exercise;
    Some(ctx.flag(
        FlagType::FixedLoadDrift,
        evidence(vec![
            ("last_load", json!(round_to(last.load, 1))),
            ("last_reps", json!(last.reps)),
            ("baseline_reps", json!(round_to(baseline_reps, 1))),
            ("last_rir", json!(round_to(last.rir, 1))),
            ("baseline_rir", json!(round_to(baseline_rir, 1))),
            ("last_e1rm", json!(round_to(last.e1rm, 1))),
            ("baseline_e1rm", json!(round_to(baseline_e1rm, 1))),
            ("n_comparable", json!(comparable.len())),
            ("drift_type", json!(drift_type)),
            ("is_advanced", json!(ctx.is_advanced)),
        ]),
        vec![
            format!("Micro-deload {}: -5% load or +2 RIR for 1 week", ex),
            format!("Change the stimulus on {}: pauses, tempo, 6-8 rep range", ex),
            format!("No PR attempts on {} this week", ex),
        ],
    ))
}

fn high_volatility(ctx: &WindowContext<'_>) -> Option<OverloadFlag> {
    let t = ctx.thresholds;
    let last = ctx.last();
    let population: Vec<&TopSet> = if t.volatility_comparable_only {
        let rows: Vec<&TopSet> = ctx
            .window
            .iter()
            .filter(|r| (r.load - last.load).abs() <= t.load_tolerance_kg)
            .collect();
        if rows.len() < 3 {
            return None;
        }
        rows
    } else {
        ctx.window.iter().collect()
    };

    let max_reps = population.iter().map(|r| r.reps).max()?;
    let min_reps = population.iter().map(|r| r.reps).min()?;
    let rep_range = max_reps - min_reps;
    let e1rm_cv = stats::coefficient_of_variation(&e1rms(&population)).unwrap_or(0.0);
    let low_rir = population.iter().filter(|r| r.rir <= 1.0).count();
    let low_rir_share = low_rir as f64 / population.len() as f64;

    let volatile = rep_range >= t.volatility_rep_range || e1rm_cv > t.volatility_e1rm_cv;
    if !volatile || low_rir_share < 0.5 {
        return None;
    }

    let ex = ctx.exercise;
    Some(ctx.flag(
        FlagType::HighVolatility,
        evidence(vec![
            ("load", json!(round_to(last.load, 1))),
            ("rep_range", json!(rep_range)),
            ("e1rm_cv", json!(round_to(e1rm_cv, 3))),
            ("low_rir_share", json!(round_to(low_rir_share, 2))),
            ("n_sessions", json!(population.len())),
            ("is_advanced", json!(ctx.is_advanced)),
        ]),
        vec![
            format!("Keep {} consistent: same structure and rest", ex),
            format!("At most one heavy top set per {} session", ex),
            format!("At most one RIR0 set per week on {}; use a RIR1 top set plus back-offs", ex),
        ],
    ))
}

fn plateau_effort_rise(ctx: &WindowContext<'_>) -> Option<OverloadFlag> {
    let t = ctx.thresholds;
    if ctx.window.len() < t.window_sessions {
        return None;
    }
    let half = ctx.window.len() / 2;
    if half == 0 {
        return None;
    }
    let (first, second) = ctx.window.split_at(half);

    let loads = |rows: &[TopSet]| rows.iter().map(|r| r.load).collect::<Vec<_>>();
    let rirs = |rows: &[TopSet]| rows.iter().map(|r| r.rir).collect::<Vec<_>>();

    let load_first = stats::median(&loads(first))?;
    let load_second = stats::median(&loads(second))?;
    if load_first <= 0.0 {
        return None;
    }
    let load_change = (load_second - load_first).abs() / load_first;
    if load_change >= t.plateau_load_change {
        return None;
    }

    let rir_first = stats::mean(&rirs(first))?;
    let rir_second = stats::mean(&rirs(second))?;
    let rir_diff = rir_second - rir_first;

    let slope = if ctx.window.len() >= 3 {
        stats::linear_slope(&rirs(ctx.window))
    } else {
        None
    };
    let slope_rising = match (t.plateau_rir_slope, slope) {
        (Some(limit), Some(s)) => s < limit,
        _ => false,
    };

    if !(rir_diff < -t.plateau_rir_diff || slope_rising) {
        return None;
    }

    let ex = ctx.exercise;
    Some(ctx.flag(
        FlagType::PlateauEffortRise,
        evidence(vec![
            ("load_first_half", json!(round_to(load_first, 1))),
            ("load_second_half", json!(round_to(load_second, 1))),
            ("load_change_pct", json!(round_to(load_change * 100.0, 1))),
            ("rir_first_half", json!(round_to(rir_first, 2))),
            ("rir_second_half", json!(round_to(rir_second, 2))),
            ("rir_diff", json!(round_to(rir_diff, 2))),
            ("rir_slope", json!(slope.map(|s| round_to(s, 3)))),
            ("is_advanced", json!(ctx.is_advanced)),
        ]),
        vec![
            format!("Micro-deload {}: -5% load or +2 RIR for 1 week", ex),
            "Change the stimulus: back-off sets, tempo, pauses".to_string(),
            "Consider a deload if 2+ fatigue signals appear".to_string(),
        ],
    ))
}

fn max_intent_variability(ctx: &WindowContext<'_>) -> Option<OverloadFlag> {
    let t = ctx.thresholds;
    let last = ctx.last();
    let comp: Vec<&TopSet> = ctx
        .window
        .iter()
        .filter(|r| same_band(r, last, t.load_tolerance_kg))
        .collect();
    if comp.len() < 3 {
        return None;
    }

    let intent = comp
        .iter()
        .filter(|r| r.rir <= t.max_intent_rir || r.rpe >= t.max_intent_rpe)
        .count();
    let prop_intent = intent as f64 / comp.len() as f64;
    let values = e1rms(&comp);
    let e1rm_cv = stats::coefficient_of_variation(&values).unwrap_or(0.0);
    let e1rm_trend = last.e1rm - stats::median(&values)?;

    if prop_intent < t.max_intent_prop || e1rm_cv <= t.max_intent_cv || e1rm_trend > 0.0 {
        return None;
    }

    let ex = ctx.exercise;
    Some(ctx.flag(
        FlagType::MaxIntentVariability,
        evidence(vec![
            ("prop_intent", json!(round_to(prop_intent, 2))),
            ("e1rm_cv", json!(round_to(e1rm_cv, 3))),
            ("e1rm_trend", json!(round_to(e1rm_trend, 1))),
            ("n_comp", json!(comp.len())),
        ]),
        vec![
            format!("Reduce execution variability on {}", ex),
            "Standardize technique and rest periods".to_string(),
        ],
    ))
}

fn cns_cost_rising(ctx: &WindowContext<'_>) -> Option<OverloadFlag> {
    let t = ctx.thresholds;
    let w = t.window_sessions;
    if ctx.end < w + t.cns_window {
        return None;
    }
    let last = ctx.last();
    let split = ctx.end + 1 - w;
    let curr = &ctx.history[split..=ctx.end];
    let base = &ctx.history[split - t.cns_window..split];

    let in_band = |rows: &[TopSet]| -> Vec<TopSet> {
        rows.iter()
            .filter(|r| same_band(r, last, t.load_tolerance_kg))
            .copied()
            .collect()
    };
    let curr_comp = in_band(curr);
    let base_comp = in_band(base);
    if curr_comp.is_empty() || base_comp.is_empty() {
        return None;
    }

    let rpe = |rows: &[TopSet]| rows.iter().map(|r| r.rpe).collect::<Vec<_>>();
    let rir = |rows: &[TopSet]| rows.iter().map(|r| r.rir).collect::<Vec<_>>();
    let base_rpe = stats::median(&rpe(&base_comp))?;
    let curr_rpe = stats::median(&rpe(&curr_comp))?;
    let base_rir = stats::median(&rir(&base_comp))?;
    let curr_rir = stats::median(&rir(&curr_comp))?;
    let rpe_delta = curr_rpe - base_rpe;
    let rir_delta = curr_rir - base_rir;

    if !(rpe_delta > t.cns_rpe_delta || rir_delta < t.cns_rir_delta) {
        return None;
    }

    let ex = ctx.exercise;
    Some(ctx.flag(
        FlagType::CnsCostRising,
        evidence(vec![
            ("base_rpe", json!(base_rpe)),
            ("curr_rpe", json!(curr_rpe)),
            ("base_rir", json!(base_rir)),
            ("curr_rir", json!(curr_rir)),
            ("rpe_delta", json!(round_to(rpe_delta, 2))),
            ("rir_delta", json!(round_to(rir_delta, 2))),
            ("n_base", json!(base_comp.len())),
            ("n_curr", json!(curr_comp.len())),
        ]),
        vec![
            format!("Review recovery and technique on {}", ex),
            "Consider a deload".to_string(),
        ],
    ))
}
