//! Next-week session sequence
//!
//! Starts from a push/normal/normal/push/reduce/deload/rest week and softens it
//! when recent strain, monotony or readiness call for it.

use crate::stats;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DayType {
    Push,
    Normal,
    Reduce,
    Switch,
    Deload,
    Rest,
}

impl fmt::Display for DayType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            DayType::Push => "push",
            DayType::Normal => "normal",
            DayType::Reduce => "reduce",
            DayType::Switch => "switch",
            DayType::Deload => "deload",
            DayType::Rest => "rest",
        };
        write!(f, "{}", label)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlannedDay {
    pub day: String,
    pub day_type: DayType,
    pub description: String,
}

impl PlannedDay {
    fn new(day: &str, day_type: DayType, description: &str) -> Self {
        Self {
            day: day.to_string(),
            day_type,
            description: description.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeeklyPlan {
    /// Monday to Sunday
    pub sequence: Vec<PlannedDay>,
    pub reasoning: String,

    /// Recent mean strain over the personal p75 (0.5 when unknown)
    pub strain_ratio: f64,
    pub monotony: f64,
    pub readiness_mean: f64,
}

/// Suggest the next week's day types
///
/// `strain_recent` holds the recent weekly strain values; the ratio against
/// `strain_p75` falls back to a neutral 0.5 without a usable p75.
pub fn suggest_weekly_sequence(
    strain_recent: &[f64],
    monotony: f64,
    readiness_mean: f64,
    strain_p75: Option<f64>,
) -> WeeklyPlan {
    let strain_ratio = match (strain_p75, stats::mean(strain_recent)) {
        (Some(p75), Some(mean)) if p75 > 0.0 => mean / p75,
        _ => 0.5,
    };

    let mut sequence = vec![
        PlannedDay::new("Mon", DayType::Push, "Intense push day"),
        PlannedDay::new("Tue", DayType::Normal, "Normal volume"),
        PlannedDay::new("Wed", DayType::Normal, "Technique + accessories"),
        PlannedDay::new("Thu", DayType::Push, "Secondary push day"),
        PlannedDay::new("Fri", DayType::Reduce, "Reduce -20%"),
        PlannedDay::new("Sat", DayType::Deload, "Light deload"),
        PlannedDay::new("Sun", DayType::Rest, "Full rest"),
    ];
    let mut reasoning = "Baseline: push-normal-normal-push-reduce-deload-rest".to_string();

    if strain_ratio > 0.8 {
        sequence[1] = PlannedDay::new("Tue", DayType::Reduce, "Reduce after high load");
        reasoning = format!("High strain ({:.1}% of p75): reduce on Tue", strain_ratio * 100.0);
    }

    if monotony > 1.5 {
        sequence[2] = PlannedDay::new("Wed", DayType::Switch, "Switch pattern (opposite split)");
        reasoning = format!("High monotony ({:.2}): switch on Wed", monotony);
    }

    if readiness_mean < 50.0 {
        sequence[4] = PlannedDay::new("Fri", DayType::Deload, "Full deload");
        sequence[5] = PlannedDay::new("Sat", DayType::Rest, "Rest");
        reasoning = format!("Low readiness ({:.0}): deload Fri-Sat", readiness_mean);
    }

    WeeklyPlan {
        sequence,
        reasoning,
        strain_ratio,
        monotony,
        readiness_mean,
    }
}
