//! Threshold presets for the overload rules
//!
//! Each rule-set version ships a regular and an advanced preset. Advanced lifts
//! (long, low-variance history) use smaller windows and lower trigger points.

use super::FlagType;
use serde::{Deserialize, Serialize};

/// Severity weight per rule
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OverloadWeights {
    pub sustained_near_failure: u32,
    pub fixed_load_drift: u32,
    pub high_volatility: u32,
    pub plateau_effort_rise: u32,
    pub max_intent_variability: u32,
    pub cns_cost_rising: u32,
}

impl OverloadWeights {
    pub fn for_flag(&self, flag: FlagType) -> u32 {
        match flag {
            FlagType::SustainedNearFailure => self.sustained_near_failure,
            FlagType::FixedLoadDrift => self.fixed_load_drift,
            FlagType::HighVolatility => self.high_volatility,
            FlagType::PlateauEffortRise => self.plateau_effort_rise,
            FlagType::MaxIntentVariability => self.max_intent_variability,
            FlagType::CnsCostRising => self.cns_cost_rising,
        }
    }
}

impl Default for OverloadWeights {
    fn default() -> Self {
        Self {
            sustained_near_failure: 25,
            fixed_load_drift: 20,
            high_volatility: 10,
            plateau_effort_rise: 15,
            max_intent_variability: 18,
            cns_cost_rising: 22,
        }
    }
}

/// All thresholds of one rule-set preset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverloadThresholds {
    /// Sessions per sliding window
    pub window_sessions: usize,

    /// Sessions required before the first window is evaluated
    pub min_sessions: usize,

    /// Sessions needed before a lift can be advanced
    pub min_sessions_advanced: usize,

    /// e1RM CV below which a lift is advanced
    pub cv_advanced: f64,

    /// Loads within this many kg are comparable
    pub load_tolerance_kg: f64,

    pub near_failure_rir: f64,
    pub near_failure_rpe: f64,
    pub near_failure_prop: f64,

    /// Rows inspected for near-failure; `None` uses the whole window
    pub near_failure_k: Option<usize>,

    pub drift_rep_drop: f64,
    pub drift_rir_drop: f64,
    pub drift_e1rm_drop_pct: f64,

    /// Prior comparable rows needed for a drift verdict
    pub drift_min_comparable: usize,

    pub volatility_rep_range: u32,
    pub volatility_e1rm_cv: f64,

    /// Restrict volatility to load-comparable rows (at least three)
    pub volatility_comparable_only: bool,

    pub plateau_load_change: f64,
    pub plateau_rir_diff: f64,

    /// Also accept a per-session RIR slope below this value
    pub plateau_rir_slope: Option<f64>,

    pub max_intent_rir: f64,
    pub max_intent_rpe: f64,
    pub max_intent_prop: f64,
    pub max_intent_cv: f64,

    pub cns_rpe_delta: f64,
    pub cns_rir_delta: f64,

    /// Sessions in the earlier baseline block
    pub cns_window: usize,

    pub weights: OverloadWeights,
}

impl Default for OverloadThresholds {
    fn default() -> Self {
        Self::v2()
    }
}

impl OverloadThresholds {
    /// Four-rule preset for regular lifts
    pub fn v1() -> Self {
        Self {
            window_sessions: 6,
            min_sessions: 4,
            near_failure_k: Some(3),
            drift_min_comparable: 2,
            volatility_comparable_only: true,
            plateau_rir_slope: Some(-0.2),
            ..Self::v2()
        }
    }

    /// Four-rule preset for advanced lifts
    pub fn v1_advanced() -> Self {
        Self {
            near_failure_k: Some(2),
            near_failure_prop: 0.5,
            drift_e1rm_drop_pct: 0.015,
            weights: OverloadWeights {
                sustained_near_failure: 36,
                fixed_load_drift: 31,
                high_volatility: 13,
                plateau_effort_rise: 18,
                ..OverloadWeights::default()
            },
            ..Self::v1()
        }
    }

    /// Six-rule preset for regular lifts
    pub fn v2() -> Self {
        Self {
            window_sessions: 6,
            min_sessions: 6,
            min_sessions_advanced: 12,
            cv_advanced: 0.05,
            load_tolerance_kg: 2.5,
            near_failure_rir: 1.0,
            near_failure_rpe: 9.0,
            near_failure_prop: 0.66,
            near_failure_k: None,
            drift_rep_drop: 1.0,
            drift_rir_drop: 1.0,
            drift_e1rm_drop_pct: 0.03,
            drift_min_comparable: 1,
            volatility_rep_range: 2,
            volatility_e1rm_cv: 0.04,
            volatility_comparable_only: false,
            plateau_load_change: 0.03,
            plateau_rir_diff: 0.7,
            plateau_rir_slope: None,
            max_intent_rir: 1.0,
            max_intent_rpe: 9.0,
            max_intent_prop: 0.5,
            max_intent_cv: 0.06,
            cns_rpe_delta: 0.7,
            cns_rir_delta: -0.7,
            cns_window: 4,
            weights: OverloadWeights::default(),
        }
    }

    /// Six-rule preset for advanced lifts
    pub fn v2_advanced() -> Self {
        Self {
            window_sessions: 4,
            min_sessions: 4,
            near_failure_prop: 0.5,
            drift_e1rm_drop_pct: 0.015,
            volatility_e1rm_cv: 0.03,
            max_intent_cv: 0.045,
            cns_window: 3,
            ..Self::v2()
        }
    }

    /// Same preset with a different window; `min_sessions` follows it
    pub fn with_window(mut self, window_sessions: usize) -> Self {
        self.window_sessions = window_sessions;
        self.min_sessions = self.min_sessions.min(window_sessions);
        self
    }
}
