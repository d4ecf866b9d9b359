//! Readiness components
//!
//! Each component maps one input onto [0, 1] (or a signed bonus/penalty) and
//! carries its weight. The breakdown sums them, blending in perceived
//! readiness when the user reported one.

use super::curves::soft_clip;
use crate::stats::clip01;
use serde::{Deserialize, Serialize};

/// Share of the score taken by perceived readiness when present
pub const PERCEIVED_WEIGHT: f64 = 0.25;

/// One weighted term of the readiness sum
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Component {
    pub name: String,

    /// Normalized sub-score (0-1 for scores, 0/1 for penalty switches)
    pub score: f64,

    /// Negative for penalties
    pub weight: f64,

    /// Whether the term shrinks to 75% when perceived readiness is blended in
    pub blended: bool,
}

impl Component {
    pub fn new(name: &str, score: f64, weight: f64) -> Self {
        Self {
            name: name.to_string(),
            score,
            weight,
            blended: true,
        }
    }

    /// A penalty applied at full strength regardless of perceived readiness
    pub fn penalty(name: &str, active: bool, weight: f64) -> Self {
        Self {
            name: name.to_string(),
            score: if active { 1.0 } else { 0.0 },
            weight: -weight,
            blended: false,
        }
    }

    pub fn contribution(&self) -> f64 {
        self.score * self.weight
    }
}

/// All components of one day plus the optional perceived readiness (0-10)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ComponentBreakdown {
    pub components: Vec<Component>,
    pub perceived: Option<f64>,

    /// tanh softness for the final clip; hard clamp when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub softness: Option<f64>,
}

impl ComponentBreakdown {
    pub fn new(components: Vec<Component>, perceived: Option<f64>) -> Self {
        Self {
            components,
            perceived,
            softness: None,
        }
    }

    /// Squash the total into [0, 1] with a tanh curve instead of clamping
    pub fn with_soft_clip(mut self, softness: f64) -> Self {
        self.softness = Some(softness);
        self
    }

    /// Unclipped 0-1 sum
    pub fn total(&self) -> f64 {
        let blended: f64 = self
            .components
            .iter()
            .filter(|c| c.blended)
            .map(Component::contribution)
            .sum();
        let fixed: f64 = self
            .components
            .iter()
            .filter(|c| !c.blended)
            .map(Component::contribution)
            .sum();

        match self.perceived {
            Some(p) => {
                PERCEIVED_WEIGHT * (p / 10.0) + (1.0 - PERCEIVED_WEIGHT) * blended + fixed
            }
            None => blended + fixed,
        }
    }

    /// Integer score in [0, 100]
    pub fn score(&self) -> u32 {
        let total = match self.softness {
            Some(softness) => soft_clip(self.total(), 0.0, 1.0, softness),
            None => self.total(),
        };
        (clip01(total) * 100.0).round() as u32
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.components
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.score)
    }
}

/// 6.0 h -> 0, 7.5 h -> 1
pub fn sleep_hours_score(hours: f64) -> f64 {
    clip01((hours - 6.0) / 1.5)
}

/// Quality 1 -> 0, 5 -> 1
pub fn sleep_quality_score(quality: f64) -> f64 {
    clip01((quality - 1.0) / 4.0)
}

/// PI 0.98 -> 0, 1.00 -> 0.5, 1.02 -> 1
pub fn performance_score(pi: f64) -> f64 {
    clip01((pi - 0.98) / 0.04)
}

/// Today's PI against its 7-day mean; neutral without history
pub fn trend_score(pi: Option<f64>, pi_7d: Option<f64>) -> f64 {
    match (pi, pi_7d) {
        (Some(pi), Some(mean)) => clip01((pi - mean + 0.01) / 0.02),
        _ => 0.5,
    }
}

/// Piecewise ACWR score, best inside the 0.8-1.3 sweet spot
pub fn acwr_score(acwr: Option<f64>) -> f64 {
    let Some(x) = acwr else {
        return 0.5;
    };
    if (0.8..=1.3).contains(&x) {
        1.0
    } else if x > 1.3 && x <= 1.5 {
        1.0 - (x - 1.3) * 2.0
    } else if x > 1.5 {
        (0.6 - (x - 1.5) * 1.2).clamp(0.0, 0.6)
    } else if x >= 0.6 {
        0.7 + (x - 0.6) * 1.5
    } else {
        0.6
    }
}

/// Fatigue read from weighted RIR
///
/// Sustained RIR at or below 0.5 is maximal fatigue; high RIR is only low
/// stimulus and does not lower readiness much.
pub fn rir_fatigue_score(rir: Option<f64>) -> f64 {
    let Some(rir) = rir else {
        return 0.5;
    };
    if rir <= 0.5 {
        0.0
    } else if rir < 1.0 {
        (rir - 0.5) / 0.5
    } else if rir <= 3.0 {
        1.0
    } else {
        0.8
    }
}
