//! Injury-risk score
//!
//! Additive 0-100 score over load spikes, sleep, effort/performance mismatch,
//! accumulated strain and pain. Confidence reflects how many of the optional
//! inputs were actually available.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Inputs for one day
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InjuryRiskInputs {
    pub readiness_score: u32,
    pub acwr: Option<f64>,
    pub sleep_hours: Option<f64>,
    pub performance_index: Option<f64>,

    /// Session effort on a 0-10 scale
    pub effort_level: f64,
    pub pain_flag: bool,

    /// Consecutive days above the personal strain p75
    pub days_high_strain: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    fn from_score(score: u32) -> Self {
        if score >= 60 {
            RiskLevel::High
        } else if score >= 35 {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        }
    }

    /// What to do today at this level
    pub fn action(&self) -> &'static str {
        match self {
            RiskLevel::High => "MANDATORY DELOAD. Cut volume -30%, avoid maximal attempts.",
            RiskLevel::Medium => "Caution. Train but do not chase maxes. Focus on technique.",
            RiskLevel::Low => "Low risk. Train normally.",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
        };
        write!(f, "{}", label)
    }
}

/// Trust in the score given the available inputs
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InjuryRiskAssessment {
    pub risk_level: RiskLevel,
    pub score: u32,
    pub factors: Vec<String>,
    pub confidence: Confidence,
    pub action: String,
}

pub fn calculate_injury_risk(inputs: &InjuryRiskInputs) -> InjuryRiskAssessment {
    let mut score = 0u32;
    let mut factors = Vec::new();
    let mut data_points = 0;

    if let Some(acwr) = inputs.acwr {
        if acwr > 1.5 {
            score += 30;
            factors.push(format!("Very high ACWR ({:.2})", acwr));
        } else if acwr > 1.3 {
            score += 15;
            factors.push(format!("Elevated ACWR ({:.2})", acwr));
        }
        data_points += 1;
    }

    if let Some(sleep) = inputs.sleep_hours {
        if sleep < 6.5 {
            score += 25;
            factors.push(format!("Very low sleep ({}h)", sleep));
        } else if sleep < 7.0 {
            score += 10;
            factors.push(format!("Low sleep ({}h)", sleep));
        }
        data_points += 1;
    }

    let high_effort = inputs.effort_level >= 8.0;
    if let Some(pi) = inputs.performance_index.filter(|_| high_effort) {
        if pi < 0.98 {
            score += 20;
            factors.push("Performance dropping with high effort".to_string());
        } else if pi < 1.0 {
            score += 10;
            factors.push("Performance flat with high effort".to_string());
        }
        data_points += 1;
    }

    if inputs.days_high_strain >= 2 {
        score += 15;
        factors.push(format!("{}+ days of high strain", inputs.days_high_strain));
    }

    if inputs.readiness_score < 40 {
        score += 10;
        factors.push("Very low readiness".to_string());
    }

    if high_effort {
        score += 12;
        factors.push("High reported CNS fatigue".to_string());
    }

    if inputs.pain_flag {
        score += 8;
        factors.push("Localized pain reported".to_string());
    }

    let confidence = if data_points < 2 {
        factors.push("Too little data for a reliable assessment".to_string());
        Confidence::Low
    } else if data_points < 3 {
        Confidence::Medium
    } else {
        Confidence::High
    };

    let score = score.min(100);
    let risk_level = RiskLevel::from_score(score);

    InjuryRiskAssessment {
        risk_level,
        score,
        factors,
        confidence,
        action: risk_level.action().to_string(),
    }
}
