//! Recovery cross-check
//!
//! Separates overload that coincides with poor recovery from overload that
//! appears while sleep and load are fine (neural fatigue or programming).

use super::{FlagType, OverloadFlag};
use serde::{Deserialize, Serialize};
use serde_json::json;

/// Most likely driver of the flags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CrossCheckCause {
    RecoveryDriven,
    NeuralDriven,
    None,
}

const RECOVERY_RECOMMENDATION: &str = "Prioritize sleep and recovery before intensifying";
const NEURAL_NOTE: &str = "Likely cause: accumulated neural fatigue or too many RIR0 sets";

/// Adjust flags by the recovery context of the latest day
///
/// Poor recovery (sleep below the personal median by more than 0.5 h, or
/// ACWR above 1.3) scales severities by 1.15. Otherwise flags are tagged as
/// neural or programming driven.
pub fn recovery_cross_check(
    flags: &[OverloadFlag],
    sleep_hours: Option<f64>,
    sleep_p50: Option<f64>,
    acwr: Option<f64>,
) -> (Vec<OverloadFlag>, CrossCheckCause) {
    if flags.is_empty() {
        return (Vec::new(), CrossCheckCause::None);
    }

    let poor_sleep = matches!((sleep_hours, sleep_p50), (Some(h), Some(p50)) if h < p50 - 0.5);
    let load_spike = acwr.map_or(false, |a| a > 1.3);
    let recovery_issue = poor_sleep || load_spike;

    let adjusted = flags
        .iter()
        .map(|flag| {
            let mut adjusted = flag.clone();
            if recovery_issue {
                adjusted.severity = flag.severity * 115 / 100;
                adjusted.evidence.insert("recovery_adjusted".into(), json!(true));
                if !adjusted.recommendations.iter().any(|r| r == RECOVERY_RECOMMENDATION) {
                    adjusted.recommendations.insert(0, RECOVERY_RECOMMENDATION.to_string());
                }
            } else {
                adjusted
                    .evidence
                    .insert("likely_cause".into(), json!("neural_fatigue_or_programming"));
                if matches!(flag.flag_type, FlagType::PlateauEffortRise | FlagType::FixedLoadDrift) {
                    adjusted.recommendations.push(NEURAL_NOTE.to_string());
                }
            }
            adjusted
        })
        .collect();

    let cause = if recovery_issue {
        CrossCheckCause::RecoveryDriven
    } else {
        CrossCheckCause::NeuralDriven
    };
    (adjusted, cause)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::overload::Evidence;
    use chrono::NaiveDate;

    fn drift_flag() -> OverloadFlag {
        OverloadFlag {
            date: NaiveDate::from_ymd_opt(2024, 4, 2).unwrap(),
            exercise: "squat".to_string(),
            flag_type: FlagType::FixedLoadDrift,
            severity: 20,
            evidence: Evidence::new(),
            recommendations: vec!["No PR attempts on squat this week".to_string()],
        }
    }

    #[test]
    fn test_poor_sleep_scales_severity() {
        let (flags, cause) = recovery_cross_check(&[drift_flag()], Some(6.0), Some(7.5), Some(1.0));
        assert_eq!(cause, CrossCheckCause::RecoveryDriven);
        assert_eq!(flags[0].severity, 23);
        assert_eq!(flags[0].recommendations[0], RECOVERY_RECOMMENDATION);
        assert_eq!(flags[0].evidence["recovery_adjusted"], json!(true));
    }

    #[test]
    fn test_good_recovery_points_to_neural_fatigue() {
        let (flags, cause) = recovery_cross_check(&[drift_flag()], Some(7.5), Some(7.5), None);
        assert_eq!(cause, CrossCheckCause::NeuralDriven);
        assert_eq!(flags[0].severity, 20);
        assert_eq!(flags[0].recommendations.last().unwrap(), NEURAL_NOTE);
    }

    #[test]
    fn test_no_flags_no_cause() {
        let (flags, cause) = recovery_cross_check(&[], Some(4.0), Some(8.0), Some(2.0));
        assert!(flags.is_empty());
        assert_eq!(cause, CrossCheckCause::None);
    }
}
