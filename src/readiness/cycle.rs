//! Menstrual-cycle phase adjustment
//!
//! A check-in with a cycle day gets phase factors for energy, recovery and
//! fatigue sensitivity. Symptoms push the factors further. The factors scale
//! the matching readiness components before they are summed.

use super::components::ComponentBreakdown;
use crate::models::WellnessEntry;
use crate::stats::clip01;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Cycle days past this count as late luteal
pub const CYCLE_LENGTH: u8 = 28;

/// Symptom ratings run 0-5
const SYMPTOM_MAX: f64 = 5.0;

/// Symptom level above which the plan gets symptom advice
const SYMPTOM_ADVICE_LEVEL: f64 = 2.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CyclePhase {
    /// Days 1-5
    Menstrual,
    /// Days 6-14
    Follicular,
    /// Day 15
    Ovulation,
    /// Days 16-21
    EarlyLuteal,
    /// Days 22-28
    LateLuteal,
}

impl CyclePhase {
    pub fn from_day(day: u8) -> Self {
        match day.clamp(1, CYCLE_LENGTH) {
            1..=5 => CyclePhase::Menstrual,
            6..=14 => CyclePhase::Follicular,
            15 => CyclePhase::Ovulation,
            16..=21 => CyclePhase::EarlyLuteal,
            _ => CyclePhase::LateLuteal,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CyclePhase::Menstrual => "menstrual",
            CyclePhase::Follicular => "follicular",
            CyclePhase::Ovulation => "ovulation",
            CyclePhase::EarlyLuteal => "early_luteal",
            CyclePhase::LateLuteal => "late_luteal",
        }
    }

    /// (energy, recovery, fatigue sensitivity)
    fn factors(&self) -> (f64, f64, f64) {
        match self {
            CyclePhase::Menstrual => (0.85, 0.90, 1.25),
            CyclePhase::Follicular => (1.10, 1.05, 0.85),
            CyclePhase::Ovulation => (1.15, 1.02, 0.80),
            CyclePhase::EarlyLuteal => (1.05, 1.00, 1.00),
            CyclePhase::LateLuteal => (0.90, 0.85, 1.35),
        }
    }

    fn is_low_energy(&self) -> bool {
        matches!(self, CyclePhase::Menstrual | CyclePhase::LateLuteal)
    }
}

impl fmt::Display for CyclePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Phase and symptom factors for one check-in
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CycleAdjustment {
    pub day: u8,
    pub phase: CyclePhase,
    pub energy_factor: f64,
    pub recovery_factor: f64,
    pub fatigue_sensitivity: f64,
    pub recommendations: Vec<String>,
}

impl CycleAdjustment {
    pub fn new(day: u8, cramping: Option<f64>, bloating: Option<f64>) -> Self {
        let phase = CyclePhase::from_day(day);
        let (mut energy, mut recovery, mut sensitivity) = phase.factors();

        let cramping = cramping.unwrap_or(0.0).clamp(0.0, SYMPTOM_MAX);
        let bloating = bloating.unwrap_or(0.0).clamp(0.0, SYMPTOM_MAX);
        energy *= 1.0 - cramping / SYMPTOM_MAX * 0.15;
        recovery *= 1.0 - cramping / SYMPTOM_MAX * 0.10;
        sensitivity *= 1.0 + bloating / SYMPTOM_MAX * 0.20;

        let mut recommendations = Vec::new();
        if phase.is_low_energy() {
            if cramping > SYMPTOM_ADVICE_LEVEL {
                recommendations.push("Cramping: ease off bracing-heavy lifts and consider pain relief".to_string());
            }
            recommendations.push("Favor active recovery and technique work".to_string());
            recommendations.push("Aim for 30-60 extra minutes of sleep".to_string());
        } else if matches!(phase, CyclePhase::Follicular | CyclePhase::Ovulation) {
            recommendations.push("Good window for PR attempts and extra volume".to_string());
            recommendations.push("Accumulated fatigue is usually well tolerated now".to_string());
        }
        if bloating > SYMPTOM_ADVICE_LEVEL {
            recommendations.push("Bloating: hydrate more and keep salt moderate".to_string());
        }

        Self {
            day,
            phase,
            energy_factor: energy,
            recovery_factor: recovery,
            fatigue_sensitivity: sensitivity,
            recommendations,
        }
    }

    /// `None` when the check-in has no cycle day
    pub fn from_entry(entry: &WellnessEntry) -> Option<Self> {
        entry
            .cycle_day
            .map(|day| Self::new(day, entry.cramping, entry.bloating))
    }

    /// Scale positive blended components by their phase factor
    ///
    /// Energy and drive terms take the energy factor, sleep and soreness terms
    /// the recovery factor. Fatigue and stress terms have their deficit from
    /// 1.0 multiplied by the fatigue sensitivity. Penalties are untouched.
    pub fn apply(&self, breakdown: &mut ComponentBreakdown) {
        for component in breakdown
            .components
            .iter_mut()
            .filter(|c| c.blended && c.weight > 0.0)
        {
            component.score = match component.name.as_str() {
                "energy" | "motivation" | "state" => {
                    clip01(component.score * self.energy_factor)
                }
                "sleep" | "sleep_hours" | "sleep_quality" | "soreness" => {
                    clip01(component.score * self.recovery_factor)
                }
                "fatigue" | "stress" => {
                    clip01(1.0 - (1.0 - component.score) * self.fatigue_sensitivity)
                }
                _ => continue,
            };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::readiness::components::Component;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_phase_boundaries() {
        assert_eq!(CyclePhase::from_day(0), CyclePhase::Menstrual);
        assert_eq!(CyclePhase::from_day(5), CyclePhase::Menstrual);
        assert_eq!(CyclePhase::from_day(6), CyclePhase::Follicular);
        assert_eq!(CyclePhase::from_day(15), CyclePhase::Ovulation);
        assert_eq!(CyclePhase::from_day(21), CyclePhase::EarlyLuteal);
        assert_eq!(CyclePhase::from_day(22), CyclePhase::LateLuteal);
        assert_eq!(CyclePhase::from_day(35), CyclePhase::LateLuteal);
        assert_eq!(CyclePhase::EarlyLuteal.to_string(), "early_luteal");
    }

    #[test]
    fn test_symptoms_shift_factors() {
        let plain = CycleAdjustment::new(2, None, None);
        assert!(approx(plain.energy_factor, 0.85));
        assert!(approx(plain.fatigue_sensitivity, 1.25));
        assert_eq!(plain.recommendations.len(), 2);

        let symptomatic = CycleAdjustment::new(2, Some(5.0), Some(5.0));
        assert!(approx(symptomatic.energy_factor, 0.85 * 0.85));
        assert!(approx(symptomatic.recovery_factor, 0.90 * 0.90));
        assert!(approx(symptomatic.fatigue_sensitivity, 1.25 * 1.20));
        assert!(symptomatic.recommendations[0].starts_with("Cramping"));
        assert!(symptomatic.recommendations.last().unwrap().starts_with("Bloating"));

        let follicular = CycleAdjustment::new(10, None, None);
        assert!(follicular.recommendations[0].contains("PR attempts"));
    }

    #[test]
    fn test_apply_scales_matching_components() {
        let mut breakdown = ComponentBreakdown::new(
            vec![
                Component::new("energy", 0.8, 0.10),
                Component::new("sleep_hours", 1.0, 0.25),
                Component::new("fatigue", 0.6, 0.12),
                Component::new("stiffness", 0.5, -0.10),
                Component::penalty("pain", true, 0.25),
            ],
            None,
        );
        CycleAdjustment::new(24, None, None).apply(&mut breakdown);

        assert!(approx(breakdown.get("energy").unwrap(), 0.72));
        assert!(approx(breakdown.get("sleep_hours").unwrap(), 0.85));
        assert!(approx(breakdown.get("fatigue").unwrap(), 0.46));
        assert_eq!(breakdown.get("stiffness"), Some(0.5));
        assert_eq!(breakdown.get("pain"), Some(1.0));
    }

    #[test]
    fn test_from_entry_needs_cycle_day() {
        let date = chrono::NaiveDate::from_ymd_opt(2024, 6, 3).unwrap();
        let mut entry = WellnessEntry::new(date, 7.0, 4.0);
        assert!(CycleAdjustment::from_entry(&entry).is_none());
        entry.cycle_day = Some(15);
        entry.cramping = Some(1.0);
        let adjustment = CycleAdjustment::from_entry(&entry).unwrap();
        assert_eq!(adjustment.phase, CyclePhase::Ovulation);
        assert!(approx(adjustment.energy_factor, 1.15 * 0.97));
    }
}
