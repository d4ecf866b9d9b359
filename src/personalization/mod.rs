//! Personalization layer
//!
//! Everything here is relative to one user's own history: percentile
//! baselines, the kind of fatigue they report today, an injury-risk score, a
//! suggested week and a profile summarizing how they respond to sleep and load.

pub mod baselines;
pub mod fatigue;
pub mod injury;
pub mod profile;
pub mod weekly;

pub use baselines::{
    calculate_baselines, contextualize_readiness, BaselineSet, DataQuality, PersonalBaseline,
    PersonalizationConfig, ReadinessContext,
};
pub use fatigue::{detect_fatigue_type, FatigueClassification, FatigueType, TargetSplit};
pub use injury::{calculate_injury_risk, Confidence, InjuryRiskAssessment, InjuryRiskInputs, RiskLevel};
pub use profile::{build_user_profile, UserProfile};
pub use weekly::{suggest_weekly_sequence, DayType, PlannedDay, WeeklyPlan};
