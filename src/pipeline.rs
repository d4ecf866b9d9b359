//! Full-history recomputation
//!
//! The pipeline is a pure function of the configuration, the training log and
//! the wellness log. Every stage reads the output of the previous one and
//! nothing is written back upstream.

use crate::config::EngineConfig;
use crate::daily_metrics::{consecutive_high_strain_days, DailyMetricsBuilder};
use crate::error::Result;
use crate::import::{TrainingValidator, WellnessValidator};
use crate::models::{
    ClassifiedSet, DailyMetrics, ExerciseDaySummary, TrainingSet, WeeklyLoad, WellnessEntry,
};
use crate::overload::aggregate::lookup;
use crate::overload::{
    aggregate_daily, recovery_cross_check, CrossCheckCause, DailyOverloadRecord, OverloadDetector,
    OverloadFlag, OverloadReport,
};
use crate::personalization::{
    build_user_profile, calculate_baselines, calculate_injury_risk, contextualize_readiness,
    detect_fatigue_type, suggest_weekly_sequence, FatigueClassification, InjuryRiskAssessment,
    InjuryRiskInputs, ReadinessContext, UserProfile, WeeklyPlan,
};
use crate::readiness::wellness::wellness_v2_components;
use crate::readiness::{
    build_day_plan, zone, DayPlan, DecisionEngine, ReadinessRecord, ReadinessVersion, ReadinessZone,
    WellnessV3,
};
use crate::set_classifier::SetClassifier;
use crate::stats;
use crate::summary::summarize;
use chrono::NaiveDate;
use serde::Serialize;
use tracing::{info, info_span, warn};

/// Weeks of strain averaged for the weekly plan
const RECENT_STRAIN_WEEKS: usize = 4;

/// Days of readiness averaged for the weekly plan
const RECENT_READINESS_DAYS: usize = 7;

/// Readiness mean used when no day could be scored
const NEUTRAL_READINESS_MEAN: f64 = 60.0;

/// Every table produced by one run
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub sets: Vec<ClassifiedSet>,
    pub summaries: Vec<ExerciseDaySummary>,
    pub daily: Vec<DailyMetrics>,
    pub weekly: Vec<WeeklyLoad>,
    pub overload: OverloadReport,

    /// Set when the recovery cross-check ran on the latest day's flags
    pub cross_check: Option<CrossCheckCause>,

    /// One record per training day, including days without flags
    pub overload_daily: Vec<DailyOverloadRecord>,
    pub readiness: Vec<ReadinessRecord>,
    pub day_plans: Vec<DayPlan>,
    pub profile: UserProfile,
    pub latest: Option<LatestInsights>,
}

impl PipelineOutput {
    pub fn latest_record(&self) -> Option<&ReadinessRecord> {
        self.readiness.last()
    }
}

/// Personalized view of the most recent training day
#[derive(Debug, Clone, Serialize)]
pub struct LatestInsights {
    pub date: NaiveDate,
    pub readiness_score: Option<u32>,
    pub zone: ReadinessZone,
    pub context: Option<ReadinessContext>,

    /// From the most recent wellness check-in, if any
    pub fatigue: Option<FatigueClassification>,
    pub injury_risk: Option<InjuryRiskAssessment>,
    pub weekly_plan: WeeklyPlan,
}

pub struct Pipeline {
    config: EngineConfig,
}

impl Pipeline {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Recompute every output table from the raw inputs
    ///
    /// An empty `daily.key_lifts` falls back to `overload.key_lifts` for the
    /// performance index; with both empty every exercise feeds it. The
    /// curve-based readiness formula is centered on the sleep baseline of
    /// this same history.
    pub fn run(&self, sets: &[TrainingSet], wellness: &[WellnessEntry]) -> Result<PipelineOutput> {
        let span = info_span!("pipeline", sets = sets.len(), wellness = wellness.len());
        let _enter = span.enter();

        TrainingValidator::validate_sets(sets)?;
        WellnessValidator::validate_entries(wellness)?;
        if sets.is_empty() {
            warn!("No training sets; every table will be empty");
        }

        let mut daily_config = self.config.daily.clone();
        if daily_config.key_lifts.is_empty() {
            daily_config.key_lifts = self.config.overload.key_lifts.clone();
        }
        let builder = DailyMetricsBuilder::with_config(daily_config);
        let daily = builder.build(sets, wellness);
        let weekly = builder.weekly(&daily);

        let classified = SetClassifier::with_config(self.config.classifier.clone()).classify_all(sets);
        let summaries = summarize(&classified);

        let mut overload = OverloadDetector::from_settings(&self.config.overload).detect(&summaries);
        let mut cross_check = None;
        if self.config.overload.recovery_cross_check {
            let (flags, cause) = self.cross_check(std::mem::take(&mut overload.flags), &daily, &weekly);
            overload.flags = flags;
            cross_check = cause;
        }

        let flagged = aggregate_daily(&overload.flags, self.config.overload.score_cap);
        let overload_daily: Vec<DailyOverloadRecord> =
            daily.iter().map(|d| lookup(&flagged, d.date)).collect();

        let mut engine = DecisionEngine::from_settings(&self.config.readiness);
        if self.config.readiness.version == ReadinessVersion::WellnessV3 {
            let baselines = calculate_baselines(&daily, &[], &weekly, &self.config.personalization);
            engine = engine.with_strategy(Box::new(WellnessV3::from_baselines(&baselines)));
        }
        let readiness = engine.evaluate_all(&daily, &overload_daily);

        let day_plans: Vec<DayPlan> = readiness
            .iter()
            .zip(&daily)
            .zip(&overload_daily)
            .map(|((record, day), day_overload)| {
                build_day_plan(record, day, day_overload, &overload.flags)
            })
            .collect();

        let scores: Vec<(NaiveDate, f64)> = readiness
            .iter()
            .filter_map(|r| r.readiness_score.map(|s| (r.date, s as f64)))
            .collect();
        let profile = build_user_profile(&daily, &scores, &weekly, &self.config.personalization);
        let latest = latest_insights(&daily, &weekly, &readiness, &profile, wellness);

        info!(
            "Pipeline complete: {} sets, {} days, {} flags, {} advanced lifts",
            classified.len(),
            daily.len(),
            overload.flags.len(),
            overload.advanced_lifts().len()
        );

        Ok(PipelineOutput {
            sets: classified,
            summaries,
            daily,
            weekly,
            overload,
            cross_check,
            overload_daily,
            readiness,
            day_plans,
            profile,
            latest,
        })
    }

    /// Apply the recovery cross-check to the flags of the latest training day
    fn cross_check(
        &self,
        flags: Vec<OverloadFlag>,
        daily: &[DailyMetrics],
        weekly: &[WeeklyLoad],
    ) -> (Vec<OverloadFlag>, Option<CrossCheckCause>) {
        let Some(latest) = daily.last() else {
            return (flags, None);
        };
        let sleep_p50 = calculate_baselines(daily, &[], weekly, &self.config.personalization).sleep_p50();

        let (todays, mut merged): (Vec<OverloadFlag>, Vec<OverloadFlag>) =
            flags.into_iter().partition(|f| f.date == latest.date);
        let (adjusted, cause) =
            recovery_cross_check(&todays, latest.sleep_hours, sleep_p50, latest.acwr_7_28);
        info!("Recovery cross-check on {}: {:?}", latest.date, cause);

        merged.extend(adjusted);
        (merged, Some(cause))
    }
}

fn latest_insights(
    daily: &[DailyMetrics],
    weekly: &[WeeklyLoad],
    readiness: &[ReadinessRecord],
    profile: &UserProfile,
    wellness: &[WellnessEntry],
) -> Option<LatestInsights> {
    let day = daily.last()?;
    let record = readiness.last()?;
    let baselines = &profile.baselines;

    let fatigue = wellness.iter().max_by_key(|e| e.date).map(|entry| {
        let instant = wellness_v2_components(entry).score();
        detect_fatigue_type(entry, baselines, instant)
    });

    let injury_risk = record.readiness_score.map(|score| {
        calculate_injury_risk(&InjuryRiskInputs {
            readiness_score: score,
            acwr: day.acwr_7_28,
            sleep_hours: day.sleep_hours,
            performance_index: day.performance_index,
            effort_level: day.effort_mean.unwrap_or(0.0),
            pain_flag: day.wellness.as_ref().map_or(false, |w| w.pain_flag),
            days_high_strain: consecutive_high_strain_days(daily, weekly, day.date, baselines.strain_p75),
        })
    });

    let strain_recent: Vec<f64> = weekly
        .iter()
        .rev()
        .filter_map(|w| w.strain)
        .take(RECENT_STRAIN_WEEKS)
        .collect();
    let monotony = weekly.iter().rev().find_map(|w| w.monotony).unwrap_or(0.0);
    let recent_scores: Vec<f64> = readiness
        .iter()
        .rev()
        .filter_map(|r| r.readiness_score.map(f64::from))
        .take(RECENT_READINESS_DAYS)
        .collect();
    let readiness_mean = stats::mean(&recent_scores).unwrap_or(NEUTRAL_READINESS_MEAN);
    let weekly_plan = suggest_weekly_sequence(&strain_recent, monotony, readiness_mean, baselines.strain_p75);

    Some(LatestInsights {
        date: day.date,
        readiness_score: record.readiness_score,
        zone: zone(record.readiness_score),
        context: record.readiness_score.map(|s| contextualize_readiness(s, baselines)),
        fatigue,
        injury_risk,
        weekly_plan,
    })
}
