//! CSV writers for the output tables
//!
//! Each table has a flat row type. Headers are written explicitly so an empty
//! table still yields a file with its header line. Set-valued columns are
//! pipe-joined; nested evidence and constraints are embedded as JSON strings.

use super::ExportError;
use crate::daily_metrics::intensity_coherent;
use crate::models::{ClassifiedSet, DailyMetrics, ExerciseDaySummary, WeeklyLoad};
use crate::overload::{DailyOverloadRecord, FlagType, OverloadFlag};
use crate::readiness::{zone, DayPlan, ReadinessRecord};
use crate::stats::round_to;
use ::csv::WriterBuilder;
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeSet;
use std::path::Path;

const DECIMALS: i32 = 4;

fn round(value: f64) -> f64 {
    round_to(value, DECIMALS)
}

fn round_opt(value: Option<f64>) -> Option<f64> {
    value.map(round)
}

/// A row type with a fixed header
trait CsvRow: Serialize {
    const HEADERS: &'static [&'static str];
}

impl<R: CsvRow> CsvRow for &R {
    const HEADERS: &'static [&'static str] = R::HEADERS;
}

fn write_rows<R, P>(rows: impl IntoIterator<Item = R>, output_path: P) -> Result<(), ExportError>
where
    R: CsvRow,
    P: AsRef<Path>,
{
    let mut writer = WriterBuilder::new()
        .has_headers(false)
        .from_path(output_path)?;
    writer.write_record(R::HEADERS)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

fn flags_label(flags: &BTreeSet<FlagType>) -> String {
    if flags.is_empty() {
        return "NONE".to_string();
    }
    let mut names: Vec<&str> = flags.iter().map(|f| f.as_str()).collect();
    names.sort_unstable();
    names.join("|")
}

fn lifts_label(lifts: &BTreeSet<String>) -> String {
    lifts.iter().map(String::as_str).collect::<Vec<_>>().join("|")
}

#[derive(Serialize)]
struct SetRow<'a> {
    date: NaiveDate,
    exercise: &'a str,
    set_index: u32,
    sets: u32,
    reps: u32,
    weight: f64,
    rpe: Option<f64>,
    rir: Option<f64>,
    volume: f64,
    effort: Option<f64>,
    e1rm: Option<f64>,
    set_role: String,
    intensity_score: f64,
    is_primary_top: bool,
    intensity_coherent: Option<bool>,
}

impl CsvRow for SetRow<'_> {
    const HEADERS: &'static [&'static str] = &[
        "date",
        "exercise",
        "set_index",
        "sets",
        "reps",
        "weight",
        "rpe",
        "rir",
        "volume",
        "effort",
        "e1rm",
        "set_role",
        "intensity_score",
        "is_primary_top",
        "intensity_coherent",
    ];
}

/// Classified sets with volume, effort and the RPE/RIR coherence check
pub fn export_sets_processed<P: AsRef<Path>>(
    sets: &[ClassifiedSet],
    output_path: P,
) -> Result<(), ExportError> {
    write_rows(
        sets.iter().map(|c| SetRow {
            date: c.set.date,
            exercise: &c.set.exercise,
            set_index: c.set.set_index,
            sets: c.set.sets,
            reps: c.set.reps,
            weight: c.set.load,
            rpe: c.set.rpe,
            rir: c.set.rir,
            volume: round(c.set.volume()),
            effort: round_opt(c.set.effort()),
            e1rm: round_opt(c.e1rm),
            set_role: c.role.to_string(),
            intensity_score: round(c.intensity_score),
            is_primary_top: c.is_primary_top,
            intensity_coherent: intensity_coherent(&c.set),
        }),
        output_path,
    )
}

#[derive(Serialize)]
struct SummaryRow<'a> {
    date: NaiveDate,
    exercise: &'a str,
    top_load: Option<f64>,
    top_reps: Option<u32>,
    top_rir: Option<f64>,
    top_rpe: Option<f64>,
    top_e1rm: Option<f64>,
    backoff_volume: f64,
    backoff_mean_load_pct: Option<f64>,
    n_sets_total: u32,
    n_sets_hard: u32,
}

impl CsvRow for SummaryRow<'_> {
    const HEADERS: &'static [&'static str] = &[
        "date",
        "exercise",
        "top_load",
        "top_reps",
        "top_rir",
        "top_rpe",
        "top_e1rm",
        "backoff_volume",
        "backoff_mean_load_pct",
        "n_sets_total",
        "n_sets_hard",
    ];
}

pub fn export_exercise_day_summary<P: AsRef<Path>>(
    summaries: &[ExerciseDaySummary],
    output_path: P,
) -> Result<(), ExportError> {
    write_rows(
        summaries.iter().map(|s| SummaryRow {
            date: s.date,
            exercise: &s.exercise,
            top_load: s.top_load,
            top_reps: s.top_reps,
            top_rir: s.top_rir,
            top_rpe: s.top_rpe,
            top_e1rm: round_opt(s.top_e1rm),
            backoff_volume: round(s.backoff_volume),
            backoff_mean_load_pct: round_opt(s.backoff_mean_load_pct),
            n_sets_total: s.n_sets_total,
            n_sets_hard: s.n_sets_hard,
        }),
        output_path,
    )
}

#[derive(Serialize)]
struct DailyRow {
    date: NaiveDate,
    volume: f64,
    volume_7d: Option<f64>,
    volume_28d: Option<f64>,
    acwr_7_28: Option<f64>,
    rir_weighted: Option<f64>,
    effort_mean: Option<f64>,
    performance_index: Option<f64>,
    performance_7d_mean: Option<f64>,
    sleep_hours: Option<f64>,
    sleep_quality: Option<f64>,
    fatigue_flag: bool,
    perceived_readiness: Option<f64>,
}

impl CsvRow for DailyRow {
    const HEADERS: &'static [&'static str] = &[
        "date",
        "volume",
        "volume_7d",
        "volume_28d",
        "acwr_7_28",
        "rir_weighted",
        "effort_mean",
        "performance_index",
        "performance_7d_mean",
        "sleep_hours",
        "sleep_quality",
        "fatigue_flag",
        "perceived_readiness",
    ];
}

/// Daily derived table; readable again with `DailyCsvImporter`
pub fn export_daily<P: AsRef<Path>>(daily: &[DailyMetrics], output_path: P) -> Result<(), ExportError> {
    write_rows(
        daily.iter().map(|d| DailyRow {
            date: d.date,
            volume: round(d.volume),
            volume_7d: round_opt(d.volume_7d),
            volume_28d: round_opt(d.volume_28d),
            acwr_7_28: round_opt(d.acwr_7_28),
            rir_weighted: round_opt(d.rir_weighted),
            effort_mean: round_opt(d.effort_mean),
            performance_index: round_opt(d.performance_index),
            performance_7d_mean: round_opt(d.performance_7d_mean),
            sleep_hours: d.sleep_hours,
            sleep_quality: d.sleep_quality,
            fatigue_flag: d.fatigue_flag,
            perceived_readiness: d.perceived_readiness,
        }),
        output_path,
    )
}

#[derive(Serialize)]
struct WeeklyRow {
    week_start: NaiveDate,
    days: u32,
    volume_week: f64,
    effort_week_mean: Option<f64>,
    rir_week_mean: Option<f64>,
    monotony: Option<f64>,
    strain: Option<f64>,
}

impl CsvRow for WeeklyRow {
    const HEADERS: &'static [&'static str] = &[
        "week_start",
        "days",
        "volume_week",
        "effort_week_mean",
        "rir_week_mean",
        "monotony",
        "strain",
    ];
}

pub fn export_weekly<P: AsRef<Path>>(weekly: &[WeeklyLoad], output_path: P) -> Result<(), ExportError> {
    write_rows(
        weekly.iter().map(|w| WeeklyRow {
            week_start: w.week_start,
            days: w.days,
            volume_week: round(w.volume_week),
            effort_week_mean: round_opt(w.effort_week_mean),
            rir_week_mean: round_opt(w.rir_week_mean),
            monotony: round_opt(w.monotony),
            strain: round_opt(w.strain),
        }),
        output_path,
    )
}

#[derive(Serialize)]
struct OverloadDailyRow {
    date: NaiveDate,
    overload_score: u32,
    overload_flags: String,
    overload_lifts: String,
}

impl CsvRow for OverloadDailyRow {
    const HEADERS: &'static [&'static str] = &["date", "overload_score", "overload_flags", "overload_lifts"];
}

pub fn export_overload_daily<P: AsRef<Path>>(
    records: &[DailyOverloadRecord],
    output_path: P,
) -> Result<(), ExportError> {
    write_rows(
        records.iter().map(|r| OverloadDailyRow {
            date: r.date,
            overload_score: r.overload_score,
            overload_flags: r.flags_label(),
            overload_lifts: r.lifts_label(),
        }),
        output_path,
    )
}

#[derive(Serialize)]
struct OverloadLiftRow<'a> {
    date: NaiveDate,
    exercise: &'a str,
    flag_type: &'static str,
    severity: u32,
    evidence: String,
    recommendations: String,
}

impl CsvRow for OverloadLiftRow<'_> {
    const HEADERS: &'static [&'static str] = &[
        "date",
        "exercise",
        "flag_type",
        "severity",
        "evidence",
        "recommendations",
    ];
}

/// One row per flag; evidence and recommendations are JSON strings
pub fn export_overload_lifts<P: AsRef<Path>>(
    flags: &[OverloadFlag],
    output_path: P,
) -> Result<(), ExportError> {
    let rows = flags
        .iter()
        .map(|f| {
            Ok(OverloadLiftRow {
                date: f.date,
                exercise: &f.exercise,
                flag_type: f.flag_type.as_str(),
                severity: f.severity,
                evidence: serde_json::to_string(&f.evidence)?,
                recommendations: serde_json::to_string(&f.recommendations)?,
            })
        })
        .collect::<Result<Vec<_>, ExportError>>()?;
    write_rows(rows, output_path)
}

#[derive(Serialize)]
struct RecommendationRow<'a> {
    date: NaiveDate,
    strategy: &'static str,
    readiness_score: Option<u32>,
    readiness_uncapped: Option<u32>,
    readiness_zone: String,
    recommendation: &'a str,
    action_intensity: &'a str,
    reason_codes: String,
    explanation: &'a str,
    overload_score: u32,
    overload_lifts: String,
    understim: bool,
    high_strain_day: bool,
    cycle_phase: Option<&'static str>,
    components: String,
}

impl CsvRow for RecommendationRow<'_> {
    const HEADERS: &'static [&'static str] = &[
        "date",
        "strategy",
        "readiness_score",
        "readiness_uncapped",
        "readiness_zone",
        "recommendation",
        "action_intensity",
        "reason_codes",
        "explanation",
        "overload_score",
        "overload_lifts",
        "understim",
        "high_strain_day",
        "cycle_phase",
        "components",
    ];
}

pub fn export_recommendations<P: AsRef<Path>>(
    records: &[ReadinessRecord],
    output_path: P,
) -> Result<(), ExportError> {
    let rows = records
        .iter()
        .map(|r| {
            let components: serde_json::Map<String, serde_json::Value> = r
                .components
                .components
                .iter()
                .map(|c| (c.name.clone(), serde_json::json!(round(c.score))))
                .collect();
            Ok(RecommendationRow {
                date: r.date,
                strategy: r.strategy.as_str(),
                readiness_score: r.readiness_score,
                readiness_uncapped: r.readiness_uncapped,
                readiness_zone: zone(r.readiness_score).to_string(),
                recommendation: &r.recommendation,
                action_intensity: &r.action_intensity,
                reason_codes: r.reasons_label(),
                explanation: &r.explanation,
                overload_score: r.overload_score,
                overload_lifts: lifts_label(&r.overload_lifts),
                understim: r.understim,
                high_strain_day: r.high_strain_day,
                cycle_phase: r.cycle_phase.map(|p| p.as_str()),
                components: serde_json::to_string(&components)?,
            })
        })
        .collect::<Result<Vec<_>, ExportError>>()?;
    write_rows(rows, output_path)
}

/// One row of `flags_daily`: the decision next to the inputs that drove it
#[derive(Debug, Serialize)]
pub struct FlagsDailyRow<'a> {
    date: NaiveDate,
    readiness_score: Option<u32>,
    recommendation: &'a str,
    action_intensity: &'a str,
    reason_codes: String,
    sleep_hours: Option<f64>,
    sleep_quality: Option<f64>,
    acwr_7_28: Option<f64>,
    performance_index: Option<f64>,
    performance_7d_mean: Option<f64>,
    rir_weighted: Option<f64>,
    effort_mean: Option<f64>,
    fatigue_flag: bool,
    flag_high_strain_day: bool,
    flag_understim: bool,
}

impl CsvRow for FlagsDailyRow<'_> {
    const HEADERS: &'static [&'static str] = &[
        "date",
        "readiness_score",
        "recommendation",
        "action_intensity",
        "reason_codes",
        "sleep_hours",
        "sleep_quality",
        "acwr_7_28",
        "performance_index",
        "performance_7d_mean",
        "rir_weighted",
        "effort_mean",
        "fatigue_flag",
        "flag_high_strain_day",
        "flag_understim",
    ];
}

/// Pair each decision with the daily row of the same date
pub fn flags_daily_rows<'a>(
    records: &'a [ReadinessRecord],
    daily: &'a [DailyMetrics],
) -> Vec<FlagsDailyRow<'a>> {
    records
        .iter()
        .zip(daily)
        .filter(|(r, d)| r.date == d.date)
        .map(|(r, d)| FlagsDailyRow {
            date: r.date,
            readiness_score: r.readiness_score,
            recommendation: &r.recommendation,
            action_intensity: &r.action_intensity,
            reason_codes: r.reasons_label(),
            sleep_hours: d.sleep_hours,
            sleep_quality: d.sleep_quality,
            acwr_7_28: round_opt(d.acwr_7_28),
            performance_index: round_opt(d.performance_index),
            performance_7d_mean: round_opt(d.performance_7d_mean),
            rir_weighted: round_opt(d.rir_weighted),
            effort_mean: round_opt(d.effort_mean),
            fatigue_flag: d.fatigue_flag,
            flag_high_strain_day: r.high_strain_day,
            flag_understim: r.understim,
        })
        .collect()
}

pub fn export_flags_daily<P: AsRef<Path>>(
    rows: &[FlagsDailyRow<'_>],
    output_path: P,
) -> Result<(), ExportError> {
    write_rows(rows.iter(), output_path)
}

#[derive(Serialize)]
struct DayPlanRow {
    date: NaiveDate,
    day_status: &'static str,
    readiness_score: Option<u32>,
    overload_score: u32,
    reason_codes: String,
    affected_lifts: String,
    lift_constraints: String,
    session_headline: String,
    target_rir: Option<String>,
    volume_change: Option<String>,
    avoid: String,
    session_rules: String,
    session_notes: String,
}

impl CsvRow for DayPlanRow {
    const HEADERS: &'static [&'static str] = &[
        "date",
        "day_status",
        "readiness_score",
        "overload_score",
        "reason_codes",
        "affected_lifts",
        "lift_constraints",
        "session_headline",
        "target_rir",
        "volume_change",
        "avoid",
        "session_rules",
        "session_notes",
    ];
}

pub fn export_day_plans<P: AsRef<Path>>(plans: &[DayPlan], output_path: P) -> Result<(), ExportError> {
    let rows = plans
        .iter()
        .map(|p| {
            Ok(DayPlanRow {
                date: p.date,
                day_status: p.day_status.as_str(),
                readiness_score: p.readiness_score,
                overload_score: p.overload_score,
                reason_codes: flags_label(&p.reason_codes),
                affected_lifts: lifts_label(&p.affected_lifts),
                lift_constraints: serde_json::to_string(&p.lift_constraints)?,
                session_headline: p.session.headline.clone(),
                target_rir: p.session.target_rir.clone(),
                volume_change: p.session.volume_change.clone(),
                avoid: p.session.avoid.join("|"),
                session_rules: serde_json::to_string(&p.session.rules)?,
                session_notes: serde_json::to_string(&p.session.notes)?,
            })
        })
        .collect::<Result<Vec<_>, ExportError>>()?;
    write_rows(rows, output_path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::import::{DailyCsvImporter, ImportFormat};
    use crate::overload::Evidence;
    use serde_json::json;
    use std::fs;
    use tempfile::TempDir;

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, day).unwrap()
    }

    #[test]
    fn test_empty_table_keeps_header() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("weekly.csv");
        export_weekly(&[], &path).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(
            content.trim_end(),
            "week_start,days,volume_week,effort_week_mean,rir_week_mean,monotony,strain"
        );
    }

    #[test]
    fn test_overload_daily_labels() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("neural_overload_daily.csv");
        let mut record = DailyOverloadRecord::none(date(3));
        record.overload_score = 42;
        record.overload_flags.insert(FlagType::FixedLoadDrift);
        record.overload_flags.insert(FlagType::CnsCostRising);
        record.overload_lifts.insert("squat".to_string());
        record.overload_lifts.insert("bench press".to_string());

        export_overload_daily(&[record, DailyOverloadRecord::none(date(4))], &path).unwrap();
        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines[1], "2024-06-03,42,CNS_COST_RISING|FIXED_LOAD_DRIFT,bench press|squat");
        assert_eq!(lines[2], "2024-06-04,0,NONE,");
    }

    #[test]
    fn test_overload_lifts_embed_json() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("neural_overload_lifts.csv");
        let mut evidence = Evidence::new();
        evidence.insert("prop_rir_le_1".into(), json!(0.8));
        evidence.insert("window_sessions".into(), json!(5));
        let flag = OverloadFlag {
            date: date(3),
            exercise: "squat".to_string(),
            flag_type: FlagType::SustainedNearFailure,
            severity: 24,
            evidence,
            recommendations: vec!["Cap top sets at RIR 2".to_string()],
        };

        export_overload_lifts(&[flag], &path).unwrap();
        let mut reader = ::csv::Reader::from_path(&path).unwrap();
        let record = reader.records().next().unwrap().unwrap();
        assert_eq!(&record[2], "SUSTAINED_NEAR_FAILURE");
        let evidence: serde_json::Value = serde_json::from_str(&record[4]).unwrap();
        assert_eq!(evidence["window_sessions"], json!(5));
        let keys: Vec<&String> = evidence.as_object().unwrap().keys().collect();
        assert_eq!(keys, vec!["prop_rir_le_1", "window_sessions"]);
        let recs: Vec<String> = serde_json::from_str(&record[5]).unwrap();
        assert_eq!(recs, vec!["Cap top sets at RIR 2".to_string()]);
    }

    #[test]
    fn test_daily_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("daily.csv");
        let mut day = DailyMetrics::empty(date(3));
        day.volume = 4200.0;
        day.acwr_7_28 = Some(1.123456);
        day.sleep_hours = Some(7.5);
        day.fatigue_flag = true;

        export_daily(&[day.clone(), DailyMetrics::empty(date(4))], &path).unwrap();
        let back = DailyCsvImporter::new().import_file(&path).unwrap();

        assert_eq!(back.len(), 2);
        assert_eq!(back[0].volume, 4200.0);
        assert_eq!(back[0].acwr_7_28, Some(1.1235));
        assert_eq!(back[0].sleep_hours, Some(7.5));
        assert!(back[0].fatigue_flag);
        assert_eq!(back[1].volume_7d, None);
        assert!(!back[1].fatigue_flag);
    }

    #[test]
    fn test_flags_daily_joins_decision_and_inputs() {
        use crate::overload::DailyOverloadRecord;
        use crate::readiness::{DecisionEngine, ReadinessVersion};

        let mut day = DailyMetrics::empty(date(3));
        day.sleep_hours = Some(5.5);
        day.sleep_quality = Some(3.0);
        day.performance_index = Some(1.0);
        day.rir_weighted = Some(0.5);
        day.effort_mean = Some(9.0);
        let daily = vec![day, DailyMetrics::empty(date(4))];
        let overload = vec![DailyOverloadRecord::none(date(3)), DailyOverloadRecord::none(date(4))];
        let records = DecisionEngine::new(ReadinessVersion::Objective).evaluate_all(&daily, &overload);

        let rows = flags_daily_rows(&records, &daily);
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("flags_daily.csv");
        export_flags_daily(&rows, &path).unwrap();

        let mut reader = ::csv::Reader::from_path(&path).unwrap();
        let headers = reader.headers().unwrap().clone();
        assert_eq!(&headers[4], "reason_codes");
        assert_eq!(&headers[14], "flag_understim");

        let rows: Vec<::csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 2);
        assert_eq!(&rows[0][0], "2024-06-03");
        assert!(rows[0][4].starts_with("LOW_SLEEP"));
        assert!(rows[0][4].contains("HIGH_STRAIN_DAY"));
        assert_eq!(&rows[0][5], "5.5");
        assert_eq!(&rows[0][13], "true");
        assert_eq!(&rows[1][1], "");
        assert_eq!(&rows[1][2], "Need data");
    }

    #[test]
    fn test_day_plan_carries_session_columns() {
        use crate::readiness::{session_plan, DayPlan, DayStatus};

        let mut entry = crate::models::WellnessEntry::new(date(3), 7.0, 4.0);
        entry.pain_flag = true;
        entry.pain_location = Some("knee".to_string());
        let plan = DayPlan {
            date: date(3),
            day_status: DayStatus::GoWithConstraints,
            readiness_score: Some(65),
            overload_score: 0,
            reason_codes: BTreeSet::new(),
            affected_lifts: BTreeSet::new(),
            lift_constraints: Vec::new(),
            session: session_plan(Some(65), Some(&entry)),
        };

        let dir = TempDir::new().unwrap();
        let path = dir.path().join("decision_daily.csv");
        export_day_plans(&[plan], &path).unwrap();

        let mut reader = ::csv::Reader::from_path(&path).unwrap();
        assert_eq!(&reader.headers().unwrap()[7], "session_headline");
        let record = reader.records().next().unwrap().unwrap();
        assert_eq!(&record[1], "GO_WITH_CONSTRAINTS");
        assert_eq!(&record[7], "Normal: keep technique");
        assert_eq!(&record[8], "2-3");
        assert_eq!(&record[10], "deep squat|leg extensions|jumps");
        let rules: Vec<String> = serde_json::from_str(&record[11]).unwrap();
        assert!(rules.contains(&"Stop if pain in the knee gets worse".to_string()));
    }
}
