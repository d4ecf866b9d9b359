use chrono::{Duration, NaiveDate};
use liftready::config::EngineConfig;
use liftready::export::{export_all, ExportFormat};
use liftready::import::{DailyCsvImporter, ImportFormat, ImportManager};
use liftready::overload::OverloadVersion;
use liftready::readiness::ReadinessVersion;
use liftready::{Pipeline, SetRole};
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// End-to-end runs: CSV in, every table out

#[cfg(test)]
mod pipeline_integration_tests {
    use super::*;

    fn start() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
    }

    /// Six weeks of squat every other day and bench every third day
    fn training_csv() -> String {
        let mut csv = String::from("date,exercise,weight,reps,rpe,rir\n");
        for day in 0..42 {
            let date = start() + Duration::days(day);
            if day % 2 == 0 {
                let top = 140.0 + (day / 14) as f64 * 2.5;
                writeln!(csv, "{},Back Squat,60,5,,6", date).unwrap();
                writeln!(csv, "{},Back Squat,{},3,9,1", date, top).unwrap();
                writeln!(csv, "{},Back Squat,{},5,7,3", date, top - 20.0).unwrap();
            }
            if day % 3 == 0 {
                writeln!(csv, "{},Bench Press,50,8,,5", date).unwrap();
                writeln!(csv, "{},Bench Press,100,5,8,2", date).unwrap();
            }
        }
        csv
    }

    fn wellness_csv() -> String {
        let mut csv = String::from("date,sleep_hours,sleep_quality,fatigue,soreness,stress,motivation\n");
        for day in 0..42 {
            let date = start() + Duration::days(day);
            let sleep = if day % 5 == 0 { 6.0 } else { 7.5 };
            writeln!(csv, "{},{},4,4,3,5,7", date, sleep).unwrap();
        }
        csv
    }

    fn write_inputs(dir: &TempDir) -> (PathBuf, PathBuf) {
        let training = dir.path().join("training.csv");
        let wellness = dir.path().join("wellness.csv");
        fs::write(&training, training_csv()).unwrap();
        fs::write(&wellness, wellness_csv()).unwrap();
        (training, wellness)
    }

    fn names(paths: &[PathBuf]) -> Vec<String> {
        paths
            .iter()
            .filter_map(|p| p.file_name())
            .map(|n| n.to_string_lossy().into_owned())
            .collect()
    }

    fn line_count(path: &Path) -> usize {
        fs::read_to_string(path).unwrap().lines().count()
    }

    #[test]
    fn test_csv_roundtrip() {
        let dir = TempDir::new().unwrap();
        let (training, wellness) = write_inputs(&dir);

        let data = ImportManager::new()
            .import_inputs(&training, Some(&wellness))
            .unwrap();
        assert_eq!(data.wellness.len(), 42);

        let output = Pipeline::new(EngineConfig::default())
            .run(&data.sets, &data.wellness)
            .unwrap();

        let training_days = (0..42).filter(|d| d % 2 == 0 || d % 3 == 0).count();
        assert_eq!(output.daily.len(), training_days);
        assert_eq!(output.readiness.len(), training_days);
        assert_eq!(output.day_plans.len(), training_days);
        assert!(output
            .sets
            .iter()
            .any(|s| s.set.exercise == "back squat" && s.role == SetRole::Top));

        let out_dir = dir.path().join("out");
        let written = export_all(&output, &out_dir, ExportFormat::Csv).unwrap();
        let files = names(&written);
        for expected in [
            "sets_processed.csv",
            "exercise_day_summary.csv",
            "daily.csv",
            "weekly.csv",
            "neural_overload_daily.csv",
            "neural_overload_lifts.csv",
            "recommendations_daily.csv",
            "decision_daily.csv",
            "flags_daily.csv",
            "user_profile.json",
            "latest_insights.json",
        ] {
            assert!(files.iter().any(|f| f == expected), "missing {}", expected);
            assert!(out_dir.join(expected).exists());
        }

        assert_eq!(line_count(&out_dir.join("sets_processed.csv")), output.sets.len() + 1);
        assert_eq!(line_count(&out_dir.join("recommendations_daily.csv")), training_days + 1);
        assert_eq!(line_count(&out_dir.join("flags_daily.csv")), training_days + 1);

        let daily = DailyCsvImporter::new().import_file(&out_dir.join("daily.csv")).unwrap();
        assert_eq!(daily.len(), output.daily.len());
        assert_eq!(daily[0].date, output.daily[0].date);
        assert_eq!(daily[0].sleep_hours, output.daily[0].sleep_hours);

        let profile: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(out_dir.join("user_profile.json")).unwrap())
                .unwrap();
        assert_eq!(profile["data_quality"]["total_days"], training_days);
    }

    #[test]
    fn test_json_export_with_legacy_versions() {
        let dir = TempDir::new().unwrap();
        let (training, wellness) = write_inputs(&dir);
        let data = ImportManager::new()
            .import_inputs(&training, Some(&wellness))
            .unwrap();

        let mut config = EngineConfig::default();
        config.overload.version = OverloadVersion::V1;
        config.readiness.version = ReadinessVersion::WellnessV1;
        config.overload.key_lifts = vec!["Back Squat".to_string()];

        let output = Pipeline::new(config).run(&data.sets, &data.wellness).unwrap();
        assert!(output.overload.flags.iter().all(|f| f.exercise == "back squat"));
        for record in &output.readiness {
            assert_eq!(record.strategy, ReadinessVersion::WellnessV1);
            assert!(record.readiness_score.is_some());
        }

        let out_dir = dir.path().join("json");
        export_all(&output, &out_dir, ExportFormat::Json).unwrap();
        let readiness: serde_json::Value = serde_json::from_str(
            &fs::read_to_string(out_dir.join("recommendations_daily.json")).unwrap(),
        )
        .unwrap();
        assert_eq!(readiness.as_array().unwrap().len(), output.readiness.len());
        assert_eq!(readiness[0]["strategy"], "wellness_v1");

        let flags: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(out_dir.join("flags_daily.json")).unwrap())
                .unwrap();
        assert_eq!(flags.as_array().unwrap().len(), output.readiness.len());
        assert!(flags[0]["reason_codes"].is_string());
    }

    #[test]
    fn test_training_only_run() {
        let dir = TempDir::new().unwrap();
        let (training, _) = write_inputs(&dir);
        let data = ImportManager::new().import_inputs(&training, None).unwrap();
        assert!(data.wellness.is_empty());

        let output = Pipeline::new(EngineConfig::default())
            .run(&data.sets, &data.wellness)
            .unwrap();
        for record in &output.readiness {
            assert_eq!(record.readiness_score, None);
            assert_eq!(record.recommendation, "Need data");
        }
        let latest = output.latest.unwrap();
        assert!(latest.fatigue.is_none());
        assert!(latest.injury_risk.is_none());
    }

    #[test]
    fn test_invalid_training_file_is_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("training.csv");
        fs::write(&path, "date,exercise,weight,reps,rir\n2024-01-01,squat,100,5,12\n").unwrap();
        assert!(ImportManager::new().import_inputs(&path, None).is_err());

        fs::write(&path, "date,exercise,weight,reps\n2024-01-01,squat,100,5\n").unwrap();
        assert!(ImportManager::new().import_inputs(&path, None).is_err());
    }
}
