use crate::pipeline::PipelineOutput;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

pub mod csv;
pub mod json;

pub const SETS_PROCESSED: &str = "sets_processed";
pub const EXERCISE_DAY_SUMMARY: &str = "exercise_day_summary";
pub const DAILY: &str = "daily";
pub const WEEKLY: &str = "weekly";
pub const NEURAL_OVERLOAD_DAILY: &str = "neural_overload_daily";
pub const NEURAL_OVERLOAD_LIFTS: &str = "neural_overload_lifts";
pub const RECOMMENDATIONS_DAILY: &str = "recommendations_daily";
pub const DECISION_DAILY: &str = "decision_daily";
pub const FLAGS_DAILY: &str = "flags_daily";
pub const USER_PROFILE: &str = "user_profile";
pub const LATEST_INSIGHTS: &str = "latest_insights";

/// Export format types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Csv,
    Json,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Json => "json",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.extension())
    }
}

impl std::str::FromStr for ExportFormat {
    type Err = ExportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "csv" => Ok(ExportFormat::Csv),
            "json" => Ok(ExportFormat::Json),
            _ => Err(ExportError::UnsupportedFormat(s.to_string())),
        }
    }
}

/// Export errors
#[derive(Error, Debug)]
pub enum ExportError {
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] ::csv::Error),
    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl From<serde_json::Error> for ExportError {
    fn from(error: serde_json::Error) -> Self {
        ExportError::SerializationError(error.to_string())
    }
}

fn table_path(dir: &Path, table: &str, format: ExportFormat) -> PathBuf {
    dir.join(format!("{}.{}", table, format.extension()))
}

/// Write every output table of a run into `dir`
///
/// The profile and latest insights are always JSON; the tables follow `format`.
/// Returns the written paths in write order.
pub fn export_all(
    output: &PipelineOutput,
    dir: &Path,
    format: ExportFormat,
) -> Result<Vec<PathBuf>, ExportError> {
    fs::create_dir_all(dir)?;
    let mut written = Vec::new();

    macro_rules! emit {
        ($table:expr, $write:path, $rows:expr) => {{
            let path = table_path(dir, $table, format);
            $write($rows, &path)?;
            written.push(path);
        }};
    }

    let flags_daily = csv::flags_daily_rows(&output.readiness, &output.daily);

    match format {
        ExportFormat::Csv => {
            emit!(SETS_PROCESSED, csv::export_sets_processed, &output.sets);
            emit!(EXERCISE_DAY_SUMMARY, csv::export_exercise_day_summary, &output.summaries);
            emit!(DAILY, csv::export_daily, &output.daily);
            emit!(WEEKLY, csv::export_weekly, &output.weekly);
            emit!(NEURAL_OVERLOAD_DAILY, csv::export_overload_daily, &output.overload_daily);
            emit!(NEURAL_OVERLOAD_LIFTS, csv::export_overload_lifts, &output.overload.flags);
            emit!(RECOMMENDATIONS_DAILY, csv::export_recommendations, &output.readiness);
            emit!(DECISION_DAILY, csv::export_day_plans, &output.day_plans);
            emit!(FLAGS_DAILY, csv::export_flags_daily, &flags_daily);
        }
        ExportFormat::Json => {
            emit!(SETS_PROCESSED, json::export_json, &output.sets);
            emit!(EXERCISE_DAY_SUMMARY, json::export_json, &output.summaries);
            emit!(DAILY, json::export_json, &output.daily);
            emit!(WEEKLY, json::export_json, &output.weekly);
            emit!(NEURAL_OVERLOAD_DAILY, json::export_json, &output.overload_daily);
            emit!(NEURAL_OVERLOAD_LIFTS, json::export_json, &output.overload.flags);
            emit!(RECOMMENDATIONS_DAILY, json::export_json, &output.readiness);
            emit!(DECISION_DAILY, json::export_json, &output.day_plans);
            emit!(FLAGS_DAILY, json::export_json, &flags_daily);
        }
    }

    let profile_path = table_path(dir, USER_PROFILE, ExportFormat::Json);
    json::export_user_profile(&output.profile, &profile_path)?;
    written.push(profile_path);

    if let Some(latest) = &output.latest {
        let latest_path = table_path(dir, LATEST_INSIGHTS, ExportFormat::Json);
        json::export_json(latest, &latest_path)?;
        written.push(latest_path);
    }

    info!("Exported {} files to {}", written.len(), dir.display());
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_parsing() {
        assert_eq!("CSV".parse::<ExportFormat>().unwrap(), ExportFormat::Csv);
        assert_eq!("json".parse::<ExportFormat>().unwrap(), ExportFormat::Json);
        assert!(matches!(
            "pdf".parse::<ExportFormat>(),
            Err(ExportError::UnsupportedFormat(_))
        ));
        assert_eq!(ExportFormat::Json.to_string(), "json");
    }

    #[test]
    fn test_table_path() {
        let path = table_path(Path::new("out"), DAILY, ExportFormat::Csv);
        assert_eq!(path, Path::new("out").join("daily.csv"));
    }
}
