//! CSV readers for training logs, wellness check-ins and the daily table
//!
//! Headers are normalized (lowercase, `_` for spaces and dashes) and mapped
//! through an alias table before the required-column check, so `Load`,
//! `weight_kg` and `weight` all land on the same field.

use super::validation::{
    check_range, require_columns, validate_daily_columns, Bounds, TrainingValidator,
    WellnessValidator, CAFFEINE_BOUNDS, CYCLE_DAY_BOUNDS, DAILY_TABLE, NAP_BOUNDS, REPS_BOUNDS,
    REQUIRED_TRAINING_COLUMNS, REQUIRED_WELLNESS_COLUMNS, SETS_BOUNDS, TRAINING_TABLE,
    WELLNESS_TABLE,
};
use super::ImportFormat;
use crate::error::{ImportError, ValidationError};
use crate::models::{normalize_exercise, DailyMetrics, TrainingSet, WellnessEntry};
use chrono::{NaiveDate, NaiveDateTime};
use csv::{Reader, ReaderBuilder, StringRecord, Trim};
use std::collections::HashMap;
use std::fs::File;
use std::path::Path;
use tracing::{debug, info, warn};

/// Header aliases mapped to canonical column names
#[derive(Debug, Clone, Default)]
pub struct ColumnMapping {
    mapping: HashMap<String, String>,
}

impl ColumnMapping {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_mapping(&mut self, standard: &str, variations: &[&str]) {
        for variation in variations {
            self.mapping.insert(variation.to_lowercase(), standard.to_string());
        }
    }

    pub fn normalize_column_name(&self, name: &str) -> String {
        let normalized = name.trim().to_lowercase().replace([' ', '-'], "_");

        self.mapping
            .get(&normalized)
            .cloned()
            .unwrap_or(normalized)
    }

    fn training() -> Self {
        let mut columns = Self::new();
        columns.add_mapping("exercise", &["exercise", "exercise_name", "lift", "movement"]);
        columns.add_mapping("weight", &["weight", "load", "weight_kg", "load_kg", "kg"]);
        columns.add_mapping("reps", &["reps", "repetitions", "rep"]);
        columns.add_mapping("sets", &["sets", "set_count", "n_sets"]);
        columns
    }

    fn wellness() -> Self {
        let mut columns = Self::new();
        columns.add_mapping("sleep_hours", &["sleep_hours", "sleep", "hours_slept"]);
        columns.add_mapping("sleep_quality", &["sleep_quality", "sleep_score"]);
        columns.add_mapping("pain_flag", &["pain_flag", "pain"]);
        columns.add_mapping("perceived_readiness", &["perceived_readiness", "readiness_perceived"]);
        columns.add_mapping("nap_minutes", &["nap_minutes", "nap", "nap_mins"]);
        columns.add_mapping("cycle_day", &["cycle_day", "menstrual_cycle_day", "day_of_cycle"]);
        columns
    }
}

/// Column positions by canonical name
struct Columns {
    names: Vec<String>,
    index: HashMap<String, usize>,
}

impl Columns {
    fn from_headers(headers: &StringRecord, mapping: &ColumnMapping) -> Self {
        let names: Vec<String> = headers
            .iter()
            .map(|h| mapping.normalize_column_name(h))
            .collect();
        let mut index = HashMap::new();
        for (i, name) in names.iter().enumerate() {
            index.entry(name.clone()).or_insert(i);
        }
        Self { names, index }
    }

    fn has(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }
}

/// One data row with typed accessors
struct Row<'a> {
    table: &'static str,
    row: usize,
    record: &'a StringRecord,
    columns: &'a Columns,
}

impl<'a> Row<'a> {
    fn raw(&self, field: &str) -> Option<&'a str> {
        let i = *self.columns.index.get(field)?;
        self.record.get(i).map(str::trim).filter(|v| !v.is_empty())
    }

    fn invalid(&self, field: &str, raw: &str) -> ValidationError {
        ValidationError::InvalidValue {
            table: self.table.to_string(),
            row: self.row,
            field: field.to_string(),
            raw: raw.to_string(),
        }
    }

    fn text(&self, field: &str) -> Option<String> {
        self.raw(field).map(str::to_string)
    }

    fn date(&self) -> Result<NaiveDate, ValidationError> {
        let raw = self.raw("date").unwrap_or_default();
        parse_date(raw).ok_or_else(|| self.invalid("date", raw))
    }

    fn opt_f64(&self, field: &str) -> Result<Option<f64>, ValidationError> {
        match self.raw(field) {
            None => Ok(None),
            Some(raw) => raw
                .parse::<f64>()
                .ok()
                .filter(|v| v.is_finite())
                .map(Some)
                .ok_or_else(|| self.invalid(field, raw)),
        }
    }

    fn f64(&self, field: &str) -> Result<f64, ValidationError> {
        self.opt_f64(field)?.ok_or_else(|| self.invalid(field, ""))
    }

    /// Whole-number field; `5.0` is accepted since spreadsheets export counts as floats
    fn opt_count(&self, field: &str, bounds: Bounds) -> Result<Option<u32>, ValidationError> {
        let Some(value) = self.opt_f64(field)? else {
            return Ok(None);
        };
        check_range(self.table, self.row, field, value, bounds)?;
        if value.fract() != 0.0 {
            return Err(self.invalid(field, self.raw(field).unwrap_or_default()));
        }
        Ok(Some(value as u32))
    }

    fn flag(&self, field: &str) -> Result<bool, ValidationError> {
        match self.raw(field) {
            None => Ok(false),
            Some(raw) => parse_bool(raw).ok_or_else(|| self.invalid(field, raw)),
        }
    }
}

fn parse_date(raw: &str) -> Option<NaiveDate> {
    const DATE_FORMATS: [&str; 4] = ["%Y-%m-%d", "%Y/%m/%d", "%d/%m/%Y", "%d.%m.%Y"];
    const DATETIME_FORMATS: [&str; 3] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"];

    DATE_FORMATS
        .iter()
        .find_map(|f| NaiveDate::parse_from_str(raw, f).ok())
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|f| NaiveDateTime::parse_from_str(raw, f).ok())
                .map(|dt| dt.date())
        })
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.to_lowercase().as_str() {
        "1" | "1.0" | "true" | "t" | "yes" | "y" => Some(true),
        "0" | "0.0" | "false" | "f" | "no" | "n" => Some(false),
        _ => None,
    }
}

fn is_csv(file_path: &Path) -> bool {
    file_path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("csv"))
        .unwrap_or(false)
}

fn open(
    file_path: &Path,
    table: &'static str,
    mapping: &ColumnMapping,
) -> Result<(Reader<File>, Columns), ImportError> {
    if !file_path.exists() {
        return Err(ImportError::FileNotFound {
            path: file_path.to_path_buf(),
        });
    }
    let csv_error = |e: csv::Error| ImportError::Csv {
        path: file_path.to_path_buf(),
        reason: e.to_string(),
    };

    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .trim(Trim::All)
        .from_path(file_path)
        .map_err(csv_error)?;
    let headers = reader.headers().map_err(csv_error)?.clone();
    let columns = Columns::from_headers(&headers, mapping);
    debug!("[{}] columns: {}", table, columns.names.join(", "));

    Ok((reader, columns))
}

/// Visit every data row of an opened file
fn for_each_row<F>(
    file_path: &Path,
    table: &'static str,
    mut reader: Reader<File>,
    columns: &Columns,
    mut visit: F,
) -> Result<usize, ImportError>
where
    F: FnMut(&Row<'_>) -> Result<(), ImportError>,
{
    let mut rows = 0;
    for (i, result) in reader.records().enumerate() {
        let record = result.map_err(|e| ImportError::Csv {
            path: file_path.to_path_buf(),
            reason: e.to_string(),
        })?;
        if record.iter().all(|v| v.trim().is_empty()) {
            continue;
        }
        let row = Row {
            table,
            row: i + 1,
            record: &record,
            columns,
        };
        visit(&row)?;
        rows += 1;
    }
    if rows == 0 {
        warn!("[{}] {} has no data rows", table, file_path.display());
    }
    Ok(rows)
}

/// Training log reader: `date, exercise, sets, reps, weight, rpe, rir`
pub struct TrainingCsvImporter {
    columns: ColumnMapping,
}

impl TrainingCsvImporter {
    pub fn new() -> Self {
        Self {
            columns: ColumnMapping::training(),
        }
    }

    fn parse_set(row: &Row<'_>) -> Result<TrainingSet, ValidationError> {
        let date = row.date()?;
        let exercise = normalize_exercise(row.raw("exercise").unwrap_or_default());
        let reps = row
            .opt_count("reps", REPS_BOUNDS)?
            .ok_or_else(|| row.invalid("reps", ""))?;
        let sets = row.opt_count("sets", SETS_BOUNDS)?.unwrap_or(1);

        let set = TrainingSet {
            date,
            exercise,
            set_index: 0,
            sets,
            reps,
            load: row.f64("weight")?,
            rpe: row.opt_f64("rpe")?,
            rir: row.opt_f64("rir")?,
        };
        TrainingValidator::validate_set(row.row, &set)?;
        Ok(set)
    }
}

impl Default for TrainingCsvImporter {
    fn default() -> Self {
        Self::new()
    }
}

/// Sort by date, keeping file order within a day, and number the rows of
/// each (date, exercise) group from 0
pub fn assign_set_indices(sets: &mut [TrainingSet]) {
    sets.sort_by_key(|s| s.date);
    let mut next: HashMap<(NaiveDate, String), u32> = HashMap::new();
    for set in sets.iter_mut() {
        let counter = next.entry((set.date, set.exercise.clone())).or_insert(0);
        set.set_index = *counter;
        *counter += 1;
    }
}

impl ImportFormat for TrainingCsvImporter {
    type Record = TrainingSet;

    fn can_import(&self, file_path: &Path) -> bool {
        is_csv(file_path)
    }

    fn import_file(&self, file_path: &Path) -> Result<Vec<TrainingSet>, ImportError> {
        let (reader, columns) = open(file_path, TRAINING_TABLE, &self.columns)?;
        require_columns(TRAINING_TABLE, &columns.names, &REQUIRED_TRAINING_COLUMNS)?;
        if !columns.has("rpe") && !columns.has("rir") {
            return Err(ValidationError::MissingColumns {
                table: TRAINING_TABLE.to_string(),
                columns: vec!["rpe|rir".to_string()],
            }
            .into());
        }

        let mut sets = Vec::new();
        for_each_row(file_path, TRAINING_TABLE, reader, &columns, |row| {
            sets.push(Self::parse_set(row)?);
            Ok(())
        })?;
        assign_set_indices(&mut sets);

        info!("Imported {} training rows from {}", sets.len(), file_path.display());
        Ok(sets)
    }

    fn get_format_name(&self) -> &'static str {
        "training CSV"
    }
}

/// Wellness check-in reader
pub struct WellnessCsvImporter {
    columns: ColumnMapping,
}

impl WellnessCsvImporter {
    pub fn new() -> Self {
        Self {
            columns: ColumnMapping::wellness(),
        }
    }

    fn parse_entry(row: &Row<'_>) -> Result<WellnessEntry, ValidationError> {
        let mut entry = WellnessEntry::new(row.date()?, row.f64("sleep_hours")?, row.f64("sleep_quality")?);
        entry.fatigue = row.opt_f64("fatigue")?;
        entry.soreness = row.opt_f64("soreness")?;
        entry.stress = row.opt_f64("stress")?;
        entry.motivation = row.opt_f64("motivation")?;
        entry.pain_flag = row.flag("pain_flag")?;
        entry.pain_location = row.text("pain_location");
        entry.perceived_readiness = row.opt_f64("perceived_readiness")?;
        entry.nap_minutes = row.opt_count("nap_minutes", NAP_BOUNDS)?;
        entry.sleep_disruptions = row.flag("sleep_disruptions")?;
        entry.energy = row.opt_f64("energy")?;
        entry.stiffness = row.opt_f64("stiffness")?;
        entry.caffeine = row.opt_count("caffeine", CAFFEINE_BOUNDS)?.map(|c| c as u8);
        entry.alcohol = row.flag("alcohol")?;
        entry.sick = row.flag("sick")?;
        entry.cycle_day = row.opt_count("cycle_day", CYCLE_DAY_BOUNDS)?.map(|d| d as u8);
        entry.cramping = row.opt_f64("cramping")?;
        entry.bloating = row.opt_f64("bloating")?;

        WellnessValidator::validate_entry(row.row, &entry)?;
        Ok(entry)
    }
}

impl Default for WellnessCsvImporter {
    fn default() -> Self {
        Self::new()
    }
}

impl ImportFormat for WellnessCsvImporter {
    type Record = WellnessEntry;

    fn can_import(&self, file_path: &Path) -> bool {
        is_csv(file_path)
    }

    fn import_file(&self, file_path: &Path) -> Result<Vec<WellnessEntry>, ImportError> {
        let (reader, columns) = open(file_path, WELLNESS_TABLE, &self.columns)?;
        require_columns(WELLNESS_TABLE, &columns.names, &REQUIRED_WELLNESS_COLUMNS)?;

        let mut entries = Vec::new();
        for_each_row(file_path, WELLNESS_TABLE, reader, &columns, |row| {
            entries.push(Self::parse_entry(row)?);
            Ok(())
        })?;
        WellnessValidator::validate_entries(&entries)?;
        entries.sort_by_key(|e| e.date);

        info!("Imported {} wellness entries from {}", entries.len(), file_path.display());
        Ok(entries)
    }

    fn get_format_name(&self) -> &'static str {
        "wellness CSV"
    }
}

/// Reader for a previously computed daily table
pub struct DailyCsvImporter {
    columns: ColumnMapping,
}

impl DailyCsvImporter {
    pub fn new() -> Self {
        Self {
            columns: ColumnMapping::new(),
        }
    }

    fn parse_day(row: &Row<'_>) -> Result<DailyMetrics, ValidationError> {
        let mut day = DailyMetrics::empty(row.date()?);
        day.volume = row.f64("volume")?;
        day.volume_7d = row.opt_f64("volume_7d")?;
        day.volume_28d = row.opt_f64("volume_28d")?;
        day.acwr_7_28 = row.opt_f64("acwr_7_28")?;
        day.rir_weighted = row.opt_f64("rir_weighted")?;
        day.effort_mean = row.opt_f64("effort_mean")?;
        day.performance_index = row.opt_f64("performance_index")?;
        day.performance_7d_mean = row.opt_f64("performance_7d_mean")?;
        day.sleep_hours = row.opt_f64("sleep_hours")?;
        day.sleep_quality = row.opt_f64("sleep_quality")?;
        day.fatigue_flag = row.flag("fatigue_flag")?;
        day.perceived_readiness = row.opt_f64("perceived_readiness")?;
        Ok(day)
    }
}

impl Default for DailyCsvImporter {
    fn default() -> Self {
        Self::new()
    }
}

impl ImportFormat for DailyCsvImporter {
    type Record = DailyMetrics;

    fn can_import(&self, file_path: &Path) -> bool {
        is_csv(file_path)
    }

    fn import_file(&self, file_path: &Path) -> Result<Vec<DailyMetrics>, ImportError> {
        let (reader, columns) = open(file_path, DAILY_TABLE, &self.columns)?;
        validate_daily_columns(&columns.names)?;

        let mut days = Vec::new();
        for_each_row(file_path, DAILY_TABLE, reader, &columns, |row| {
            days.push(Self::parse_day(row)?);
            Ok(())
        })?;
        days.sort_by_key(|d| d.date);

        info!("Imported {} daily rows from {}", days.len(), file_path.display());
        Ok(days)
    }

    fn get_format_name(&self) -> &'static str {
        "daily CSV"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write(dir: &TempDir, name: &str, content: &str) -> std::path::PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_column_aliases() {
        let mapping = ColumnMapping::training();
        assert_eq!(mapping.normalize_column_name("Load"), "weight");
        assert_eq!(mapping.normalize_column_name("Weight KG"), "weight");
        assert_eq!(mapping.normalize_column_name("Exercise-Name"), "exercise");
        assert_eq!(mapping.normalize_column_name("rpe"), "rpe");
    }

    #[test]
    fn test_parse_helpers() {
        assert_eq!(parse_date("2024-06-03"), NaiveDate::from_ymd_opt(2024, 6, 3));
        assert_eq!(parse_date("2024-06-03 07:30:00"), NaiveDate::from_ymd_opt(2024, 6, 3));
        assert_eq!(parse_date("June 3rd"), None);
        assert_eq!(parse_bool("Yes"), Some(true));
        assert_eq!(parse_bool("0"), Some(false));
        assert_eq!(parse_bool("maybe"), None);
    }

    #[test]
    fn test_training_import() {
        let dir = TempDir::new().unwrap();
        let path = write(
            &dir,
            "training.csv",
            "date,exercise,load,reps,rpe,rir\n\
             2024-06-04,Squat,100,5,7,3\n\
             2024-06-03, Back  Squat ,60,5,5,\n\
             2024-06-03,Back Squat,140,3,9,1\n",
        );

        let sets = TrainingCsvImporter::new().import_file(&path).unwrap();
        assert_eq!(sets.len(), 3);
        assert_eq!(sets[0].exercise, "back squat");
        assert_eq!(sets[0].set_index, 0);
        assert_eq!(sets[0].rir, None);
        assert_eq!(sets[1].set_index, 1);
        assert_eq!(sets[1].load, 140.0);
        assert_eq!(sets[2].exercise, "squat");
        assert!(sets.iter().all(|s| s.sets == 1));
    }

    #[test]
    fn test_training_schema_errors() {
        let dir = TempDir::new().unwrap();
        let importer = TrainingCsvImporter::new();

        let missing = write(&dir, "a.csv", "date,exercise,reps,rpe\n2024-06-03,squat,5,8\n");
        match importer.import_file(&missing) {
            Err(ImportError::Schema(ValidationError::MissingColumns { columns, .. })) => {
                assert_eq!(columns, vec!["weight".to_string()]);
            }
            other => panic!("unexpected result: {other:?}"),
        }

        let bad_rir = write(&dir, "b.csv", "date,exercise,reps,weight,rir\n2024-06-03,squat,5,100,12\n");
        assert!(matches!(
            importer.import_file(&bad_rir),
            Err(ImportError::Schema(ValidationError::OutOfRange { row: 1, .. }))
        ));

        let bad_reps = write(&dir, "c.csv", "date,exercise,reps,weight,rir\n2024-06-03,squat,0,100,2\n");
        assert!(importer.import_file(&bad_reps).is_err());

        let bad_date = write(&dir, "d.csv", "date,exercise,reps,weight,rir\nyesterday,squat,5,100,2\n");
        assert!(matches!(
            importer.import_file(&bad_date),
            Err(ImportError::Schema(ValidationError::InvalidValue { .. }))
        ));

        assert!(matches!(
            importer.import_file(&dir.path().join("nope.csv")),
            Err(ImportError::FileNotFound { .. })
        ));
    }

    #[test]
    fn test_wellness_import() {
        let dir = TempDir::new().unwrap();
        let path = write(
            &dir,
            "wellness.csv",
            "date,sleep_hours,sleep_quality,stress,pain_flag,pain_location,nap_minutes,caffeine\n\
             2024-06-04,6.5,3,7,yes,knee,30,2\n\
             2024-06-03,8,5,,0,,,\n",
        );

        let entries = WellnessCsvImporter::new().import_file(&path).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].date, NaiveDate::from_ymd_opt(2024, 6, 3).unwrap());
        assert_eq!(entries[0].stress, None);
        assert!(!entries[0].pain_flag);
        assert!(entries[1].pain_flag);
        assert_eq!(entries[1].pain_location.as_deref(), Some("knee"));
        assert_eq!(entries[1].nap_minutes, Some(30));
        assert_eq!(entries[1].caffeine, Some(2));
    }

    #[test]
    fn test_wellness_cycle_columns() {
        let dir = TempDir::new().unwrap();
        let path = write(
            &dir,
            "wellness.csv",
            "date,sleep_hours,sleep_quality,Day of Cycle,cramping,bloating\n\
             2024-06-03,7,4,24,3,1.5\n\
             2024-06-04,7,4,,,\n",
        );

        let entries = WellnessCsvImporter::new().import_file(&path).unwrap();
        assert_eq!(entries[0].cycle_day, Some(24));
        assert_eq!(entries[0].cramping, Some(3.0));
        assert_eq!(entries[0].bloating, Some(1.5));
        assert_eq!(entries[1].cycle_day, None);

        let bad = write(
            &dir,
            "bad.csv",
            "date,sleep_hours,sleep_quality,cycle_day\n2024-06-03,7,4,0\n",
        );
        assert!(matches!(
            WellnessCsvImporter::new().import_file(&bad),
            Err(ImportError::Schema(ValidationError::OutOfRange { .. }))
        ));
    }

    #[test]
    fn test_wellness_duplicate_dates() {
        let dir = TempDir::new().unwrap();
        let path = write(
            &dir,
            "wellness.csv",
            "date,sleep_hours,sleep_quality\n2024-06-03,8,5\n2024-06-03,7,4\n",
        );
        assert!(matches!(
            WellnessCsvImporter::new().import_file(&path),
            Err(ImportError::Schema(ValidationError::DuplicateDate { .. }))
        ));
    }

    #[test]
    fn test_daily_requires_all_columns() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "daily.csv", "date,volume\n2024-06-03,1000\n");
        assert!(matches!(
            DailyCsvImporter::new().import_file(&path),
            Err(ImportError::Schema(ValidationError::MissingColumns { .. }))
        ));
    }
}
