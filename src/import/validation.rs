use crate::error::ValidationError;
use crate::models::{TrainingSet, WellnessEntry};
use std::collections::HashSet;

pub const TRAINING_TABLE: &str = "training";
pub const WELLNESS_TABLE: &str = "wellness";
pub const DAILY_TABLE: &str = "daily";

pub const REQUIRED_TRAINING_COLUMNS: [&str; 4] = ["date", "exercise", "reps", "weight"];
pub const REQUIRED_WELLNESS_COLUMNS: [&str; 3] = ["date", "sleep_hours", "sleep_quality"];

/// Columns the decision engine reads from the daily derived table
pub const REQUIRED_DAILY_COLUMNS: [&str; 12] = [
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
];

/// Inclusive bounds for a numeric field
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min: f64,
    pub max: f64,
}

impl Bounds {
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }
}

pub const RPE_BOUNDS: Bounds = Bounds::new(1.0, 10.0);
pub const RIR_BOUNDS: Bounds = Bounds::new(0.0, 10.0);
pub const REPS_BOUNDS: Bounds = Bounds::new(1.0, 1000.0);
pub const SETS_BOUNDS: Bounds = Bounds::new(1.0, 100.0);
pub const LOAD_BOUNDS: Bounds = Bounds::new(0.0, 1500.0);
pub const SLEEP_HOURS_BOUNDS: Bounds = Bounds::new(0.0, 24.0);
pub const SLEEP_QUALITY_BOUNDS: Bounds = Bounds::new(1.0, 5.0);
pub const RATING_BOUNDS: Bounds = Bounds::new(0.0, 10.0);
pub const NAP_BOUNDS: Bounds = Bounds::new(0.0, 600.0);
pub const CAFFEINE_BOUNDS: Bounds = Bounds::new(0.0, 3.0);
pub const CYCLE_DAY_BOUNDS: Bounds = Bounds::new(1.0, 60.0);
pub const SYMPTOM_BOUNDS: Bounds = Bounds::new(0.0, 5.0);

/// Fail with every required column that is absent from `headers`
pub fn require_columns(
    table: &str,
    headers: &[String],
    required: &[&str],
) -> Result<(), ValidationError> {
    let missing: Vec<String> = required
        .iter()
        .filter(|column| !headers.iter().any(|h| h == *column))
        .map(|column| column.to_string())
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(ValidationError::MissingColumns {
            table: table.to_string(),
            columns: missing,
        })
    }
}

/// The daily table is unusable without all of its twelve columns
pub fn validate_daily_columns(headers: &[String]) -> Result<(), ValidationError> {
    require_columns(DAILY_TABLE, headers, &REQUIRED_DAILY_COLUMNS)
}

pub fn check_range(
    table: &str,
    row: usize,
    field: &str,
    value: f64,
    bounds: Bounds,
) -> Result<f64, ValidationError> {
    if bounds.contains(value) {
        Ok(value)
    } else {
        Err(ValidationError::OutOfRange {
            table: table.to_string(),
            row,
            field: field.to_string(),
            value,
            min: bounds.min,
            max: bounds.max,
        })
    }
}

fn check_optional(
    table: &str,
    row: usize,
    field: &str,
    value: Option<f64>,
    bounds: Bounds,
) -> Result<(), ValidationError> {
    match value {
        Some(v) => check_range(table, row, field, v, bounds).map(|_| ()),
        None => Ok(()),
    }
}

/// Range checks for logged sets
pub struct TrainingValidator;

impl TrainingValidator {
    /// Validate one set; `row` is the 1-based data row used in messages
    pub fn validate_set(row: usize, set: &TrainingSet) -> Result<(), ValidationError> {
        let table = TRAINING_TABLE;
        if set.exercise.is_empty() {
            return Err(ValidationError::InvalidValue {
                table: table.to_string(),
                row,
                field: "exercise".to_string(),
                raw: String::new(),
            });
        }
        check_range(table, row, "reps", set.reps as f64, REPS_BOUNDS)?;
        check_range(table, row, "sets", set.sets as f64, SETS_BOUNDS)?;
        check_range(table, row, "weight", set.load, LOAD_BOUNDS)?;
        check_optional(table, row, "rpe", set.rpe, RPE_BOUNDS)?;
        check_optional(table, row, "rir", set.rir, RIR_BOUNDS)?;

        if set.rpe.is_none() && set.rir.is_none() {
            return Err(ValidationError::MissingEffort {
                table: table.to_string(),
                row,
            });
        }
        Ok(())
    }

    pub fn validate_sets(sets: &[TrainingSet]) -> Result<(), ValidationError> {
        sets.iter()
            .enumerate()
            .try_for_each(|(i, set)| Self::validate_set(i + 1, set))
    }
}

/// Range and uniqueness checks for wellness check-ins
pub struct WellnessValidator;

impl WellnessValidator {
    pub fn validate_entry(row: usize, entry: &WellnessEntry) -> Result<(), ValidationError> {
        let table = WELLNESS_TABLE;
        check_range(table, row, "sleep_hours", entry.sleep_hours, SLEEP_HOURS_BOUNDS)?;
        check_range(table, row, "sleep_quality", entry.sleep_quality, SLEEP_QUALITY_BOUNDS)?;

        for (field, value) in [
            ("fatigue", entry.fatigue),
            ("soreness", entry.soreness),
            ("stress", entry.stress),
            ("motivation", entry.motivation),
            ("perceived_readiness", entry.perceived_readiness),
            ("energy", entry.energy),
            ("stiffness", entry.stiffness),
        ] {
            check_optional(table, row, field, value, RATING_BOUNDS)?;
        }
        check_optional(table, row, "nap_minutes", entry.nap_minutes.map(f64::from), NAP_BOUNDS)?;
        check_optional(table, row, "caffeine", entry.caffeine.map(f64::from), CAFFEINE_BOUNDS)?;
        check_optional(table, row, "cycle_day", entry.cycle_day.map(f64::from), CYCLE_DAY_BOUNDS)?;
        check_optional(table, row, "cramping", entry.cramping, SYMPTOM_BOUNDS)?;
        check_optional(table, row, "bloating", entry.bloating, SYMPTOM_BOUNDS)
    }

    /// Validate every entry, then reject repeated dates
    pub fn validate_entries(entries: &[WellnessEntry]) -> Result<(), ValidationError> {
        let mut seen = HashSet::new();
        for (i, entry) in entries.iter().enumerate() {
            Self::validate_entry(i + 1, entry)?;
            if !seen.insert(entry.date) {
                return Err(ValidationError::DuplicateDate {
                    table: WELLNESS_TABLE.to_string(),
                    date: entry.date.to_string(),
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, day).unwrap()
    }

    fn set() -> TrainingSet {
        TrainingSet {
            date: date(3),
            exercise: "squat".to_string(),
            set_index: 0,
            sets: 1,
            reps: 5,
            load: 140.0,
            rpe: Some(8.0),
            rir: Some(2.0),
        }
    }

    #[test]
    fn test_require_columns_lists_all_missing() {
        let headers = vec!["date".to_string(), "volume".to_string()];
        let err = validate_daily_columns(&headers).unwrap_err();
        match err {
            ValidationError::MissingColumns { table, columns } => {
                assert_eq!(table, "daily");
                assert_eq!(columns.len(), 10);
                assert!(columns.contains(&"fatigue_flag".to_string()));
            }
            other => panic!("unexpected error: {other:?}"),
        }

        let all: Vec<String> = REQUIRED_DAILY_COLUMNS.iter().map(|c| c.to_string()).collect();
        assert!(validate_daily_columns(&all).is_ok());
    }

    #[test]
    fn test_set_ranges() {
        assert!(TrainingValidator::validate_set(1, &set()).is_ok());

        let mut s = set();
        s.rpe = Some(11.0);
        assert!(matches!(
            TrainingValidator::validate_set(4, &s),
            Err(ValidationError::OutOfRange { row: 4, ref field, .. }) if field == "rpe"
        ));

        let mut s = set();
        s.reps = 0;
        assert!(TrainingValidator::validate_set(1, &s).is_err());

        let mut s = set();
        s.rpe = None;
        s.rir = None;
        assert!(matches!(
            TrainingValidator::validate_set(2, &s),
            Err(ValidationError::MissingEffort { row: 2, .. })
        ));
    }

    #[test]
    fn test_wellness_ranges_and_duplicates() {
        let ok = WellnessEntry::new(date(3), 7.5, 4.0);
        assert!(WellnessValidator::validate_entry(1, &ok).is_ok());

        let bad_quality = WellnessEntry::new(date(3), 7.5, 6.0);
        assert!(WellnessValidator::validate_entry(1, &bad_quality).is_err());

        let mut bad_rating = ok.clone();
        bad_rating.stress = Some(12.0);
        assert!(WellnessValidator::validate_entry(1, &bad_rating).is_err());

        let mut cycle = ok.clone();
        cycle.cycle_day = Some(31);
        cycle.cramping = Some(4.0);
        assert!(WellnessValidator::validate_entry(1, &cycle).is_ok());
        cycle.bloating = Some(6.0);
        assert!(WellnessValidator::validate_entry(1, &cycle).is_err());

        let entries = vec![ok.clone(), WellnessEntry::new(date(4), 6.0, 3.0), ok];
        assert_eq!(
            WellnessValidator::validate_entries(&entries),
            Err(ValidationError::DuplicateDate {
                table: "wellness".to_string(),
                date: "2024-06-03".to_string(),
            })
        );
    }
}
