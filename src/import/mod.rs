use crate::error::ImportError;
use crate::models::{TrainingSet, WellnessEntry};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use tracing::info;

pub mod csv;
pub mod validation;

pub use self::csv::{ColumnMapping, DailyCsvImporter, TrainingCsvImporter, WellnessCsvImporter};
pub use validation::{
    validate_daily_columns, TrainingValidator, WellnessValidator, REQUIRED_DAILY_COLUMNS,
};

/// Trait for reading one kind of input table
pub trait ImportFormat {
    type Record;

    /// Check if this importer can handle the given file
    fn can_import(&self, file_path: &Path) -> bool;

    /// Read and validate every row of the file
    fn import_file(&self, file_path: &Path) -> Result<Vec<Self::Record>, ImportError>;

    /// Get the format name for this importer
    fn get_format_name(&self) -> &'static str;
}

/// Everything the pipeline reads from disk
#[derive(Debug, Clone, Default)]
pub struct ImportedData {
    pub sets: Vec<TrainingSet>,
    pub wellness: Vec<WellnessEntry>,
}

/// Coordinates the training and wellness readers
pub struct ImportManager {
    training: TrainingCsvImporter,
    wellness: WellnessCsvImporter,
    show_progress: bool,
}

impl ImportManager {
    pub fn new() -> Self {
        Self {
            training: TrainingCsvImporter::new(),
            wellness: WellnessCsvImporter::new(),
            show_progress: false,
        }
    }

    /// Draw a progress bar on stderr while reading
    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    pub fn import_training(&self, file_path: &Path) -> Result<Vec<TrainingSet>, ImportError> {
        Self::import_with(&self.training, file_path)
    }

    pub fn import_wellness(&self, file_path: &Path) -> Result<Vec<WellnessEntry>, ImportError> {
        Self::import_with(&self.wellness, file_path)
    }

    fn import_with<I: ImportFormat>(
        importer: &I,
        file_path: &Path,
    ) -> Result<Vec<I::Record>, ImportError> {
        if !importer.can_import(file_path) {
            return Err(ImportError::Csv {
                path: file_path.to_path_buf(),
                reason: format!("expected a .csv file for {}", importer.get_format_name()),
            });
        }
        importer.import_file(file_path)
    }

    /// Import the training log and, when given, the wellness log
    pub fn import_inputs(
        &self,
        training: &Path,
        wellness: Option<&Path>,
    ) -> Result<ImportedData, ImportError> {
        let steps = 1 + u64::from(wellness.is_some());
        let pb = if self.show_progress {
            ProgressBar::new(steps)
        } else {
            ProgressBar::hidden()
        };
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({msg})")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-"),
        );

        pb.set_message(format!("Reading {}", file_name(training)));
        let sets = self.import_training(training)?;
        pb.inc(1);

        let wellness = match wellness {
            Some(path) => {
                pb.set_message(format!("Reading {}", file_name(path)));
                let entries = self.import_wellness(path)?;
                pb.inc(1);
                entries
            }
            None => Vec::new(),
        };
        pb.finish_with_message("Import complete");

        info!(
            "Imported {} training rows and {} wellness entries",
            sets.len(),
            wellness.len()
        );
        Ok(ImportedData { sets, wellness })
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .unwrap_or_default()
        .to_string_lossy()
        .into_owned()
}

impl Default for ImportManager {
    fn default() -> Self {
        Self::new()
    }
}
