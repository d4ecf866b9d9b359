//! Unified error hierarchy for liftready
//!
//! Only schema and I/O problems are errors. Insufficient history (too few
//! sessions for a window, too few days for a baseline) is modelled as absent
//! values in the outputs and never reaches this module.

use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for all liftready operations
#[derive(Debug, Error)]
pub enum LiftReadyError {
    /// Input schema or range violations
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Reading input tables
    #[error("Import error: {0}")]
    Import(#[from] ImportError),

    /// Writing output tables
    #[error("Export error: {0}")]
    Export(#[from] crate::export::ExportError),

    /// Invalid engine configuration
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Schema violations detected at ingestion
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValidationError {
    /// A required column is absent from a table
    #[error("[{table}] missing required columns: {}", .columns.join(", "))]
    MissingColumns { table: String, columns: Vec<String> },

    /// A value lies outside its allowed range
    #[error("[{table}] row {row}: {field}={value} outside [{min}, {max}]")]
    OutOfRange {
        table: String,
        row: usize,
        field: String,
        value: f64,
        min: f64,
        max: f64,
    },

    /// A cell could not be parsed into the expected type
    #[error("[{table}] row {row}: invalid {field} '{raw}'")]
    InvalidValue {
        table: String,
        row: usize,
        field: String,
        raw: String,
    },

    /// Neither RIR nor RPE was logged for a set
    #[error("[{table}] row {row}: set has neither rir nor rpe")]
    MissingEffort { table: String, row: usize },

    /// Two wellness entries share a date
    #[error("[{table}] duplicate entry for {date}")]
    DuplicateDate { table: String, date: String },
}

/// Errors while reading input tables
#[derive(Debug, Error)]
pub enum ImportError {
    /// File not found at specified path
    #[error("File not found: {path}")]
    FileNotFound { path: PathBuf },

    /// Malformed CSV structure
    #[error("CSV error in {path}: {reason}")]
    Csv { path: PathBuf, reason: String },

    /// Schema violation inside an imported file
    #[error("{0}")]
    Schema(#[from] ValidationError),
}

/// Configuration problems
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A threshold has an impossible value
    #[error("Invalid parameter {parameter}={value}: {reason}")]
    InvalidParameter {
        parameter: String,
        value: String,
        reason: String,
    },

    /// The config file could not be parsed
    #[error("Failed to parse {path}: {reason}")]
    Parse { path: PathBuf, reason: String },
}

/// Result type alias for liftready operations
pub type Result<T> = std::result::Result<T, LiftReadyError>;

impl LiftReadyError {
    /// Get error severity level
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            LiftReadyError::Import(ImportError::FileNotFound { .. }) => ErrorSeverity::Warning,
            LiftReadyError::Validation(_) => ErrorSeverity::Error,
            LiftReadyError::Import(_) => ErrorSeverity::Error,
            LiftReadyError::Config(_) => ErrorSeverity::Error,
            LiftReadyError::Export(_) | LiftReadyError::Io(_) => ErrorSeverity::Critical,
        }
    }

    /// Get user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            LiftReadyError::Import(ImportError::FileNotFound { path }) => {
                format!("Could not find input file: {}", path.display())
            }
            LiftReadyError::Validation(ValidationError::MissingColumns { table, columns })
            | LiftReadyError::Import(ImportError::Schema(ValidationError::MissingColumns {
                table,
                columns,
            })) => {
                format!(
                    "The {} table is missing columns ({}). Nothing was computed.",
                    table,
                    columns.join(", ")
                )
            }
            LiftReadyError::Validation(ValidationError::OutOfRange { field, row, .. })
            | LiftReadyError::Import(ImportError::Schema(ValidationError::OutOfRange {
                field,
                row,
                ..
            })) => {
                format!(
                    "Row {} has an impossible {} value. Fix the log and run again.",
                    row, field
                )
            }
            _ => self.to_string(),
        }
    }
}

/// Error severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    /// The run produced no output and the environment needs attention
    Critical,
    /// The run was aborted because of bad input
    Error,
    /// Recoverable problem
    Warning,
}

impl ErrorSeverity {
    /// Convert to tracing level
    pub fn to_tracing_level(&self) -> tracing::Level {
        match self {
            ErrorSeverity::Critical => tracing::Level::ERROR,
            ErrorSeverity::Error => tracing::Level::ERROR,
            ErrorSeverity::Warning => tracing::Level::WARN,
        }
    }
}
