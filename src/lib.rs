// Library interface for LiftReady modules
// This allows integration tests and benches to access the core functionality

pub mod config;
pub mod daily_metrics;
pub mod error;
pub mod export;
pub mod import;
pub mod logging;
pub mod models;
pub mod overload;
pub mod personalization;
pub mod pipeline;
pub mod readiness;
pub mod set_classifier;
pub mod stats;
pub mod summary;

// Re-export commonly used types for convenience
pub use models::*;
pub use config::EngineConfig;
pub use daily_metrics::DailyMetricsBuilder;
pub use set_classifier::SetClassifier;
pub use overload::{OverloadDetector, OverloadFlag, OverloadReport, OverloadVersion};
pub use readiness::{DecisionEngine, ReadinessRecord, ReadinessVersion};
pub use pipeline::{Pipeline, PipelineOutput};
pub use error::{LiftReadyError, Result};
pub use logging::{LogConfig, LogFormat, LogLevel, RunReport};
