//! Error types for the driver pipeline

use chrono::NaiveDate;
use thiserror::Error;

/// Errors that abort a driver run
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Core(#[from] waterdriver_core::Error),

    #[error("temporal layer '{layer}' has no data")]
    NoTemporalData { layer: String },

    #[error("temporal layer '{layer}' has two entries dated {date}")]
    DuplicateTimestamp { layer: String, date: NaiveDate },

    #[error("temporal layer '{layer}' cannot resolve {date}: outside its date range")]
    DataUnavailable { layer: String, date: NaiveDate },

    #[error("missing required input: {0}")]
    MissingInput(String),

    #[error("invalid configuration: {field}: {reason}")]
    InvalidConfig { field: &'static str, reason: String },

    #[error("export to '{destination}' failed: {reason}")]
    Export { destination: String, reason: String },
}

pub type Result<T> = std::result::Result<T, PipelineError>;
