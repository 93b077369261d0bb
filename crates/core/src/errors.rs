//! Error types shared by every pipeline stage

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur anywhere in the yield pipeline
#[derive(Error, Debug)]
pub enum AgroError {
    /// A required input table is absent
    #[error("missing input: {}", path.display())]
    MissingInput { path: PathBuf },

    /// A label was not present when the encoder was fitted
    #[error("unknown {field} category '{label}' ({context})")]
    UnknownCategory {
        field: &'static str,
        label: String,
        context: String,
    },

    /// Normalization bounds collapsed to a single value
    #[error("degenerate {field} range: min == max == {value}")]
    DegenerateRange { field: &'static str, value: i64 },

    /// Fewer samples than the requested operation needs
    #[error("insufficient data for {context}: need {required}, have {available}")]
    InsufficientData {
        context: String,
        required: usize,
        available: usize,
    },

    /// Target values have zero variance
    #[error("constant target: {0}")]
    ConstantTarget(String),

    /// Invalid configuration or hyperparameters
    #[error("invalid parameters: {0}")]
    InvalidParameters(String),

    /// A row failed validation while reading a table
    #[error("invalid record at row {row}: {reason}")]
    InvalidRecord { row: usize, reason: String },

    /// Artifact is incompatible with this build or failed its integrity check
    #[error("model artifact mismatch: {0}")]
    ArtifactMismatch(String),

    /// A stage ran past its time budget
    #[error("stage '{stage}' exceeded its deadline")]
    DeadlineExceeded { stage: &'static str },

    /// A stage observed a cancellation request
    #[error("stage '{stage}' was cancelled")]
    Cancelled { stage: &'static str },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV read/write error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Configuration file could not be parsed
    #[error("config error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl AgroError {
    pub fn insufficient(context: impl Into<String>, required: usize, available: usize) -> Self {
        Self::InsufficientData {
            context: context.into(),
            required,
            available,
        }
    }
}

/// Result type for pipeline operations
pub type Result<T> = std::result::Result<T, AgroError>;
