//! AgroClim core: shared types for the crop-yield projection pipeline
//!
//! Modules:
//! - `records`: typed rows for historical, scenario and output tables
//! - `encoder`: deterministic label encoding for State and Crop
//! - `features`: feature vectors and training-time year bounds
//! - `forest`: regression tree ensemble and the `Regressor` capability
//! - `artifact`: versioned, hashed model bundle
//! - `config`: TOML pipeline configuration
//! - `deadline`: stage budgets and cooperative cancellation
//! - `tables`: CSV readers and writers
//! - `errors`: error taxonomy shared by every stage

pub mod artifact;
pub mod config;
pub mod deadline;
pub mod encoder;
pub mod errors;
pub mod features;
pub mod forest;
pub mod records;
pub mod serde_canon;
pub mod tables;

pub use artifact::{ModelArtifact, ARTIFACT_FORMAT_VERSION};
pub use config::{Hyperparameters, PipelineConfig, ProjectionConfig, TrainingConfig};
pub use deadline::{CancellationToken, StageDeadline};
pub use encoder::{CategoricalEncoder, CategoryField, EncoderState};
pub use errors::{AgroError, Result};
pub use features::{
    build, build_matrix, FeatureInput, FeatureVector, NormalizationBounds, FEATURE_COLUMNS,
    FEATURE_COUNT,
};
pub use forest::{ForestModel, Node, Regressor, Tree};
pub use records::{
    ChangeRecord, ClimateObservation, HistoricalRecord, Pathway, PredictionRecord,
    ScenarioClimateRecord, YieldRecord,
};

/// Crate version string recorded in reports
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
