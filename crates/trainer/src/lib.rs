//! AgroClim trainer: yield model fitting and evaluation
//!
//! Provides a deterministic random forest regressor, the holdout split and
//! K-fold cross-validation used to score it, and the ranked importance
//! table published alongside the model.

pub mod cart;
pub mod deterministic;
pub mod forest;
pub mod importance;
pub mod metrics;
pub mod trainer;

use agroclim_core::{tables, Result, StageDeadline, TrainingConfig};
use std::path::Path;

pub use forest::{ForestTrainer, RegressionTrainer};
pub use importance::{rank, FeatureImportance};
pub use metrics::{evaluate, Metrics};
pub use trainer::{
    cross_validate, fit, split, CrossValidation, ModelTrainer, Split, TrainingOutcome,
    TrainingReport,
};

/// Train directly from the merged historical CSV
pub fn train_from_csv(
    path: &Path,
    config: TrainingConfig,
    deadline: &StageDeadline,
) -> Result<TrainingOutcome> {
    let records = tables::read_historical(path)?;
    ModelTrainer::new(config).train(&records, deadline)
}

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
