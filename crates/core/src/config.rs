//! Pipeline configuration
//!
//! Defaults reproduce the constants the yield study was originally run
//! with. A TOML file may override any subset of them.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::errors::{AgroError, Result};

/// Ensemble hyperparameters, passed unchanged to the regression trainer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Hyperparameters {
    pub ensemble_size: usize,
    pub max_depth: usize,
    pub min_samples_to_split: usize,
    pub min_samples_per_leaf: usize,
    pub seed: u64,
}

impl Default for Hyperparameters {
    fn default() -> Self {
        Self {
            ensemble_size: 100,
            max_depth: 15,
            min_samples_to_split: 5,
            min_samples_per_leaf: 2,
            seed: 42,
        }
    }
}

impl Hyperparameters {
    pub fn validate(&self) -> Result<()> {
        if self.ensemble_size == 0 {
            return Err(AgroError::InvalidParameters(
                "ensemble_size must be at least 1".into(),
            ));
        }
        if self.max_depth == 0 {
            return Err(AgroError::InvalidParameters(
                "max_depth must be at least 1".into(),
            ));
        }
        if self.min_samples_to_split < 2 {
            return Err(AgroError::InvalidParameters(
                "min_samples_to_split must be at least 2".into(),
            ));
        }
        if self.min_samples_per_leaf == 0 {
            return Err(AgroError::InvalidParameters(
                "min_samples_per_leaf must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

/// Input and output locations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    pub historical: PathBuf,
    pub future_climate: PathBuf,
    pub model_dir: PathBuf,
    pub output_dir: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            historical: PathBuf::from("data/processed/merged_data.csv"),
            future_climate: PathBuf::from("data/raw/future_climate.csv"),
            model_dir: PathBuf::from("models"),
            output_dir: PathBuf::from("data/processed"),
        }
    }
}

/// Split, fit and cross-validation settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    pub hyperparameters: Hyperparameters,
    pub holdout_fraction: f64,
    pub cv_folds: usize,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            hyperparameters: Hyperparameters::default(),
            holdout_fraction: 0.2,
            cv_folds: 5,
        }
    }
}

/// Forecast and change-quantification settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectionConfig {
    pub crops: Vec<String>,
    /// First year of the historical baseline window
    pub baseline_from: i32,
    /// First year of the future averaging window
    pub future_from: i32,
}

impl Default for ProjectionConfig {
    fn default() -> Self {
        Self {
            crops: ["Rice", "Wheat", "Maize", "Cotton", "Sugarcane"]
                .into_iter()
                .map(String::from)
                .collect(),
            baseline_from: 2015,
            future_from: 2040,
        }
    }
}

/// Per-stage time budgets in seconds (absent = unbounded)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    pub training_secs: Option<u64>,
    pub forecast_secs: Option<u64>,
}

impl LimitsConfig {
    pub fn training_budget(&self) -> Option<Duration> {
        self.training_secs.map(Duration::from_secs)
    }

    pub fn forecast_budget(&self) -> Option<Duration> {
        self.forecast_secs.map(Duration::from_secs)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub paths: PathsConfig,
    pub training: TrainingConfig,
    pub projection: ProjectionConfig,
    pub limits: LimitsConfig,
}

impl PipelineConfig {
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(AgroError::MissingInput {
                path: path.to_path_buf(),
            });
        }
        let raw = std::fs::read_to_string(path)?;
        Self::from_toml_str(&raw)
    }

    pub fn validate(&self) -> Result<()> {
        self.training.hyperparameters.validate()?;

        let fraction = self.training.holdout_fraction;
        if !(fraction > 0.0 && fraction < 1.0) {
            return Err(AgroError::InvalidParameters(format!(
                "holdout_fraction must be in (0, 1), got {}",
                fraction
            )));
        }
        if self.training.cv_folds < 2 {
            return Err(AgroError::InvalidParameters(format!(
                "cv_folds must be at least 2, got {}",
                self.training.cv_folds
            )));
        }
        if self.projection.crops.is_empty() {
            return Err(AgroError::InvalidParameters(
                "projection.crops must not be empty".into(),
            ));
        }
        Ok(())
    }
}
