//! Training stage: split, fit, evaluate and cross-validate
//!
//! Encoders and year bounds are captured once from the full historical
//! table, then frozen into the artifact. Only the model sees the holdout
//! split.

use agroclim_core::serde_canon::to_canonical_json_pretty;
use agroclim_core::{
    build_matrix, tables, AgroError, EncoderState, FeatureVector, ForestModel, HistoricalRecord,
    Hyperparameters, ModelArtifact, NormalizationBounds, Result, StageDeadline, TrainingConfig,
};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::deterministic::{derive_seed, permutation, FOLD_STREAM, SPLIT_STREAM};
use crate::forest::{ForestTrainer, RegressionTrainer};
use crate::importance;
use crate::metrics::{self, mean_std, Metrics};

pub const MODEL_FILE: &str = "model.json";
pub const METRICS_FILE: &str = "metrics.json";
pub const IMPORTANCE_FILE: &str = "feature_importance.csv";

/// Row indices of a train/test partition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Split {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

/// Partition `0..n` with a seeded permutation
///
/// The test side takes `ceil(n * holdout_fraction)` rows.
pub fn split(n: usize, holdout_fraction: f64, seed: u64) -> Result<Split> {
    if !(holdout_fraction > 0.0 && holdout_fraction < 1.0) {
        return Err(AgroError::InvalidParameters(format!(
            "holdout_fraction must be in (0, 1), got {}",
            holdout_fraction
        )));
    }

    let test_len = (n as f64 * holdout_fraction).ceil() as usize;
    if test_len == 0 || test_len >= n {
        return Err(AgroError::insufficient(
            format!("holdout split of {} rows at fraction {}", n, holdout_fraction),
            2,
            n,
        ));
    }

    let mut order = permutation(n, derive_seed(seed, SPLIT_STREAM));
    let train = order.split_off(test_len);
    Ok(Split { train, test: order })
}

/// Per-fold R² and their summary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrossValidation {
    pub mean_r2: f64,
    pub std_r2: f64,
    pub fold_scores: Vec<f64>,
}

/// Index ranges of each fold over a shuffled order
///
/// The first `n % k` folds are one row larger.
fn fold_bounds(n: usize, k: usize) -> Vec<(usize, usize)> {
    let base = n / k;
    let extra = n % k;
    let mut start = 0;
    (0..k)
        .map(|fold| {
            let len = base + usize::from(fold < extra);
            let range = (start, start + len);
            start += len;
            range
        })
        .collect()
}

fn gather(features: &[FeatureVector], targets: &[f64], rows: &[usize]) -> (Vec<FeatureVector>, Vec<f64>) {
    rows.iter()
        .map(|&i| (features[i].clone(), targets[i]))
        .unzip()
}

/// Seeded shuffled K-fold cross-validation
///
/// Folds are fitted in parallel; scores come back in fold order.
pub fn cross_validate<T: RegressionTrainer>(
    trainer: &T,
    features: &[FeatureVector],
    targets: &[f64],
    folds: usize,
    seed: u64,
    deadline: &StageDeadline,
) -> Result<CrossValidation> {
    if folds < 2 {
        return Err(AgroError::InvalidParameters(format!(
            "cross-validation needs at least 2 folds, got {}",
            folds
        )));
    }
    if features.len() != targets.len() {
        return Err(AgroError::InvalidParameters(format!(
            "{} feature rows but {} targets",
            features.len(),
            targets.len()
        )));
    }
    if features.len() < folds {
        return Err(AgroError::insufficient(
            format!("{}-fold cross-validation", folds),
            folds,
            features.len(),
        ));
    }

    let order = permutation(features.len(), derive_seed(seed, FOLD_STREAM));
    let bounds = fold_bounds(order.len(), folds);

    let fold_scores = bounds
        .par_iter()
        .enumerate()
        .map(|(fold, &(start, end))| {
            deadline.check()?;
            let test_rows = &order[start..end];
            let train_rows: Vec<usize> = order[..start]
                .iter()
                .chain(&order[end..])
                .copied()
                .collect();

            let (train_x, train_y) = gather(features, targets, &train_rows);
            let (test_x, test_y) = gather(features, targets, test_rows);

            let model = trainer.fit(&train_x, &train_y, deadline)?;
            let score = metrics::evaluate(&model, &test_x, &test_y)?.r2;
            debug!("Fold {}/{}: R² = {:.4}", fold + 1, folds, score);
            Ok(score)
        })
        .collect::<Result<Vec<f64>>>()?;

    let (mean_r2, std_r2) = mean_std(&fold_scores);
    Ok(CrossValidation {
        mean_r2,
        std_r2,
        fold_scores,
    })
}

/// Fit a forest with the given hyperparameters and no time budget
pub fn fit(
    features: &[FeatureVector],
    targets: &[f64],
    params: &Hyperparameters,
) -> Result<ForestModel> {
    ForestTrainer::new(*params).fit(features, targets, &StageDeadline::unbounded("training"))
}

/// Summary written to `metrics.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingReport {
    pub samples: usize,
    pub train_samples: usize,
    pub test_samples: usize,
    pub train: Metrics,
    pub test: Metrics,
    pub cross_validation: CrossValidation,
    pub hyperparameters: Hyperparameters,
    pub year_min: i32,
    pub year_max: i32,
    pub version: String,
}

/// Everything the training stage produces
#[derive(Debug, Clone)]
pub struct TrainingOutcome {
    pub artifact: ModelArtifact,
    pub report: TrainingReport,
}

impl TrainingOutcome {
    /// Write the artifact, its hash, the metrics and the importance table
    ///
    /// Returns the artifact hash.
    pub fn save(&self, model_dir: &Path) -> Result<String> {
        fs::create_dir_all(model_dir)?;

        let hash = self.artifact.save(&Self::model_path(model_dir))?;
        fs::write(
            model_dir.join(METRICS_FILE),
            to_canonical_json_pretty(&self.report)?,
        )?;
        tables::write_csv(
            &model_dir.join(IMPORTANCE_FILE),
            &importance::rank(&self.artifact.model)?,
        )?;

        info!("Training outputs written to {}", model_dir.display());
        Ok(hash)
    }

    /// Location of the serialized artifact inside a model directory
    pub fn model_path(model_dir: &Path) -> PathBuf {
        model_dir.join(MODEL_FILE)
    }
}

/// Full training stage over the historical table
#[derive(Debug, Clone, Default)]
pub struct ModelTrainer {
    config: TrainingConfig,
}

impl ModelTrainer {
    pub fn new(config: TrainingConfig) -> Self {
        Self { config }
    }

    pub fn train(
        &self,
        records: &[HistoricalRecord],
        deadline: &StageDeadline,
    ) -> Result<TrainingOutcome> {
        let params = self.config.hyperparameters;
        params.validate()?;
        if records.is_empty() {
            return Err(AgroError::insufficient("training", 2, 0));
        }

        let encoders = EncoderState::fit(records)?;
        let bounds = NormalizationBounds::fit(records.iter().map(|r| r.year))?;
        info!(
            "Fitted encoders: {} states, {} crops; years {}..={}",
            encoders.state.len(),
            encoders.crop.len(),
            bounds.year_min(),
            bounds.year_max()
        );

        let (features, targets) = build_matrix(records, &encoders, &bounds)?;
        let partition = split(features.len(), self.config.holdout_fraction, params.seed)?;
        let (train_x, train_y) = gather(&features, &targets, &partition.train);
        let (test_x, test_y) = gather(&features, &targets, &partition.test);
        info!(
            "Split {} samples: {} train, {} test",
            features.len(),
            train_x.len(),
            test_x.len()
        );

        let trainer = ForestTrainer::new(params);
        let model = trainer.fit(&train_x, &train_y, deadline)?;
        deadline.check()?;

        let train_metrics = metrics::evaluate(&model, &train_x, &train_y)?;
        let test_metrics = metrics::evaluate(&model, &test_x, &test_y)?;
        info!(
            "Train R² = {:.4}, Test R² = {:.4}, Test RMSE = {:.4}, Test MAE = {:.4}",
            train_metrics.r2, test_metrics.r2, test_metrics.rmse, test_metrics.mae
        );

        let cv = cross_validate(
            &trainer,
            &train_x,
            &train_y,
            self.config.cv_folds,
            params.seed,
            deadline,
        )?;
        info!(
            "{}-fold CV R² = {:.4} (± {:.4})",
            self.config.cv_folds, cv.mean_r2, cv.std_r2
        );

        let report = TrainingReport {
            samples: features.len(),
            train_samples: train_x.len(),
            test_samples: test_x.len(),
            train: train_metrics,
            test: test_metrics,
            cross_validation: cv,
            hyperparameters: params,
            year_min: bounds.year_min(),
            year_max: bounds.year_max(),
            version: agroclim_core::VERSION.to_string(),
        };

        Ok(TrainingOutcome {
            artifact: ModelArtifact::new(encoders, bounds, params, model),
            report,
        })
    }
}
