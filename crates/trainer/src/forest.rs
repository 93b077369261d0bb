//! Bagged ensemble of CART trees
//!
//! Every tree is fitted on its own bootstrap sample, seeded from
//! `(seed, tree_index)`, so the forest is identical however rayon
//! schedules the work.

use agroclim_core::{
    AgroError, FeatureVector, ForestModel, Hyperparameters, Regressor, Result, StageDeadline,
};
use rayon::prelude::*;
use tracing::{debug, info};

use crate::cart::{BuiltTree, CartBuilder, TreeConfig};
use crate::deterministic::{bootstrap_indices, derive_seed};

/// Fitting side of a regression model
pub trait RegressionTrainer: Sync {
    type Model: Regressor;

    fn fit(
        &self,
        features: &[FeatureVector],
        targets: &[f64],
        deadline: &StageDeadline,
    ) -> Result<Self::Model>;
}

/// Random forest trainer driven by [`Hyperparameters`]
#[derive(Debug, Clone)]
pub struct ForestTrainer {
    pub params: Hyperparameters,
}

impl ForestTrainer {
    pub fn new(params: Hyperparameters) -> Self {
        Self { params }
    }

    fn tree_config(&self) -> TreeConfig {
        TreeConfig {
            max_depth: self.params.max_depth,
            min_samples_split: self.params.min_samples_to_split,
            min_samples_leaf: self.params.min_samples_per_leaf,
        }
    }
}

/// Reject inputs no regressor can learn from
pub(crate) fn check_training_data(features: &[FeatureVector], targets: &[f64]) -> Result<usize> {
    if features.len() != targets.len() {
        return Err(AgroError::InvalidParameters(format!(
            "{} feature rows but {} targets",
            features.len(),
            targets.len()
        )));
    }
    if features.len() < 2 {
        return Err(AgroError::insufficient(
            "regression fit",
            2,
            features.len(),
        ));
    }

    let feature_count = features[0].len();
    if feature_count == 0 || features.iter().any(|row| row.len() != feature_count) {
        return Err(AgroError::InsufficientData {
            context: "regression fit: feature rows have differing lengths".into(),
            required: feature_count.max(1),
            available: features.iter().map(Vec::len).min().unwrap_or(0),
        });
    }

    let first = targets[0];
    if targets.iter().all(|&y| y == first) {
        return Err(AgroError::ConstantTarget(format!(
            "all {} targets equal {}",
            targets.len(),
            first
        )));
    }

    Ok(feature_count)
}

impl RegressionTrainer for ForestTrainer {
    type Model = ForestModel;

    fn fit(
        &self,
        features: &[FeatureVector],
        targets: &[f64],
        deadline: &StageDeadline,
    ) -> Result<ForestModel> {
        self.params.validate()?;
        let feature_count = check_training_data(features, targets)?;

        info!(
            "Fitting {} trees on {} samples (max_depth={}, seed={})",
            self.params.ensemble_size,
            features.len(),
            self.params.max_depth,
            self.params.seed
        );

        let builder = CartBuilder::new(features, targets, self.tree_config());
        let built: Vec<BuiltTree> = (0..self.params.ensemble_size)
            .into_par_iter()
            .map(|tree_idx| {
                deadline.check()?;
                let sample = bootstrap_indices(
                    features.len(),
                    derive_seed(self.params.seed, tree_idx as u64),
                );
                let built = builder.build(&sample);
                debug!(
                    "Tree {}: {} nodes, depth {}",
                    tree_idx,
                    built.tree.nodes.len(),
                    built.tree.depth()
                );
                Ok(built)
            })
            .collect::<Result<_>>()?;

        let importances = aggregate_importances(&built, feature_count);
        let trees = built.into_iter().map(|b| b.tree).collect();

        Ok(ForestModel::new(feature_count, trees, importances))
    }
}

/// Normalize each tree's impurity decrease, average, then normalize again
fn aggregate_importances(built: &[BuiltTree], feature_count: usize) -> Vec<f64> {
    let mut totals = vec![0.0; feature_count];
    for tree in built {
        let sum: f64 = tree.importances.iter().sum();
        if sum > 0.0 {
            for (total, value) in totals.iter_mut().zip(&tree.importances) {
                *total += value / sum;
            }
        }
    }

    let sum: f64 = totals.iter().sum();
    if sum > 0.0 {
        totals.iter_mut().for_each(|v| *v /= sum);
    }
    totals
}
