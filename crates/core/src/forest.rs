//! Regression tree ensemble used as the default yield regressor
//!
//! Trees are stored as flat node arrays (node 0 is the root). Prediction
//! averages the leaf reached in every tree. The pipeline only talks to the
//! model through [`Regressor`], so another fitted model type can replace
//! the forest without touching feature building or forecasting.

use serde::{Deserialize, Serialize};

use crate::features::FeatureVector;

/// Scoring side of a fitted regression model
pub trait Regressor: Send + Sync {
    /// Number of columns each input row must have
    fn feature_count(&self) -> usize;

    /// Predict a single row
    fn predict_one(&self, features: &[f64]) -> f64;

    /// Predict many rows in order
    fn predict(&self, rows: &[FeatureVector]) -> Vec<f64> {
        rows.iter().map(|row| self.predict_one(row)).collect()
    }

    /// Raw per-feature importance scores as exposed by the model
    fn feature_importances(&self) -> Vec<f64>;

    /// Structural check run when a model is loaded from disk
    fn validate(&self) -> Result<(), String> {
        Ok(())
    }
}

/// A decision tree node (internal or leaf)
///
/// Internal nodes route `features[feature_idx] <= threshold` to `left`,
/// everything else to `right`. Leaves carry `value`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// Feature index to split on (-1 for leaves)
    pub feature_idx: i32,

    /// Split threshold
    pub threshold: f64,

    /// Left child index (-1 for leaves)
    pub left: i32,

    /// Right child index (-1 for leaves)
    pub right: i32,

    /// Leaf prediction (None for internal nodes)
    pub value: Option<f64>,

    /// Training samples that reached this node
    pub samples: u32,
}

impl Node {
    pub fn internal(feature_idx: i32, threshold: f64, left: i32, right: i32, samples: u32) -> Self {
        Self {
            feature_idx,
            threshold,
            left,
            right,
            value: None,
            samples,
        }
    }

    pub fn leaf(value: f64, samples: u32) -> Self {
        Self {
            feature_idx: -1,
            threshold: 0.0,
            left: -1,
            right: -1,
            value: Some(value),
            samples,
        }
    }

    pub fn is_leaf(&self) -> bool {
        self.feature_idx < 0 || self.value.is_some()
    }
}

/// A single regression tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tree {
    pub nodes: Vec<Node>,
}

impl Tree {
    pub fn new(nodes: Vec<Node>) -> Self {
        Self { nodes }
    }

    /// Walk from the root to a leaf
    ///
    /// Structure is checked by [`validate`](Self::validate) when a model is
    /// loaded, so traversal only guards against out-of-range indices.
    pub fn evaluate(&self, features: &[f64]) -> f64 {
        let mut idx = 0usize;

        loop {
            let Some(node) = self.nodes.get(idx) else {
                return 0.0;
            };

            if node.is_leaf() {
                return node.value.unwrap_or(0.0);
            }

            let Some(&value) = features.get(node.feature_idx as usize) else {
                return 0.0;
            };

            let next = if value <= node.threshold {
                node.left
            } else {
                node.right
            };
            if next < 0 {
                return 0.0;
            }
            idx = next as usize;
        }
    }

    pub fn depth(&self) -> usize {
        fn walk(nodes: &[Node], idx: usize) -> usize {
            match nodes.get(idx) {
                Some(node) if !node.is_leaf() => {
                    1 + walk(nodes, node.left as usize).max(walk(nodes, node.right as usize))
                }
                _ => 0,
            }
        }
        walk(&self.nodes, 0)
    }

    /// Validate tree structure
    pub fn validate(&self, feature_count: usize) -> Result<(), String> {
        if self.nodes.is_empty() {
            return Err("tree has no nodes".to_string());
        }

        for (i, node) in self.nodes.iter().enumerate() {
            if node.is_leaf() {
                match node.value {
                    Some(v) if v.is_finite() => {}
                    _ => return Err(format!("leaf {} has no finite value", i)),
                }
                continue;
            }

            if node.feature_idx as usize >= feature_count {
                return Err(format!(
                    "node {} splits on feature {} but model has {}",
                    i, node.feature_idx, feature_count
                ));
            }
            // Children are always stored after their parent
            for child in [node.left, node.right] {
                if child <= i as i32 || child as usize >= self.nodes.len() {
                    return Err(format!("node {} has invalid child index {}", i, child));
                }
            }
        }

        Ok(())
    }
}

/// Averaging ensemble of regression trees
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForestModel {
    pub feature_count: usize,
    pub trees: Vec<Tree>,

    /// Mean impurity decrease per feature, normalized to sum to 1
    pub importances: Vec<f64>,
}

impl ForestModel {
    pub fn new(feature_count: usize, trees: Vec<Tree>, importances: Vec<f64>) -> Self {
        Self {
            feature_count,
            trees,
            importances,
        }
    }

    pub fn num_trees(&self) -> usize {
        self.trees.len()
    }

    fn check(&self) -> Result<(), String> {
        if self.trees.is_empty() {
            return Err("forest has no trees".to_string());
        }
        if self.importances.len() != self.feature_count {
            return Err(format!(
                "{} importances for {} features",
                self.importances.len(),
                self.feature_count
            ));
        }
        for (i, tree) in self.trees.iter().enumerate() {
            tree.validate(self.feature_count)
                .map_err(|e| format!("tree {} validation failed: {}", i, e))?;
        }
        Ok(())
    }
}

impl Regressor for ForestModel {
    fn feature_count(&self) -> usize {
        self.feature_count
    }

    fn predict_one(&self, features: &[f64]) -> f64 {
        if self.trees.is_empty() {
            return 0.0;
        }
        let sum: f64 = self.trees.iter().map(|tree| tree.evaluate(features)).sum();
        sum / self.trees.len() as f64
    }

    fn feature_importances(&self) -> Vec<f64> {
        self.importances.clone()
    }

    fn validate(&self) -> Result<(), String> {
        self.check()
    }
}
