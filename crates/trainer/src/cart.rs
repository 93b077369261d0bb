//! CART (Classification and Regression Tree) builder
//!
//! Exact-greedy regression tree construction. Each node tries every
//! feature and every midpoint between consecutive distinct values, keeping
//! the split with the largest reduction in squared error.

use agroclim_core::forest::{Node, Tree};
use agroclim_core::FeatureVector;

/// Training parameters for a single tree
#[derive(Clone, Debug)]
pub struct TreeConfig {
    pub max_depth: usize,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            max_depth: 15,
            min_samples_split: 5,
            min_samples_leaf: 2,
        }
    }
}

/// Split candidate with its impurity decrease
#[derive(Debug, Clone, Copy)]
struct SplitCandidate {
    feature_idx: usize,
    threshold: f64,
    gain: f64,
}

/// A fitted tree plus the impurity decrease it credits to each feature
#[derive(Debug, Clone)]
pub struct BuiltTree {
    pub tree: Tree,
    pub importances: Vec<f64>,
}

/// Build a regression tree over a subset of rows
///
/// `indices` may contain repeats (bootstrap samples); every occurrence
/// counts as one sample.
pub struct CartBuilder<'a> {
    config: TreeConfig,
    features: &'a [FeatureVector],
    targets: &'a [f64],
    feature_count: usize,
}

impl<'a> CartBuilder<'a> {
    pub fn new(features: &'a [FeatureVector], targets: &'a [f64], config: TreeConfig) -> Self {
        let feature_count = features.first().map(Vec::len).unwrap_or(0);
        Self {
            config,
            features,
            targets,
            feature_count,
        }
    }

    /// Build tree and return nodes plus raw importances
    pub fn build(&self, indices: &[usize]) -> BuiltTree {
        let mut nodes = Vec::new();
        let mut importances = vec![0.0; self.feature_count];

        self.build_node(indices, 0, &mut nodes, &mut importances);

        BuiltTree {
            tree: Tree::new(nodes),
            importances,
        }
    }

    /// Recursively build tree nodes in preorder
    fn build_node(
        &self,
        indices: &[usize],
        depth: usize,
        nodes: &mut Vec<Node>,
        importances: &mut [f64],
    ) -> i32 {
        let current_idx = nodes.len() as i32;
        let samples = indices.len() as u32;
        let leaf_value = self.mean(indices);

        if depth >= self.config.max_depth
            || indices.len() < self.config.min_samples_split
            || indices.len() < 2 * self.config.min_samples_leaf
        {
            nodes.push(Node::leaf(leaf_value, samples));
            return current_idx;
        }

        let Some(split) = self.find_best_split(indices) else {
            nodes.push(Node::leaf(leaf_value, samples));
            return current_idx;
        };

        let (left_indices, right_indices) =
            self.split_samples(indices, split.feature_idx, split.threshold);

        importances[split.feature_idx] += split.gain;

        // Reserve space for current node
        nodes.push(Node::internal(
            split.feature_idx as i32,
            split.threshold,
            -1,
            -1,
            samples,
        ));

        let left_idx = self.build_node(&left_indices, depth + 1, nodes, importances);
        let right_idx = self.build_node(&right_indices, depth + 1, nodes, importances);

        let node = &mut nodes[current_idx as usize];
        node.left = left_idx;
        node.right = right_idx;

        current_idx
    }

    /// Find best split using a sorted sweep per feature
    ///
    /// Ties keep the earlier candidate, so lower feature indices and lower
    /// thresholds win.
    fn find_best_split(&self, indices: &[usize]) -> Option<SplitCandidate> {
        let n = indices.len();
        if n < 2 {
            return None;
        }
        let min_leaf = self.config.min_samples_leaf.max(1);
        let total_sum: f64 = indices.iter().map(|&i| self.targets[i]).sum();
        let total_sq: f64 = indices.iter().map(|&i| self.targets[i].powi(2)).sum();
        let parent_sse = total_sq - total_sum * total_sum / n as f64;

        if parent_sse <= f64::EPSILON * total_sq.max(1.0) {
            return None;
        }

        let mut best: Option<SplitCandidate> = None;
        let mut order: Vec<usize> = indices.to_vec();

        for feature_idx in 0..self.feature_count {
            order.sort_by(|&a, &b| {
                self.features[a][feature_idx].total_cmp(&self.features[b][feature_idx])
            });

            let mut left_sum = 0.0;
            let mut left_sq = 0.0;

            for pos in 0..n - 1 {
                let y = self.targets[order[pos]];
                left_sum += y;
                left_sq += y * y;

                let here = self.features[order[pos]][feature_idx];
                let next = self.features[order[pos + 1]][feature_idx];
                if here == next {
                    continue;
                }

                let left_n = pos + 1;
                let right_n = n - left_n;
                if left_n < min_leaf || right_n < min_leaf {
                    continue;
                }

                let right_sum = total_sum - left_sum;
                let right_sq = total_sq - left_sq;
                let left_sse = left_sq - left_sum * left_sum / left_n as f64;
                let right_sse = right_sq - right_sum * right_sum / right_n as f64;
                let gain = parent_sse - left_sse - right_sse;

                if gain <= 0.0 {
                    continue;
                }

                // Adjacent floats can round the midpoint up onto `next`
                let mut threshold = here + (next - here) / 2.0;
                if threshold >= next {
                    threshold = here;
                }
                if best.map_or(true, |b| gain > b.gain) {
                    best = Some(SplitCandidate {
                        feature_idx,
                        threshold,
                        gain,
                    });
                }
            }
        }

        best
    }

    /// Split samples by threshold
    fn split_samples(
        &self,
        indices: &[usize],
        feature_idx: usize,
        threshold: f64,
    ) -> (Vec<usize>, Vec<usize>) {
        indices
            .iter()
            .partition(|&&i| self.features[i][feature_idx] <= threshold)
    }

    fn mean(&self, indices: &[usize]) -> f64 {
        if indices.is_empty() {
            return 0.0;
        }
        indices.iter().map(|&i| self.targets[i]).sum::<f64>() / indices.len() as f64
    }
}
