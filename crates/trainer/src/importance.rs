//! Ranked feature importance table

use agroclim_core::{AgroError, Regressor, Result, FEATURE_COLUMNS};
use serde::{Deserialize, Serialize};

/// One row of `feature_importance.csv`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureImportance {
    #[serde(rename = "Feature")]
    pub feature: String,
    #[serde(rename = "Importance")]
    pub importance: f64,
}

/// Rank the model's importances, highest first
///
/// Scores are normalized to sum to 1. A model that never split (all
/// scores zero) gets a uniform distribution. Equal scores keep column
/// order.
pub fn rank<M: Regressor + ?Sized>(model: &M) -> Result<Vec<FeatureImportance>> {
    let raw = model.feature_importances();
    if raw.len() != FEATURE_COLUMNS.len() {
        return Err(AgroError::ArtifactMismatch(format!(
            "model reports {} importances for {} feature columns",
            raw.len(),
            FEATURE_COLUMNS.len()
        )));
    }
    if let Some((idx, value)) = raw
        .iter()
        .enumerate()
        .find(|(_, v)| !v.is_finite() || **v < 0.0)
    {
        return Err(AgroError::InvalidParameters(format!(
            "importance for {} is {}",
            FEATURE_COLUMNS[idx], value
        )));
    }

    let total: f64 = raw.iter().sum();
    let normalized: Vec<f64> = if total > 0.0 {
        raw.iter().map(|v| v / total).collect()
    } else {
        vec![1.0 / raw.len() as f64; raw.len()]
    };

    let mut ranked: Vec<FeatureImportance> = FEATURE_COLUMNS
        .iter()
        .zip(normalized)
        .map(|(name, importance)| FeatureImportance {
            feature: name.to_string(),
            importance,
        })
        .collect();
    // Stable sort keeps column order among equal scores
    ranked.sort_by(|a, b| b.importance.total_cmp(&a.importance));
    Ok(ranked)
}
