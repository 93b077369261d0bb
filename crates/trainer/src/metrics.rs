//! Regression quality metrics

use agroclim_core::{AgroError, FeatureVector, Regressor, Result};
use serde::{Deserialize, Serialize};

/// Scores for one evaluated partition
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    pub r2: f64,
    pub rmse: f64,
    pub mae: f64,
}

fn check_lengths(actual: &[f64], predicted: &[f64]) -> Result<()> {
    if actual.len() != predicted.len() {
        return Err(AgroError::InvalidParameters(format!(
            "{} actual values but {} predictions",
            actual.len(),
            predicted.len()
        )));
    }
    if actual.is_empty() {
        return Err(AgroError::insufficient("scoring predictions", 1, 0));
    }
    Ok(())
}

/// Coefficient of determination
///
/// A constant `actual` has no variance to explain and is reported as
/// [`AgroError::ConstantTarget`].
pub fn r2_score(actual: &[f64], predicted: &[f64]) -> Result<f64> {
    check_lengths(actual, predicted)?;
    let mean = actual.iter().sum::<f64>() / actual.len() as f64;
    let ss_tot: f64 = actual.iter().map(|y| (y - mean).powi(2)).sum();
    if ss_tot == 0.0 {
        return Err(AgroError::ConstantTarget(format!(
            "R² undefined: all {} values equal {}",
            actual.len(),
            mean
        )));
    }
    let ss_res: f64 = actual
        .iter()
        .zip(predicted)
        .map(|(y, p)| (y - p).powi(2))
        .sum();
    Ok(1.0 - ss_res / ss_tot)
}

pub fn rmse(actual: &[f64], predicted: &[f64]) -> Result<f64> {
    check_lengths(actual, predicted)?;
    let mse = actual
        .iter()
        .zip(predicted)
        .map(|(y, p)| (y - p).powi(2))
        .sum::<f64>()
        / actual.len() as f64;
    Ok(mse.sqrt())
}

pub fn mae(actual: &[f64], predicted: &[f64]) -> Result<f64> {
    check_lengths(actual, predicted)?;
    Ok(actual
        .iter()
        .zip(predicted)
        .map(|(y, p)| (y - p).abs())
        .sum::<f64>()
        / actual.len() as f64)
}

/// Score a fitted model on a partition
pub fn evaluate<M: Regressor + ?Sized>(
    model: &M,
    features: &[FeatureVector],
    targets: &[f64],
) -> Result<Metrics> {
    let predicted = model.predict(features);
    Ok(Metrics {
        r2: r2_score(targets, &predicted)?,
        rmse: rmse(targets, &predicted)?,
        mae: mae(targets, &predicted)?,
    })
}

/// Mean and population standard deviation
pub fn mean_std(values: &[f64]) -> (f64, f64) {
    if values.is_empty() {
        return (0.0, 0.0);
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    (mean, variance.sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_perfect_prediction() {
        let y = [1.0, 2.0, 3.0];
        assert_eq!(r2_score(&y, &y).unwrap(), 1.0);
        assert_eq!(rmse(&y, &y).unwrap(), 0.0);
        assert_eq!(mae(&y, &y).unwrap(), 0.0);
    }

    #[test]
    fn test_known_values() {
        let actual = [1.0, 2.0, 3.0, 4.0];
        let predicted = [2.0, 2.0, 3.0, 2.0];
        // ss_res = 1 + 0 + 0 + 4, ss_tot = 5
        assert!((r2_score(&actual, &predicted).unwrap() - 0.0).abs() < 1e-12);
        assert!((rmse(&actual, &predicted).unwrap() - (5.0f64 / 4.0).sqrt()).abs() < 1e-12);
        assert!((mae(&actual, &predicted).unwrap() - 0.75).abs() < 1e-12);
    }

    #[test]
    fn test_constant_target_r2() {
        assert!(matches!(
            r2_score(&[2.0, 2.0], &[1.0, 3.0]),
            Err(AgroError::ConstantTarget(_))
        ));
    }

    #[test]
    fn test_length_mismatch() {
        assert!(rmse(&[1.0], &[1.0, 2.0]).is_err());
        assert!(mae(&[], &[]).is_err());
    }

    #[test]
    fn test_mean_std_population() {
        let (mean, std) = mean_std(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]);
        assert_eq!(mean, 5.0);
        assert_eq!(std, 2.0);
        assert_eq!(mean_std(&[]), (0.0, 0.0));
    }
}
