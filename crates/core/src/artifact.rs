//! Packaged model artifact
//!
//! An artifact bundles the fitted regressor with everything needed to
//! rebuild training-time features: encoders, year bounds and the column
//! order. It is written as canonical JSON with a Blake3 hash beside it.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::config::Hyperparameters;
use crate::encoder::EncoderState;
use crate::errors::{AgroError, Result};
use crate::features::{self, FeatureInput, FeatureVector, NormalizationBounds, FEATURE_COLUMNS};
use crate::forest::{ForestModel, Regressor};
use crate::serde_canon::{hash_canonical_hex, to_canonical_json};

/// Bumped whenever the serialized layout or feature semantics change
pub const ARTIFACT_FORMAT_VERSION: u32 = 1;

/// Fitted model plus its training-time feature state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelArtifact<M = ForestModel> {
    pub format_version: u32,
    pub feature_columns: Vec<String>,
    pub encoders: EncoderState,
    pub bounds: NormalizationBounds,
    pub hyperparameters: Hyperparameters,
    pub model: M,
}

impl<M: Regressor> ModelArtifact<M> {
    pub fn new(
        encoders: EncoderState,
        bounds: NormalizationBounds,
        hyperparameters: Hyperparameters,
        model: M,
    ) -> Self {
        Self {
            format_version: ARTIFACT_FORMAT_VERSION,
            feature_columns: FEATURE_COLUMNS.iter().map(|c| c.to_string()).collect(),
            encoders,
            bounds,
            hyperparameters,
            model,
        }
    }

    /// Reject artifacts whose layout differs from what this build produces
    pub fn check_compatible(&self) -> Result<()> {
        if self.format_version != ARTIFACT_FORMAT_VERSION {
            return Err(AgroError::ArtifactMismatch(format!(
                "format version {} (expected {})",
                self.format_version, ARTIFACT_FORMAT_VERSION
            )));
        }
        if !self
            .feature_columns
            .iter()
            .map(String::as_str)
            .eq(FEATURE_COLUMNS.iter().copied())
        {
            return Err(AgroError::ArtifactMismatch(format!(
                "feature columns {:?} (expected {:?})",
                self.feature_columns, FEATURE_COLUMNS
            )));
        }
        if self.model.feature_count() != FEATURE_COLUMNS.len() {
            return Err(AgroError::ArtifactMismatch(format!(
                "model expects {} features, artifact lists {}",
                self.model.feature_count(),
                FEATURE_COLUMNS.len()
            )));
        }
        self.model.validate().map_err(AgroError::ArtifactMismatch)
    }

    /// Features for one record using the training-time encoders and bounds
    pub fn features(&self, input: FeatureInput<'_>) -> Result<FeatureVector> {
        features::build(input, &self.encoders, &self.bounds)
    }

    pub fn predict(&self, input: FeatureInput<'_>) -> Result<f64> {
        Ok(self.model.predict_one(&self.features(input)?))
    }
}

impl<M: Regressor + Serialize> ModelArtifact<M> {
    pub fn hash_hex(&self) -> Result<String> {
        Ok(hash_canonical_hex(self)?)
    }

    /// Write `<path>` (canonical JSON) and `<path>.hash` (hex Blake3)
    pub fn save(&self, path: &Path) -> Result<String> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let json = to_canonical_json(self)?;
        let hash = hex::encode(blake3::hash(json.as_bytes()).as_bytes());

        fs::write(path, &json)?;
        fs::write(hash_path(path), &hash)?;

        info!("Saved model artifact to {} ({})", path.display(), hash);
        Ok(hash)
    }
}

impl<M: Regressor + DeserializeOwned> ModelArtifact<M> {
    /// Load, verify the stored hash, and check compatibility
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(AgroError::MissingInput {
                path: path.to_path_buf(),
            });
        }
        let hash_file = hash_path(path);
        if !hash_file.exists() {
            return Err(AgroError::MissingInput { path: hash_file });
        }

        let json = fs::read_to_string(path)?;
        let expected = fs::read_to_string(&hash_file)?;
        let actual = hex::encode(blake3::hash(json.as_bytes()).as_bytes());
        if expected.trim() != actual {
            return Err(AgroError::ArtifactMismatch(format!(
                "hash mismatch for {}: stored {}, computed {}",
                path.display(),
                expected.trim(),
                actual
            )));
        }

        let artifact: Self = serde_json::from_str(&json)?;
        artifact.check_compatible()?;
        Ok(artifact)
    }
}

fn hash_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".hash");
    PathBuf::from(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoder::{CategoricalEncoder, CategoryField};
    use crate::forest::{Node, Tree};
    use tempfile::TempDir;

    fn artifact() -> ModelArtifact {
        let encoders = EncoderState {
            state: CategoricalEncoder::fit(CategoryField::State, ["Bihar", "Punjab"]).unwrap(),
            crop: CategoricalEncoder::fit(CategoryField::Crop, ["Rice", "Wheat"]).unwrap(),
        };
        let tree = Tree::new(vec![
            Node::internal(1, 0.5, 1, 2, 10),
            Node::leaf(2.125, 5),
            Node::leaf(3.3333333333333335, 5),
        ]);
        let model = ForestModel::new(
            FEATURE_COLUMNS.len(),
            vec![tree],
            vec![0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 0.0],
        );
        ModelArtifact::new(
            encoders,
            NormalizationBounds::new(1990, 2023).unwrap(),
            Hyperparameters::default(),
            model,
        )
    }

    fn input(year: i32) -> FeatureInput<'static> {
        FeatureInput {
            year,
            state: "Punjab",
            crop: "Wheat",
            rainfall_mm: 612.4,
            avg_temp_c: 24.1,
        }
    }

    #[test]
    fn test_new_artifact_is_compatible() {
        assert!(artifact().check_compatible().is_ok());
    }

    #[test]
    fn test_reordered_columns_rejected() {
        let mut a = artifact();
        a.feature_columns.swap(0, 1);
        assert!(matches!(
            a.check_compatible(),
            Err(AgroError::ArtifactMismatch(_))
        ));

        let mut b = artifact();
        b.format_version = 99;
        assert!(matches!(
            b.check_compatible(),
            Err(AgroError::ArtifactMismatch(_))
        ));
    }

    #[test]
    fn test_save_load_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("model.json");
        let original = artifact();

        let hash = original.save(&path).unwrap();
        let loaded: ModelArtifact = ModelArtifact::load(&path).unwrap();

        assert_eq!(loaded, original);
        assert_eq!(loaded.hash_hex().unwrap(), hash);
        for year in [1995, 2010, 2040] {
            let a = original.predict(input(year)).unwrap();
            let b = loaded.predict(input(year)).unwrap();
            assert_eq!(a.to_bits(), b.to_bits());
        }
    }

    #[test]
    fn test_tampered_file_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("model.json");
        artifact().save(&path).unwrap();

        let json = fs::read_to_string(&path).unwrap();
        fs::write(&path, json.replace("2.125", "9.125")).unwrap();

        assert!(matches!(
            ModelArtifact::<ForestModel>::load(&path),
            Err(AgroError::ArtifactMismatch(_))
        ));
    }

    #[test]
    fn test_missing_artifact() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            ModelArtifact::<ForestModel>::load(&dir.path().join("absent.json")),
            Err(AgroError::MissingInput { .. })
        ));
    }
}
