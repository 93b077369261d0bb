//! Scenario forecasting
//!
//! Every scenario climate row is scored once per crop of interest, with the
//! crop fixed and all other features rebuilt from the artifact's
//! training-time encoders and year bounds.

use agroclim_core::{
    AgroError, FeatureInput, ModelArtifact, PredictionRecord, Regressor, Result,
    ScenarioClimateRecord, StageDeadline,
};
use rayon::prelude::*;
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Scores scenario climate with a loaded model artifact
pub struct ScenarioForecaster<'a, M: Regressor> {
    artifact: &'a ModelArtifact<M>,
    crops: Vec<String>,
}

impl<'a, M: Regressor> ScenarioForecaster<'a, M> {
    /// Bind an artifact and the crops to project
    ///
    /// Fails with [`AgroError::ArtifactMismatch`] when the artifact's layout
    /// differs from the features this build produces.
    pub fn new(artifact: &'a ModelArtifact<M>, crops: &[String]) -> Result<Self> {
        artifact.check_compatible()?;
        if crops.is_empty() {
            return Err(AgroError::InvalidParameters(
                "no crops to forecast".to_string(),
            ));
        }
        Ok(Self {
            artifact,
            crops: crops.to_vec(),
        })
    }

    /// Predict yield for every (scenario, crop, record)
    ///
    /// Batches are grouped by scenario label and then by crop, and come back
    /// in that order.
    pub fn forecast(
        &self,
        records: &[ScenarioClimateRecord],
        deadline: &StageDeadline,
    ) -> Result<Vec<PredictionRecord>> {
        let mut by_scenario: BTreeMap<&str, Vec<&ScenarioClimateRecord>> = BTreeMap::new();
        for record in records {
            by_scenario
                .entry(record.scenario.as_str())
                .or_default()
                .push(record);
        }

        let batches: Vec<(&str, &str, &[&ScenarioClimateRecord])> = by_scenario
            .iter()
            .flat_map(|(scenario, rows)| {
                self.crops
                    .iter()
                    .map(move |crop| (*scenario, crop.as_str(), rows.as_slice()))
            })
            .collect();

        info!(
            "Forecasting {} rows across {} scenarios and {} crops",
            records.len(),
            by_scenario.len(),
            self.crops.len()
        );

        let scored: Vec<Vec<PredictionRecord>> = batches
            .par_iter()
            .map(|&(scenario, crop, rows)| {
                deadline.check()?;
                let batch = self.score_batch(crop, rows)?;
                debug!("Scored {} rows for {} / {}", batch.len(), scenario, crop);
                Ok(batch)
            })
            .collect::<Result<_>>()?;

        let predictions: Vec<PredictionRecord> = scored.into_iter().flatten().collect();
        info!("Generated {} future predictions", predictions.len());
        Ok(predictions)
    }

    fn score_batch(
        &self,
        crop: &str,
        rows: &[&ScenarioClimateRecord],
    ) -> Result<Vec<PredictionRecord>> {
        rows.iter()
            .map(|row| {
                let input = FeatureInput {
                    year: row.year,
                    state: &row.state,
                    crop,
                    rainfall_mm: row.rainfall_mm,
                    avg_temp_c: row.avg_temp_c,
                };
                Ok(PredictionRecord {
                    year: row.year,
                    state: row.state.clone(),
                    scenario: row.scenario.clone(),
                    crop: crop.to_string(),
                    rainfall_mm: row.rainfall_mm,
                    avg_temp_c: row.avg_temp_c,
                    predicted_yield: self.artifact.predict(input)?,
                })
            })
            .collect()
    }
}

/// Forecast with a one-off [`ScenarioForecaster`]
pub fn forecast<M: Regressor>(
    artifact: &ModelArtifact<M>,
    records: &[ScenarioClimateRecord],
    crops: &[String],
    deadline: &StageDeadline,
) -> Result<Vec<PredictionRecord>> {
    ScenarioForecaster::new(artifact, crops)?.forecast(records, deadline)
}
