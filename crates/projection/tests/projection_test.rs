//! End-to-end projection from a saved artifact to change records

use agroclim_core::{
    tables, CategoricalEncoder, CategoryField, EncoderState, ForestModel, HistoricalRecord,
    Hyperparameters, ModelArtifact, Node, NormalizationBounds, PredictionRecord,
    ScenarioClimateRecord, StageDeadline, Tree, FEATURE_COUNT,
};
use agroclim_projection::{change, summarize_by_scenario, ChangeQuantifier, ScenarioForecaster};
use anyhow::Result;
use proptest::prelude::*;
use std::collections::BTreeMap;
use tempfile::TempDir;

/// Year_Normalized above 1.0 (beyond training years) predicts 2.4, otherwise 3.0
fn artifact() -> ModelArtifact {
    let tree = Tree::new(vec![
        Node::internal(1, 1.0, 1, 2, 10),
        Node::leaf(3.0, 6),
        Node::leaf(2.4, 4),
    ]);
    let mut importances = vec![0.0; FEATURE_COUNT];
    importances[1] = 1.0;
    ModelArtifact::new(
        EncoderState {
            state: CategoricalEncoder::fit(CategoryField::State, ["Punjab"]).unwrap(),
            crop: CategoricalEncoder::fit(CategoryField::Crop, ["Rice"]).unwrap(),
        },
        NormalizationBounds::new(1990, 2023).unwrap(),
        Hyperparameters::default(),
        ForestModel::new(FEATURE_COUNT, vec![tree], importances),
    )
}

fn historical(year: i32) -> HistoricalRecord {
    HistoricalRecord {
        year,
        state: "Punjab".into(),
        crop: "Rice".into(),
        area_ha: 10.0,
        production_ton: 30.0,
        yield_ton_per_ha: 3.0,
        rainfall_mm: 700.0,
        avg_temp_c: 25.0,
        max_temp_c: 32.0,
        min_temp_c: 18.0,
        rainfall_deviation: 0.0,
        temp_deviation: 0.0,
        decade: year / 10 * 10,
    }
}

fn scenario(year: i32, label: &str) -> ScenarioClimateRecord {
    ScenarioClimateRecord {
        year,
        state: "Punjab".into(),
        scenario: label.into(),
        rainfall_mm: 690.0,
        avg_temp_c: 26.5,
        max_temp_c: 33.5,
        min_temp_c: 19.5,
    }
}

#[test]
fn test_rice_drop_reported_as_minus_twenty_percent() -> Result<()> {
    let dir = TempDir::new()?;
    let model_path = dir.path().join("model.json");
    artifact().save(&model_path)?;
    let loaded: ModelArtifact = ModelArtifact::load(&model_path)?;

    let future: Vec<ScenarioClimateRecord> = (2040..=2050)
        .flat_map(|y| [scenario(y, "SSP2-4.5"), scenario(y, "SSP5-8.5")])
        .collect();
    let crops = vec!["Rice".to_string()];
    let predictions = ScenarioForecaster::new(&loaded, &crops)?
        .forecast(&future, &StageDeadline::unbounded("forecast"))?;
    assert_eq!(predictions.len(), future.len());
    assert!(predictions.iter().all(|p| p.predicted_yield == 2.4));

    let history: Vec<HistoricalRecord> = (2015..=2023).map(historical).collect();
    let report = ChangeQuantifier::default().quantify(&history, &predictions);

    assert_eq!(report.records.len(), 2);
    for record in &report.records {
        assert_eq!(record.baseline_yield, 3.0);
        assert!((record.yield_change_percent + 20.0).abs() < 1e-9);
    }

    let summary = summarize_by_scenario(&report.records);
    assert_eq!(summary.len(), 2);
    assert!(summary.iter().all(|s| (s.mean_change + 20.0).abs() < 1e-9));

    let out = dir.path().join("out");
    tables::write_csv(&out.join("future_predictions.csv"), &predictions)?;
    tables::write_csv(&out.join("yield_change_projections.csv"), &report.records)?;
    let back: Vec<PredictionRecord> = tables::read_csv(&out.join("future_predictions.csv"))?;
    assert_eq!(back, predictions);

    Ok(())
}

#[test]
fn test_cancelled_forecast_stops() {
    let token = agroclim_core::CancellationToken::new();
    token.cancel();
    let deadline = StageDeadline::start("forecast", None, token);
    let artifact = artifact();
    let crops = vec!["Rice".to_string()];

    let result = ScenarioForecaster::new(&artifact, &crops)
        .and_then(|f| f.forecast(&[scenario(2045, "SSP2-4.5")], &deadline));
    assert!(matches!(
        result,
        Err(agroclim_core::AgroError::Cancelled { stage: "forecast" })
    ));
}

fn single_pair(base: f64, future: f64) -> agroclim_projection::ChangeReport {
    let baseline = BTreeMap::from([(("Punjab".to_string(), "Rice".to_string()), base)]);
    let projected = BTreeMap::from([(
        ("Punjab".to_string(), "Rice".to_string(), "SSP2-4.5".to_string()),
        future,
    )]);
    change(&baseline, &projected)
}

proptest! {
    #[test]
    fn equal_means_give_zero_change(value in 0.01f64..50.0) {
        let report = single_pair(value, value);
        prop_assert_eq!(report.records.len(), 1);
        prop_assert_eq!(report.records[0].yield_change_percent, 0.0);
    }

    #[test]
    fn change_sign_follows_direction(base in 0.01f64..50.0, future in 0.0f64..50.0) {
        let report = single_pair(base, future);
        let pct = report.records[0].yield_change_percent;
        prop_assert_eq!(pct > 0.0, future > base);
        prop_assert!(pct >= -100.0);
    }

    #[test]
    fn zero_baseline_never_yields_a_record(future in 0.0f64..50.0) {
        let report = single_pair(0.0, future);
        prop_assert!(report.records.is_empty());
        prop_assert_eq!(report.undefined.len(), 1);
    }
}
