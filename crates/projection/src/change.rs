//! Yield change against the historical baseline
//!
//! Observed yields inside the baseline window are averaged per
//! (State, Crop); predictions inside the future window are averaged per
//! (State, Crop, Scenario). Each future mean is compared with its
//! baseline as a percent change.

use agroclim_core::{
    ChangeRecord, HistoricalRecord, PredictionRecord, ProjectionConfig,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{info, warn};

/// Inclusive year range filter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct YearWindow {
    pub from: Option<i32>,
    pub to: Option<i32>,
}

impl YearWindow {
    /// Every year
    pub fn all() -> Self {
        Self::default()
    }

    /// `year >= from`
    pub fn from(from: i32) -> Self {
        Self {
            from: Some(from),
            to: None,
        }
    }

    /// `from <= year <= to`
    pub fn between(from: i32, to: i32) -> Self {
        Self {
            from: Some(from),
            to: Some(to),
        }
    }

    pub fn contains(&self, year: i32) -> bool {
        self.from.map_or(true, |f| year >= f) && self.to.map_or(true, |t| year <= t)
    }
}

pub type BaselineKey = (String, String);
pub type FutureKey = (String, String, String);

#[derive(Default)]
struct Mean {
    sum: f64,
    count: usize,
}

impl Mean {
    fn add(&mut self, value: f64) {
        self.sum += value;
        self.count += 1;
    }

    fn value(&self) -> f64 {
        self.sum / self.count as f64
    }
}

fn finish<K: Ord>(acc: BTreeMap<K, Mean>) -> BTreeMap<K, f64> {
    acc.into_iter().map(|(k, m)| (k, m.value())).collect()
}

/// Mean observed yield per (State, Crop) inside `window`
pub fn baseline(records: &[HistoricalRecord], window: YearWindow) -> BTreeMap<BaselineKey, f64> {
    let mut acc: BTreeMap<BaselineKey, Mean> = BTreeMap::new();
    for record in records.iter().filter(|r| window.contains(r.year)) {
        acc.entry((record.state.clone(), record.crop.clone()))
            .or_default()
            .add(record.yield_ton_per_ha);
    }
    finish(acc)
}

/// Mean predicted yield per (State, Crop, Scenario) inside `window`
pub fn future_mean(
    predictions: &[PredictionRecord],
    window: YearWindow,
) -> BTreeMap<FutureKey, f64> {
    let mut acc: BTreeMap<FutureKey, Mean> = BTreeMap::new();
    for prediction in predictions.iter().filter(|p| window.contains(p.year)) {
        acc.entry((
            prediction.state.clone(),
            prediction.crop.clone(),
            prediction.scenario.clone(),
        ))
        .or_default()
        .add(prediction.predicted_yield);
    }
    finish(acc)
}

/// Percent change could not be computed because the baseline is zero
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UndefinedChange {
    pub state: String,
    pub crop: String,
    pub scenario: String,
    pub predicted_yield: f64,
}

/// Which side a key was missing from
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum MissingSide {
    /// Future mean exists but no baseline for its (State, Crop)
    Baseline,
    /// Baseline exists but no scenario produced a future mean
    Future,
}

/// A key present on only one side of the comparison
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnmatchedKey {
    pub state: String,
    pub crop: String,
    pub scenario: Option<String>,
    pub missing: MissingSide,
}

/// Result of comparing future means with the baseline
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChangeReport {
    pub records: Vec<ChangeRecord>,
    pub undefined: Vec<UndefinedChange>,
    pub unmatched: Vec<UnmatchedKey>,
}

/// `(future - baseline) / baseline * 100` for every matched key
pub fn change(
    baseline: &BTreeMap<BaselineKey, f64>,
    future: &BTreeMap<FutureKey, f64>,
) -> ChangeReport {
    let mut report = ChangeReport::default();
    let mut matched: BTreeSet<(&str, &str)> = BTreeSet::new();

    for ((state, crop, scenario), &predicted) in future {
        let Some(&base) = baseline.get(&(state.clone(), crop.clone())) else {
            report.unmatched.push(UnmatchedKey {
                state: state.clone(),
                crop: crop.clone(),
                scenario: Some(scenario.clone()),
                missing: MissingSide::Baseline,
            });
            continue;
        };
        matched.insert((state.as_str(), crop.as_str()));

        if base == 0.0 {
            warn!(
                "Zero baseline yield for {} / {} ({}); change omitted",
                state, crop, scenario
            );
            report.undefined.push(UndefinedChange {
                state: state.clone(),
                crop: crop.clone(),
                scenario: scenario.clone(),
                predicted_yield: predicted,
            });
            continue;
        }

        report.records.push(ChangeRecord {
            state: state.clone(),
            crop: crop.clone(),
            scenario: scenario.clone(),
            predicted_yield: predicted,
            baseline_yield: base,
            yield_change_percent: (predicted - base) / base * 100.0,
        });
    }

    for (state, crop) in baseline.keys() {
        if !matched.contains(&(state.as_str(), crop.as_str())) {
            report.unmatched.push(UnmatchedKey {
                state: state.clone(),
                crop: crop.clone(),
                scenario: None,
                missing: MissingSide::Future,
            });
        }
    }

    if !report.unmatched.is_empty() {
        info!(
            "{} keys had no counterpart and were excluded",
            report.unmatched.len()
        );
    }
    report
}

/// Baseline and future windows applied together
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChangeQuantifier {
    pub baseline_window: YearWindow,
    pub future_window: YearWindow,
}

impl Default for ChangeQuantifier {
    fn default() -> Self {
        Self::from_config(&ProjectionConfig::default())
    }
}

impl ChangeQuantifier {
    pub fn from_config(config: &ProjectionConfig) -> Self {
        Self {
            baseline_window: YearWindow::from(config.baseline_from),
            future_window: YearWindow::from(config.future_from),
        }
    }

    pub fn quantify(
        &self,
        historical: &[HistoricalRecord],
        predictions: &[PredictionRecord],
    ) -> ChangeReport {
        let base = baseline(historical, self.baseline_window);
        let future = future_mean(predictions, self.future_window);
        let report = change(&base, &future);
        info!(
            "Computed {} yield changes ({} undefined, {} unmatched)",
            report.records.len(),
            report.undefined.len(),
            report.unmatched.len()
        );
        report
    }
}

/// Average and range of change for one scenario
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioSummary {
    pub scenario: String,
    pub records: usize,
    pub mean_change: f64,
    pub min_change: f64,
    pub max_change: f64,
}

/// Per-scenario mean, minimum and maximum percent change
pub fn summarize_by_scenario(records: &[ChangeRecord]) -> Vec<ScenarioSummary> {
    let mut groups: BTreeMap<&str, Vec<f64>> = BTreeMap::new();
    for record in records {
        groups
            .entry(record.scenario.as_str())
            .or_default()
            .push(record.yield_change_percent);
    }

    groups
        .into_iter()
        .map(|(scenario, changes)| ScenarioSummary {
            scenario: scenario.to_string(),
            records: changes.len(),
            mean_change: changes.iter().sum::<f64>() / changes.len() as f64,
            min_change: changes.iter().copied().fold(f64::INFINITY, f64::min),
            max_change: changes.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        })
        .collect()
}
