//! AgroClim projection: scenario forecasts and yield change
//!
//! Modules:
//! - `forecast`: score future climate scenarios with a trained artifact
//! - `change`: compare future mean yield against the historical baseline
//! - `impact`: per-crop linear sensitivity of yield to rainfall and temperature

pub mod change;
pub mod forecast;
pub mod impact;

pub use change::{
    baseline, change, future_mean, summarize_by_scenario, ChangeQuantifier, ChangeReport,
    MissingSide, ScenarioSummary, UndefinedChange, UnmatchedKey, YearWindow,
};
pub use forecast::{forecast, ScenarioForecaster};
pub use impact::{climate_coefficients, ImpactCoefficient, ImpactReport, SkippedCrop, IMPACT_FILE};
