//! Typed rows exchanged between pipeline stages
//!
//! Field names serialize to the column headers used by the upstream
//! cleaning step and the downstream visualization layer.

use serde::{Deserialize, Serialize};

/// One year of climate for a state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClimateObservation {
    #[serde(rename = "Year")]
    pub year: i32,
    #[serde(rename = "State")]
    pub state: String,
    #[serde(rename = "Rainfall_mm")]
    pub rainfall_mm: f64,
    #[serde(rename = "Avg_Temp_C")]
    pub avg_temp_c: f64,
}

/// One year of production for a (state, crop)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YieldRecord {
    #[serde(rename = "Year")]
    pub year: i32,
    #[serde(rename = "State")]
    pub state: String,
    #[serde(rename = "Crop")]
    pub crop: String,
    #[serde(rename = "Area_ha")]
    pub area_ha: f64,
    #[serde(rename = "Production_ton")]
    pub production_ton: f64,
    #[serde(rename = "Yield_ton_per_ha")]
    pub yield_ton_per_ha: f64,
}

/// Merged yield + climate row produced by the upstream cleaning step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoricalRecord {
    #[serde(rename = "Year")]
    pub year: i32,
    #[serde(rename = "State")]
    pub state: String,
    #[serde(rename = "Crop")]
    pub crop: String,
    #[serde(rename = "Area_ha")]
    pub area_ha: f64,
    #[serde(rename = "Production_ton")]
    pub production_ton: f64,
    #[serde(rename = "Yield_ton_per_ha")]
    pub yield_ton_per_ha: f64,
    #[serde(rename = "Rainfall_mm")]
    pub rainfall_mm: f64,
    #[serde(rename = "Avg_Temp_C")]
    pub avg_temp_c: f64,
    #[serde(rename = "Max_Temp_C", default)]
    pub max_temp_c: f64,
    #[serde(rename = "Min_Temp_C", default)]
    pub min_temp_c: f64,
    #[serde(rename = "Rainfall_Deviation", default)]
    pub rainfall_deviation: f64,
    #[serde(rename = "Temp_Deviation", default)]
    pub temp_deviation: f64,
    #[serde(rename = "Decade", default)]
    pub decade: i32,
}

impl HistoricalRecord {
    /// Split the merged row back into its climate and yield halves
    pub fn parts(&self) -> (ClimateObservation, YieldRecord) {
        (
            ClimateObservation {
                year: self.year,
                state: self.state.clone(),
                rainfall_mm: self.rainfall_mm,
                avg_temp_c: self.avg_temp_c,
            },
            YieldRecord {
                year: self.year,
                state: self.state.clone(),
                crop: self.crop.clone(),
                area_ha: self.area_ha,
                production_ton: self.production_ton,
                yield_ton_per_ha: self.yield_ton_per_ha,
            },
        )
    }
}

/// Emissions pathway a future climate row belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Pathway {
    Moderate,
    High,
}

impl Pathway {
    /// Classify a scenario label such as `SSP2-4.5`, `SSP5-8.5`,
    /// `moderate` or `high`.
    pub fn classify(label: &str) -> Option<Self> {
        let normalized = label.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "moderate" | "ssp2-4.5" | "ssp245" | "rcp4.5" => Some(Self::Moderate),
            "high" | "ssp5-8.5" | "ssp585" | "rcp8.5" => Some(Self::High),
            _ => None,
        }
    }
}

/// Projected climate for a (year, state, scenario)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioClimateRecord {
    #[serde(rename = "Year")]
    pub year: i32,
    #[serde(rename = "State")]
    pub state: String,
    #[serde(rename = "Scenario")]
    pub scenario: String,
    #[serde(rename = "Rainfall_mm")]
    pub rainfall_mm: f64,
    #[serde(rename = "Avg_Temp_C")]
    pub avg_temp_c: f64,
    #[serde(rename = "Max_Temp_C", default)]
    pub max_temp_c: f64,
    #[serde(rename = "Min_Temp_C", default)]
    pub min_temp_c: f64,
}

/// Forecast output row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionRecord {
    #[serde(rename = "Year")]
    pub year: i32,
    #[serde(rename = "State")]
    pub state: String,
    #[serde(rename = "Scenario")]
    pub scenario: String,
    #[serde(rename = "Crop")]
    pub crop: String,
    #[serde(rename = "Rainfall_mm")]
    pub rainfall_mm: f64,
    #[serde(rename = "Avg_Temp_C")]
    pub avg_temp_c: f64,
    #[serde(rename = "Predicted_Yield")]
    pub predicted_yield: f64,
}

/// Change of future mean yield against the historical baseline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeRecord {
    #[serde(rename = "State")]
    pub state: String,
    #[serde(rename = "Crop")]
    pub crop: String,
    #[serde(rename = "Scenario")]
    pub scenario: String,
    #[serde(rename = "Predicted_Yield")]
    pub predicted_yield: f64,
    #[serde(rename = "Baseline_Yield")]
    pub baseline_yield: f64,
    #[serde(rename = "Yield_Change_Percent")]
    pub yield_change_percent: f64,
}
