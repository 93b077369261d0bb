//! CSV table input and output
//!
//! Inputs are read whole into memory. Rows that violate basic range
//! constraints are rejected with their row number rather than skipped.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::path::Path;
use tracing::debug;

use crate::errors::{AgroError, Result};
use crate::records::{HistoricalRecord, Pathway, ScenarioClimateRecord};

/// Read every row of a CSV file with a header line
pub fn read_csv<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    if !path.exists() {
        return Err(AgroError::MissingInput {
            path: path.to_path_buf(),
        });
    }

    let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_path(path)?;
    let rows = reader.deserialize().collect::<std::result::Result<Vec<T>, _>>()?;
    debug!("Read {} rows from {}", rows.len(), path.display());
    Ok(rows)
}

/// Write rows with a header line, creating parent directories
pub fn write_csv<T: Serialize>(path: &Path, rows: &[T]) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let mut writer = csv::Writer::from_path(path)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    debug!("Wrote {} rows to {}", rows.len(), path.display());
    Ok(())
}

/// Read and validate the merged historical dataset
pub fn read_historical(path: &Path) -> Result<Vec<HistoricalRecord>> {
    let records: Vec<HistoricalRecord> = read_csv(path)?;
    for (idx, record) in records.iter().enumerate() {
        validate_historical(idx + 1, record)?;
    }
    Ok(records)
}

/// Read and validate the future climate grid
pub fn read_scenarios(path: &Path) -> Result<Vec<ScenarioClimateRecord>> {
    let records: Vec<ScenarioClimateRecord> = read_csv(path)?;
    for (idx, record) in records.iter().enumerate() {
        validate_scenario(idx + 1, record)?;
    }
    Ok(records)
}

fn validate_historical(row: usize, record: &HistoricalRecord) -> Result<()> {
    let reason = if record.state.is_empty() || record.crop.is_empty() {
        Some("empty State or Crop".to_string())
    } else if !(record.rainfall_mm >= 0.0) || !record.rainfall_mm.is_finite() {
        Some(format!(
            "Rainfall_mm {} is not a finite non-negative value",
            record.rainfall_mm
        ))
    } else if !(record.area_ha > 0.0) || !record.area_ha.is_finite() {
        Some(format!("Area_ha {} is not a finite positive value", record.area_ha))
    } else if !(record.yield_ton_per_ha > 0.0) || !record.yield_ton_per_ha.is_finite() {
        Some(format!(
            "Yield_ton_per_ha {} is not positive",
            record.yield_ton_per_ha
        ))
    } else if !record.avg_temp_c.is_finite() {
        Some("Avg_Temp_C is not finite".to_string())
    } else {
        None
    };

    match reason {
        Some(reason) => Err(AgroError::InvalidRecord { row, reason }),
        None => Ok(()),
    }
}

fn validate_scenario(row: usize, record: &ScenarioClimateRecord) -> Result<()> {
    let reason = if record.state.is_empty() {
        Some("empty State".to_string())
    } else if Pathway::classify(&record.scenario).is_none() {
        Some(format!("unrecognised Scenario '{}'", record.scenario))
    } else if !(record.rainfall_mm >= 0.0) || !record.rainfall_mm.is_finite() {
        Some(format!(
            "Rainfall_mm {} is not a finite non-negative value",
            record.rainfall_mm
        ))
    } else if !record.avg_temp_c.is_finite() {
        Some("Avg_Temp_C is not finite".to_string())
    } else {
        None
    };

    match reason {
        Some(reason) => Err(AgroError::InvalidRecord { row, reason }),
        None => Ok(()),
    }
}
