//! Linear climate sensitivity per crop
//!
//! For each crop, yield is regressed on rainfall and average temperature
//! with ordinary least squares and an intercept. The slopes read as
//! "tonnes per hectare per mm" and "tonnes per hectare per °C".

use agroclim_core::HistoricalRecord;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{info, warn};

pub const IMPACT_FILE: &str = "climate_impact_coefficients.csv";

/// Fitted slopes and in-sample R² for one crop
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImpactCoefficient {
    #[serde(rename = "Crop")]
    pub crop: String,
    #[serde(rename = "Rainfall_Coefficient")]
    pub rainfall_coefficient: f64,
    #[serde(rename = "Temperature_Coefficient")]
    pub temperature_coefficient: f64,
    #[serde(rename = "R_squared")]
    pub r_squared: f64,
}

/// A crop whose regression could not be fitted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedCrop {
    pub crop: String,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImpactReport {
    pub coefficients: Vec<ImpactCoefficient>,
    pub skipped: Vec<SkippedCrop>,
}

/// Fit one regression per crop, in crop name order
pub fn climate_coefficients(records: &[HistoricalRecord]) -> ImpactReport {
    let mut by_crop: BTreeMap<&str, Vec<&HistoricalRecord>> = BTreeMap::new();
    for record in records {
        by_crop.entry(record.crop.as_str()).or_default().push(record);
    }

    let mut report = ImpactReport::default();
    for (crop, rows) in by_crop {
        match fit_crop(&rows) {
            Ok((rainfall_coefficient, temperature_coefficient, r_squared)) => {
                info!(
                    "{}: rainfall {:.6}, temperature {:.6}, R² {:.4}",
                    crop, rainfall_coefficient, temperature_coefficient, r_squared
                );
                report.coefficients.push(ImpactCoefficient {
                    crop: crop.to_string(),
                    rainfall_coefficient,
                    temperature_coefficient,
                    r_squared,
                });
            }
            Err(reason) => {
                warn!("Skipping climate impact for {}: {}", crop, reason);
                report.skipped.push(SkippedCrop {
                    crop: crop.to_string(),
                    reason,
                });
            }
        }
    }
    report
}

/// Two-regressor OLS on centered sums
fn fit_crop(rows: &[&HistoricalRecord]) -> Result<(f64, f64, f64), String> {
    if rows.len() < 3 {
        return Err(format!("{} rows, need at least 3", rows.len()));
    }

    let n = rows.len() as f64;
    let mean_rain = rows.iter().map(|r| r.rainfall_mm).sum::<f64>() / n;
    let mean_temp = rows.iter().map(|r| r.avg_temp_c).sum::<f64>() / n;
    let mean_yield = rows.iter().map(|r| r.yield_ton_per_ha).sum::<f64>() / n;

    let (mut s_rr, mut s_rt, mut s_tt, mut s_ry, mut s_ty, mut s_yy) =
        (0.0, 0.0, 0.0, 0.0, 0.0, 0.0);
    for row in rows {
        let dr = row.rainfall_mm - mean_rain;
        let dt = row.avg_temp_c - mean_temp;
        let dy = row.yield_ton_per_ha - mean_yield;
        s_rr += dr * dr;
        s_rt += dr * dt;
        s_tt += dt * dt;
        s_ry += dr * dy;
        s_ty += dt * dy;
        s_yy += dy * dy;
    }

    let det = s_rr * s_tt - s_rt * s_rt;
    if det <= f64::EPSILON * s_rr * s_tt {
        return Err("rainfall and temperature are constant or collinear".to_string());
    }
    if s_yy == 0.0 {
        return Err("yield is constant".to_string());
    }

    let rain = (s_ry * s_tt - s_ty * s_rt) / det;
    let temp = (s_ty * s_rr - s_ry * s_rt) / det;
    let intercept = mean_yield - rain * mean_rain - temp * mean_temp;

    let ss_res: f64 = rows
        .iter()
        .map(|r| {
            let fitted = intercept + rain * r.rainfall_mm + temp * r.avg_temp_c;
            (r.yield_ton_per_ha - fitted).powi(2)
        })
        .sum();

    Ok((rain, temp, 1.0 - ss_res / s_yy))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(crop: &str, rainfall: f64, temp: f64, yield_t: f64) -> HistoricalRecord {
        HistoricalRecord {
            year: 2000,
            state: "Punjab".into(),
            crop: crop.into(),
            area_ha: 10.0,
            production_ton: yield_t * 10.0,
            yield_ton_per_ha: yield_t,
            rainfall_mm: rainfall,
            avg_temp_c: temp,
            max_temp_c: temp + 6.0,
            min_temp_c: temp - 6.0,
            rainfall_deviation: 0.0,
            temp_deviation: 0.0,
            decade: 2000,
        }
    }

    fn linear_rows(crop: &str, base: f64, rain_coef: f64, temp_coef: f64) -> Vec<HistoricalRecord> {
        let mut rows = Vec::new();
        for i in 0..6 {
            for j in 0..5 {
                let rainfall = 500.0 + 80.0 * i as f64;
                let temp = 20.0 + 1.5 * j as f64 + 0.1 * i as f64;
                rows.push(row(crop, rainfall, temp, base + rain_coef * rainfall + temp_coef * temp));
            }
        }
        rows
    }

    #[test]
    fn test_recovers_known_coefficients() {
        let mut records = linear_rows("Wheat", 4.0, 0.002, -0.08);
        records.extend(linear_rows("Rice", 1.0, 0.003, 0.05));

        let report = climate_coefficients(&records);
        assert!(report.skipped.is_empty());
        assert_eq!(report.coefficients.len(), 2);

        let rice = &report.coefficients[0];
        assert_eq!(rice.crop, "Rice");
        assert!((rice.rainfall_coefficient - 0.003).abs() < 1e-9);
        assert!((rice.temperature_coefficient - 0.05).abs() < 1e-9);
        assert!((rice.r_squared - 1.0).abs() < 1e-9);

        let wheat = &report.coefficients[1];
        assert_eq!(wheat.crop, "Wheat");
        assert!((wheat.rainfall_coefficient - 0.002).abs() < 1e-9);
        assert!((wheat.temperature_coefficient + 0.08).abs() < 1e-9);
    }

    #[test]
    fn test_noise_lowers_r_squared() {
        let mut records = linear_rows("Maize", 2.0, 0.001, -0.05);
        for (idx, record) in records.iter_mut().enumerate() {
            record.yield_ton_per_ha += if idx % 2 == 0 { 0.3 } else { -0.3 };
        }

        let report = climate_coefficients(&records);
        let maize = &report.coefficients[0];
        assert!(maize.r_squared > 0.0 && maize.r_squared < 1.0);
    }

    #[test]
    fn test_degenerate_crops_are_skipped() {
        // Temperature never varies for Cotton; Jute has too few rows
        let mut records: Vec<HistoricalRecord> = (0..5)
            .map(|i| row("Cotton", 600.0 + 50.0 * i as f64, 27.0, 1.0 + 0.1 * i as f64))
            .collect();
        records.push(row("Jute", 900.0, 28.0, 2.1));
        records.push(row("Jute", 950.0, 28.5, 2.2));
        records.extend(linear_rows("Rice", 1.0, 0.003, 0.05));

        let report = climate_coefficients(&records);
        assert_eq!(report.coefficients.len(), 1);
        assert_eq!(report.coefficients[0].crop, "Rice");

        let skipped: Vec<&str> = report.skipped.iter().map(|s| s.crop.as_str()).collect();
        assert_eq!(skipped, vec!["Cotton", "Jute"]);
    }

    #[test]
    fn test_csv_columns() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join(IMPACT_FILE);
        let report = climate_coefficients(&linear_rows("Rice", 1.0, 0.003, 0.05));

        agroclim_core::tables::write_csv(&path, &report.coefficients).unwrap();
        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(raw.starts_with("Crop,Rainfall_Coefficient,Temperature_Coefficient,R_squared"));
    }
}
