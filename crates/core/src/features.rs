//! Feature construction for historical and projected records
//!
//! Every vector is laid out in [`FEATURE_COLUMNS`] order. The year is
//! normalized against bounds captured once from the training set; years
//! outside those bounds extrapolate beyond [0, 1] instead of being clamped.

use serde::{Deserialize, Serialize};

use crate::encoder::EncoderState;
use crate::errors::{AgroError, Result};
use crate::records::HistoricalRecord;

/// Feature vector in [`FEATURE_COLUMNS`] order
pub type FeatureVector = Vec<f64>;

/// Column order of every feature vector, fixed at training time
pub const FEATURE_COLUMNS: [&str; 7] = [
    "Year",
    "Year_Normalized",
    "State_Encoded",
    "Crop_Encoded",
    "Rainfall_mm",
    "Avg_Temp_C",
    "Rainfall_Temp_Interaction",
];

pub const FEATURE_COUNT: usize = FEATURE_COLUMNS.len();

/// Year range captured from the training set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawBounds")]
pub struct NormalizationBounds {
    year_min: i32,
    year_max: i32,
}

#[derive(Deserialize)]
struct RawBounds {
    year_min: i32,
    year_max: i32,
}

impl TryFrom<RawBounds> for NormalizationBounds {
    type Error = AgroError;

    fn try_from(raw: RawBounds) -> Result<Self> {
        Self::new(raw.year_min, raw.year_max)
    }
}

impl NormalizationBounds {
    pub fn new(year_min: i32, year_max: i32) -> Result<Self> {
        if year_min == year_max {
            return Err(AgroError::DegenerateRange {
                field: "Year",
                value: year_min as i64,
            });
        }
        if year_min > year_max {
            return Err(AgroError::InvalidParameters(format!(
                "year_min {} is after year_max {}",
                year_min, year_max
            )));
        }
        Ok(Self { year_min, year_max })
    }

    /// Capture `(min, max)` from the training years
    pub fn fit<I>(years: I) -> Result<Self>
    where
        I: IntoIterator<Item = i32>,
    {
        let mut iter = years.into_iter();
        let first = iter
            .next()
            .ok_or_else(|| AgroError::insufficient("fitting year bounds", 1, 0))?;
        let (min, max) = iter.fold((first, first), |(lo, hi), y| (lo.min(y), hi.max(y)));
        Self::new(min, max)
    }

    pub fn year_min(&self) -> i32 {
        self.year_min
    }

    pub fn year_max(&self) -> i32 {
        self.year_max
    }

    /// `(year - min) / (max - min)`, unclamped
    pub fn normalize(&self, year: i32) -> f64 {
        let min = f64::from(self.year_min);
        (f64::from(year) - min) / (f64::from(self.year_max) - min)
    }
}

/// Raw fields a feature vector is derived from
#[derive(Debug, Clone, Copy)]
pub struct FeatureInput<'a> {
    pub year: i32,
    pub state: &'a str,
    pub crop: &'a str,
    pub rainfall_mm: f64,
    pub avg_temp_c: f64,
}

impl<'a> From<&'a HistoricalRecord> for FeatureInput<'a> {
    fn from(record: &'a HistoricalRecord) -> Self {
        Self {
            year: record.year,
            state: &record.state,
            crop: &record.crop,
            rainfall_mm: record.rainfall_mm,
            avg_temp_c: record.avg_temp_c,
        }
    }
}

impl FeatureInput<'_> {
    fn describe(&self) -> String {
        format!(
            "record Year={} State={} Crop={}",
            self.year, self.state, self.crop
        )
    }
}

/// Build the feature vector for one record
pub fn build(
    input: FeatureInput<'_>,
    encoders: &EncoderState,
    bounds: &NormalizationBounds,
) -> Result<FeatureVector> {
    let with_record = |err: AgroError| match err {
        AgroError::UnknownCategory { field, label, .. } => AgroError::UnknownCategory {
            field,
            label,
            context: input.describe(),
        },
        other => other,
    };

    let state_code = encoders.state.encode(input.state).map_err(with_record)?;
    let crop_code = encoders.crop.encode(input.crop).map_err(with_record)?;

    Ok(vec![
        f64::from(input.year),
        bounds.normalize(input.year),
        f64::from(state_code),
        f64::from(crop_code),
        input.rainfall_mm,
        input.avg_temp_c,
        input.rainfall_mm * input.avg_temp_c,
    ])
}

/// Build features and yield targets for a slice of historical records
pub fn build_matrix(
    records: &[HistoricalRecord],
    encoders: &EncoderState,
    bounds: &NormalizationBounds,
) -> Result<(Vec<FeatureVector>, Vec<f64>)> {
    let mut features = Vec::with_capacity(records.len());
    let mut targets = Vec::with_capacity(records.len());

    for record in records {
        features.push(build(record.into(), encoders, bounds)?);
        targets.push(record.yield_ton_per_ha);
    }

    Ok((features, targets))
}
