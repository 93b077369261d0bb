//! Label encoding for categorical columns
//!
//! Codes are dense `0..n` and assigned in sorted order of the distinct
//! labels, so fitting the same label set always yields the same mapping.
//! An encoder is never refitted; unseen labels are rejected.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::errors::{AgroError, Result};
use crate::records::HistoricalRecord;

/// Categorical column an encoder belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CategoryField {
    State,
    Crop,
}

impl CategoryField {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::State => "State",
            Self::Crop => "Crop",
        }
    }
}

/// Bidirectional label <-> code mapping
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawEncoder")]
pub struct CategoricalEncoder {
    field: CategoryField,
    labels: Vec<String>,
}

#[derive(Deserialize)]
struct RawEncoder {
    field: CategoryField,
    labels: Vec<String>,
}

impl TryFrom<RawEncoder> for CategoricalEncoder {
    type Error = String;

    fn try_from(raw: RawEncoder) -> std::result::Result<Self, Self::Error> {
        if raw.labels.windows(2).any(|pair| pair[0] >= pair[1]) {
            return Err(format!(
                "{} encoder labels must be strictly sorted and unique",
                raw.field.as_str()
            ));
        }
        Ok(Self {
            field: raw.field,
            labels: raw.labels,
        })
    }
}

impl CategoricalEncoder {
    /// Fit an encoder on every distinct label in `labels`
    pub fn fit<I, S>(field: CategoryField, labels: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let distinct: BTreeSet<String> = labels
            .into_iter()
            .map(|label| label.as_ref().to_string())
            .collect();

        if distinct.is_empty() {
            return Err(AgroError::insufficient(
                format!("fitting {} encoder", field.as_str()),
                1,
                0,
            ));
        }

        Ok(Self {
            field,
            labels: distinct.into_iter().collect(),
        })
    }

    pub fn field(&self) -> CategoryField {
        self.field
    }

    /// Fitted labels in code order
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Map a label to its code, failing on labels absent at fit time
    pub fn encode(&self, label: &str) -> Result<u32> {
        self.labels
            .binary_search_by(|known| known.as_str().cmp(label))
            .map(|idx| idx as u32)
            .map_err(|_| AgroError::UnknownCategory {
                field: self.field.as_str(),
                label: label.to_string(),
                context: format!("{} known labels", self.labels.len()),
            })
    }

    /// Inverse of [`encode`](Self::encode)
    pub fn decode(&self, code: u32) -> Option<&str> {
        self.labels.get(code as usize).map(String::as_str)
    }
}

/// State and crop encoders fitted together on the training data
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncoderState {
    pub state: CategoricalEncoder,
    pub crop: CategoricalEncoder,
}

impl EncoderState {
    pub fn fit(records: &[HistoricalRecord]) -> Result<Self> {
        Ok(Self {
            state: CategoricalEncoder::fit(
                CategoryField::State,
                records.iter().map(|r| r.state.as_str()),
            )?,
            crop: CategoricalEncoder::fit(
                CategoryField::Crop,
                records.iter().map(|r| r.crop.as_str()),
            )?,
        })
    }
}
