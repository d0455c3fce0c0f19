use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::domain::{ProcessingConfig, ResultShape};

/// Reply to `POST /api/upload`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadResponse {
    pub id: String,
}

/// Reply to `POST /getbioage`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BioAgeResponse {
    #[serde(rename = "bioAge")]
    pub bio_age: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SingleValueResult {
    pub predicted_age: f64,
}

/// One clock inside a multi-clock result. An `error` field wins over any prediction fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ClockEntry {
    Failed {
        error: String,
    },
    Predicted {
        predicted_age: f64,
        std_predicted_age: f64,
        num_samples: u64,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MultiClockResult {
    pub clocks: BTreeMap<String, ClockEntry>,
    pub total_sites_used: u64,
    pub config: ProcessingConfig,
}

/// A well-formed terminal payload, typed by the shape the deployment expects.
#[derive(Debug, Clone, PartialEq)]
pub enum RawResult {
    SingleValue(SingleValueResult),
    MultiClock(MultiClockResult),
}

impl RawResult {
    pub fn parse(shape: ResultShape, body: &[u8]) -> Result<Self, serde_json::Error> {
        match shape {
            ResultShape::SingleValue => serde_json::from_slice(body).map(Self::SingleValue),
            ResultShape::MultiClock => serde_json::from_slice(body).map(Self::MultiClock),
        }
    }
}

impl From<BioAgeResponse> for RawResult {
    fn from(value: BioAgeResponse) -> Self {
        Self::SingleValue(SingleValueResult {
            predicted_age: value.bio_age,
        })
    }
}
