use std::{collections::BTreeMap, fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::error::UnknownVariant;

/// Clock name used for the synthetic entry built from a single-value result.
pub const SINGLE_VALUE_CLOCK: &str = "biological_age";

/// Clocks the multi-clock backend is known to report, in display order.
pub const KNOWN_CLOCKS: [&str; 3] = ["horvath", "hannum", "phenoage"];

const CSV_SUFFIX: &str = ".csv";

/// Opaque identifier assigned by the backend to an uploaded sample.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobId(pub String);

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A file offered by the file-selection source.
#[derive(Clone, PartialEq, Eq)]
pub struct CandidateFile {
    pub name: String,
    pub content: Vec<u8>,
}

impl CandidateFile {
    pub fn new(name: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
        }
    }

    /// Case-sensitive.
    pub fn has_csv_extension(&self) -> bool {
        self.name.ends_with(CSV_SUFFIX)
    }
}

// Content is omitted.
impl fmt::Debug for CandidateFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CandidateFile")
            .field("name", &self.name)
            .field("size_bytes", &self.content.len())
            .finish()
    }
}

/// Which backend contract this deployment talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendProfile {
    /// Upload, then poll a per-job result endpoint.
    #[default]
    Job,
    /// One request that answers with the biological age directly.
    Sync,
}

impl FromStr for BackendProfile {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "job" => Ok(Self::Job),
            "sync" => Ok(Self::Sync),
            other => Err(UnknownVariant::new("backend profile", other)),
        }
    }
}

/// Body format of a ready job result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultShape {
    #[default]
    MultiClock,
    SingleValue,
}

impl FromStr for ResultShape {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "multi_clock" => Ok(Self::MultiClock),
            "single_value" => Ok(Self::SingleValue),
            other => Err(UnknownVariant::new("result shape", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClockPrediction {
    pub predicted_age: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub std_predicted_age: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub num_samples: Option<u64>,
}

/// Outcome of one clock. A failure here is the model's own and never fails the run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ClockOutcome {
    Success(ClockPrediction),
    Failure { error: String },
}

impl ClockOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    pub fn predicted_age(&self) -> Option<f64> {
        match self {
            Self::Success(prediction) => Some(prediction.predicted_age),
            Self::Failure { .. } => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessingConfig {
    pub imputation_strategy: String,
    pub normalize_data: bool,
}

/// Display-ready result of one analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub clocks: BTreeMap<String, ClockOutcome>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_sites_used: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<ProcessingConfig>,
}

impl AnalysisResult {
    pub fn clock(&self, name: &str) -> Option<&ClockOutcome> {
        self.clocks.get(name)
    }

    pub fn success_count(&self) -> usize {
        self.clocks.values().filter(|o| o.is_success()).count()
    }

    pub fn failure_count(&self) -> usize {
        self.clocks.len() - self.success_count()
    }

    /// The value to show when the result came from a single-value contract.
    ///
    /// Multi-clock results always carry site counts and processing config, so a lone
    /// `biological_age` clock reported by a multi-clock service still renders as a card.
    pub fn single_value(&self) -> Option<f64> {
        if self.clocks.len() != 1 || self.total_sites_used.is_some() || self.config.is_some() {
            return None;
        }
        self.clock(SINGLE_VALUE_CLOCK)
            .and_then(ClockOutcome::predicted_age)
    }

    /// Clocks in display order: known clocks first, then the rest by name.
    pub fn ordered_clocks(&self) -> Vec<(&str, &ClockOutcome)> {
        let mut ordered: Vec<(&str, &ClockOutcome)> = KNOWN_CLOCKS
            .iter()
            .filter_map(|name| self.clocks.get_key_value(*name))
            .map(|(name, outcome)| (name.as_str(), outcome))
            .collect();
        ordered.extend(
            self.clocks
                .iter()
                .filter(|(name, _)| !KNOWN_CLOCKS.contains(&name.as_str()))
                .map(|(name, outcome)| (name.as_str(), outcome)),
        );
        ordered
    }
}
