//! Turns a terminal payload into the result shown to the user.

use std::collections::BTreeMap;

use shared::{
    domain::{AnalysisResult, ClockOutcome, ClockPrediction, SINGLE_VALUE_CLOCK},
    protocol::{ClockEntry, RawResult},
};

/// Pure and total. Every clock entry becomes its own outcome, so one model failing
/// leaves the others intact.
pub fn aggregate(raw: RawResult) -> AnalysisResult {
    match raw {
        RawResult::SingleValue(single) => AnalysisResult {
            clocks: BTreeMap::from([(
                SINGLE_VALUE_CLOCK.to_string(),
                ClockOutcome::Success(ClockPrediction {
                    predicted_age: single.predicted_age,
                    std_predicted_age: None,
                    num_samples: None,
                }),
            )]),
            total_sites_used: None,
            config: None,
        },
        RawResult::MultiClock(multi) => AnalysisResult {
            clocks: multi
                .clocks
                .into_iter()
                .map(|(name, entry)| (name, clock_outcome(entry)))
                .collect(),
            total_sites_used: Some(multi.total_sites_used),
            config: Some(multi.config),
        },
    }
}

fn clock_outcome(entry: ClockEntry) -> ClockOutcome {
    match entry {
        ClockEntry::Failed { error } => ClockOutcome::Failure { error },
        ClockEntry::Predicted {
            predicted_age,
            std_predicted_age,
            num_samples,
        } => ClockOutcome::Success(ClockPrediction {
            predicted_age,
            std_predicted_age: Some(std_predicted_age),
            num_samples: Some(num_samples),
        }),
    }
}
