//! Terminal output for finished analyses and notifications.

use client_core::{NotificationKind, NotificationSink};
use shared::domain::{AnalysisResult, ClockOutcome};

/// One line per clock, or a single line when the service reported one value.
pub fn cards(result: &AnalysisResult) -> Vec<String> {
    if let Some(age) = result.single_value() {
        return vec![format!("Biological age: {age:.1} years")];
    }

    let mut lines: Vec<String> = result
        .ordered_clocks()
        .into_iter()
        .map(|(name, outcome)| card(name, outcome))
        .collect();

    if let Some(sites) = result.total_sites_used {
        lines.push(format!("Sites used: {sites}"));
    }
    if let Some(config) = &result.config {
        lines.push(format!(
            "Imputation: {}, normalized: {}",
            config.imputation_strategy,
            if config.normalize_data { "yes" } else { "no" }
        ));
    }
    lines
}

fn card(name: &str, outcome: &ClockOutcome) -> String {
    match outcome {
        ClockOutcome::Success(prediction) => {
            let mut line = format!("{name}: {:.1} years", prediction.predicted_age);
            if let Some(std) = prediction.std_predicted_age {
                line.push_str(&format!(" (±{std:.1})"));
            }
            if let Some(samples) = prediction.num_samples {
                line.push_str(&format!(", {samples} samples"));
            }
            line
        }
        ClockOutcome::Failure { error } => format!("{name}: failed ({error})"),
    }
}

pub fn to_json(result: &AnalysisResult) -> serde_json::Result<String> {
    serde_json::to_string_pretty(result)
}

/// Prints notifications to stderr so stdout carries only the result.
pub struct ConsoleSink;

impl NotificationSink for ConsoleSink {
    fn notify(&self, kind: NotificationKind, title: &str, detail: &str) {
        match kind {
            NotificationKind::Success => eprintln!("{title}: {detail}"),
            NotificationKind::Error => eprintln!("error: {title}: {detail}"),
        }
    }
}
