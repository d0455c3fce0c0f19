use std::{
    fs,
    num::ParseIntError,
    path::Path,
    str::FromStr,
    time::Duration,
};

use anyhow::Context;
use client_core::{
    poller::DEFAULT_POLL_INTERVAL, transport::DEFAULT_BASE_URL, PollPolicy, TransportOptions,
    WorkflowConfig,
};
use shared::domain::{BackendProfile, ResultShape};
use tracing::{debug, warn};

pub const DEFAULT_CONFIG_FILE: &str = "bioage.toml";

/// Environment variables and the setting each one feeds. Later entries win.
const ENV_KEYS: [(&str, &str); 8] = [
    ("BIOAGE_BASE_URL", "base_url"),
    ("APP__BASE_URL", "base_url"),
    ("BIOAGE_PROFILE", "profile"),
    ("BIOAGE_RESULT_SHAPE", "result_shape"),
    ("BIOAGE_POLL_INTERVAL_MS", "poll_interval_ms"),
    ("BIOAGE_MAX_POLL_ATTEMPTS", "max_poll_attempts"),
    ("BIOAGE_MAX_POLL_WAIT_SECS", "max_poll_wait_secs"),
    ("BIOAGE_REQUEST_TIMEOUT_SECS", "request_timeout_secs"),
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub base_url: String,
    pub profile: BackendProfile,
    pub result_shape: ResultShape,
    pub poll_interval_ms: u64,
    pub max_poll_attempts: Option<u32>,
    pub max_poll_wait_secs: Option<u64>,
    pub request_timeout_secs: Option<u64>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.into(),
            profile: BackendProfile::default(),
            result_shape: ResultShape::default(),
            poll_interval_ms: DEFAULT_POLL_INTERVAL.as_millis() as u64,
            max_poll_attempts: None,
            max_poll_wait_secs: None,
            request_timeout_secs: None,
        }
    }
}

/// Command-line overrides. Anything left unset keeps the file/env value.
#[derive(Debug, Default, Clone, clap::Args)]
pub struct Overrides {
    /// Root URL of the analysis service.
    #[arg(long)]
    pub base_url: Option<String>,
    /// Backend contract: `job` or `sync`.
    #[arg(long)]
    pub profile: Option<BackendProfile>,
    /// Result body format: `multi_clock` or `single_value`.
    #[arg(long)]
    pub result_shape: Option<ResultShape>,
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    pub poll_interval_ms: Option<u64>,
    /// Give up after this many result requests.
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
    pub max_poll_attempts: Option<u32>,
    /// Give up once polling has run this long.
    #[arg(long)]
    pub max_poll_wait_secs: Option<u64>,
    #[arg(long)]
    pub request_timeout_secs: Option<u64>,
}

impl Settings {
    pub fn workflow_config(&self) -> WorkflowConfig {
        WorkflowConfig {
            profile: self.profile,
            result_shape: self.result_shape,
            poll_policy: PollPolicy {
                interval: Duration::from_millis(self.poll_interval_ms),
                max_attempts: self.max_poll_attempts,
                max_wait: self.max_poll_wait_secs.map(Duration::from_secs),
            },
        }
    }

    pub fn transport_options(&self) -> TransportOptions {
        TransportOptions {
            base_url: self.base_url.clone(),
            request_timeout: self.request_timeout_secs.map(Duration::from_secs),
        }
    }

    fn apply_file(&mut self, raw: &str, origin: &Path) {
        let source = origin.display().to_string();
        let table = match raw.parse::<toml::Table>() {
            Ok(table) => table,
            Err(err) => {
                warn!(source = %source, error = %err, "ignoring unparseable config file");
                return;
            }
        };
        for (key, value) in table {
            let text = match value {
                toml::Value::String(text) => text,
                other => other.to_string(),
            };
            self.set(&key, &text, &source);
        }
    }

    fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        for (var, key) in ENV_KEYS {
            if let Some(value) = lookup(var) {
                self.set(key, &value, var);
            }
        }
    }

    fn apply_overrides(&mut self, overrides: &Overrides) {
        if let Some(v) = &overrides.base_url {
            self.base_url = v.clone();
        }
        if let Some(v) = overrides.profile {
            self.profile = v;
        }
        if let Some(v) = overrides.result_shape {
            self.result_shape = v;
        }
        if let Some(v) = overrides.poll_interval_ms {
            self.poll_interval_ms = v;
        }
        if let Some(v) = overrides.max_poll_attempts {
            self.max_poll_attempts = Some(v);
        }
        if let Some(v) = overrides.max_poll_wait_secs {
            self.max_poll_wait_secs = Some(v);
        }
        if let Some(v) = overrides.request_timeout_secs {
            self.request_timeout_secs = Some(v);
        }
    }

    fn set(&mut self, key: &str, value: &str, source: &str) {
        let value = value.trim();
        let applied = match key {
            "base_url" => {
                self.base_url = value.to_string();
                Ok(())
            }
            "profile" => value
                .parse()
                .map(|v| self.profile = v)
                .map_err(|err| err.to_string()),
            "result_shape" => value
                .parse()
                .map(|v| self.result_shape = v)
                .map_err(|err| err.to_string()),
            "poll_interval_ms" => positive(value).map(|v| self.poll_interval_ms = v),
            "max_poll_attempts" => positive(value).map(|v| self.max_poll_attempts = Some(v)),
            "max_poll_wait_secs" => number(value).map(|v| self.max_poll_wait_secs = Some(v)),
            "request_timeout_secs" => number(value).map(|v| self.request_timeout_secs = Some(v)),
            _ => {
                warn!(source, key, "ignoring unknown configuration key");
                return;
            }
        };
        match applied {
            Ok(()) => debug!(source, key, "configuration value applied"),
            Err(reason) => warn!(source, key, value, %reason, "ignoring invalid configuration value"),
        }
    }
}

fn number<T: FromStr<Err = ParseIntError>>(value: &str) -> Result<T, String> {
    value.parse().map_err(|err: ParseIntError| err.to_string())
}

fn positive<T>(value: &str) -> Result<T, String>
where
    T: FromStr<Err = ParseIntError> + Default + PartialEq,
{
    let parsed: T = number(value)?;
    if parsed == T::default() {
        return Err("must be greater than zero".into());
    }
    Ok(parsed)
}

/// Defaults, then the config file, then the environment, then flags.
///
/// Without `explicit`, `bioage.toml` in the working directory is read if present.
pub fn load_settings(explicit: Option<&Path>, overrides: &Overrides) -> anyhow::Result<Settings> {
    let mut settings = Settings::default();

    match explicit {
        Some(path) => {
            let raw = fs::read_to_string(path)
                .with_context(|| format!("failed to read config file '{}'", path.display()))?;
            settings.apply_file(&raw, path);
        }
        None => {
            if let Ok(raw) = fs::read_to_string(DEFAULT_CONFIG_FILE) {
                settings.apply_file(&raw, Path::new(DEFAULT_CONFIG_FILE));
            }
        }
    }

    settings.apply_env(|var| std::env::var(var).ok());
    settings.apply_overrides(overrides);
    Ok(settings)
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
