use std::{
    fs,
    path::{Path, PathBuf},
    process::ExitCode,
    sync::Arc,
};

use anyhow::{Context, Result};
use clap::Parser;
use client_core::{validator, HttpTransport, WorkflowController, WorkflowState};
use shared::domain::CandidateFile;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod config;
mod render;

use config::{load_settings, Overrides};
use render::ConsoleSink;

/// Estimate biological age from a methylation CSV.
#[derive(Parser, Debug)]
#[command(name = "bioage", version)]
struct Args {
    /// CSV file to analyse. Passing more than one is rejected.
    #[arg(required = true)]
    files: Vec<PathBuf>,
    /// Settings file; defaults to ./bioage.toml when present.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Print the result as JSON on stdout.
    #[arg(long)]
    json: bool,
    #[command(flatten)]
    overrides: Overrides,
}

const EXIT_FAILED: u8 = 1;
const EXIT_CANCELLED: u8 = 130;

#[tokio::main]
async fn main() -> Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let settings = load_settings(args.config.as_deref(), &args.overrides)?;
    info!(
        base_url = %settings.base_url,
        profile = ?settings.profile,
        result_shape = ?settings.result_shape,
        "settings loaded"
    );

    let files = prepare_drop(&args.files)?;

    let transport = HttpTransport::new(&settings.transport_options())
        .context("failed to set up the HTTP client")?;
    let controller = Arc::new(WorkflowController::new(
        Arc::new(transport),
        settings.workflow_config(),
        Arc::new(ConsoleSink),
    ));

    let mut states = controller.subscribe();
    tokio::spawn(async move {
        while states.changed().await.is_ok() {
            let state = states.borrow_and_update().clone();
            match &state {
                WorkflowState::Polling(job) => {
                    info!(state = state.label(), job_id = %job, "waiting for result")
                }
                _ => info!(state = state.label(), "state changed"),
            }
        }
    });

    tokio::spawn({
        let controller = controller.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() && controller.cancel() {
                warn!("interrupted; abandoning analysis");
            }
        }
    });

    let state = controller
        .submit(files)
        .await
        .context("another analysis is already running")?;

    match state {
        WorkflowState::Succeeded(result) => {
            if args.json {
                println!("{}", render::to_json(&result)?);
            } else {
                for line in render::cards(&result) {
                    println!("{line}");
                }
            }
            Ok(ExitCode::SUCCESS)
        }
        WorkflowState::Failed(err) => {
            warn!(error = %err, "analysis did not complete");
            Ok(ExitCode::from(EXIT_FAILED))
        }
        WorkflowState::Idle => Ok(ExitCode::from(EXIT_CANCELLED)),
        other => anyhow::bail!("workflow stopped in unexpected state '{}'", other.label()),
    }
}

/// Turn the command-line paths into a file drop.
///
/// Contents are only read once the names pass validation; a rejected drop is handed to
/// the controller by name alone so it reports the rejection like any other.
fn prepare_drop(paths: &[PathBuf]) -> Result<Vec<CandidateFile>> {
    let named: Vec<CandidateFile> = paths
        .iter()
        .map(|path| CandidateFile::new(display_name(path), Vec::new()))
        .collect();
    if validator::validate(named.clone()).is_err() {
        return Ok(named);
    }
    paths.iter().map(|path| read_candidate(path)).collect()
}

fn read_candidate(path: &Path) -> Result<CandidateFile> {
    let content =
        fs::read(path).with_context(|| format!("failed to read '{}'", path.display()))?;
    Ok(CandidateFile::new(display_name(path), content))
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
#[path = "tests/main_tests.rs"]
mod tests;
