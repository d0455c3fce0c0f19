use std::time::Duration;

use thiserror::Error;

/// Rejection of a file drop before anything is sent.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("no file was selected")]
    NoFile,
    #[error("expected exactly one file, got {count}")]
    TooManyFiles { count: usize },
    #[error("'{name}' is not a .csv file")]
    InvalidExtension { name: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubmitError {
    #[error("upload rejected with HTTP {status}")]
    Status { status: u16 },
    #[error("upload request failed: {message}")]
    Transport { message: String },
    #[error("malformed upload response: {message}")]
    Malformed { message: String },
    #[error("upload cancelled")]
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PollError {
    #[error("result request rejected with HTTP {status}")]
    Status { status: u16 },
    #[error("result request failed: {message}")]
    Transport { message: String },
    #[error("malformed result payload: {message}")]
    Malformed { message: String },
    #[error("result not ready after {attempts} attempts ({elapsed:?})")]
    Exhausted { attempts: u32, elapsed: Duration },
    #[error("polling cancelled")]
    Cancelled,
}

/// Why a workflow ended in `Failed`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WorkflowError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Submit(#[from] SubmitError),
    #[error(transparent)]
    Poll(#[from] PollError),
}

impl WorkflowError {
    pub(crate) fn is_cancellation(&self) -> bool {
        matches!(
            self,
            Self::Submit(SubmitError::Cancelled) | Self::Poll(PollError::Cancelled)
        )
    }
}

/// A submission arrived while another job was still uploading or polling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("an analysis is already in progress")]
pub struct Busy;

#[derive(Debug, Error)]
pub enum TransportSetupError {
    #[error("invalid base url '{url}': {reason}")]
    InvalidBaseUrl { url: String, reason: String },
    #[error("failed to build http client: {0}")]
    Client(#[from] reqwest::Error),
}
