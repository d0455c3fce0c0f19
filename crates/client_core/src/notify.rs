//! User-facing notifications emitted by the workflow.

use crate::error::{ValidationError, WorkflowError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    Success,
    Error,
}

/// Where the workflow reports outcomes. Implemented by the presentation layer.
pub trait NotificationSink: Send + Sync {
    fn notify(&self, kind: NotificationKind, title: &str, detail: &str);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Notice {
    pub kind: NotificationKind,
    pub title: &'static str,
    pub detail: &'static str,
}

impl Notice {
    pub const SUCCESS: Notice = Notice {
        kind: NotificationKind::Success,
        title: "Success",
        detail: "Your biological age has been calculated.",
    };

    pub const BUSY: Notice = Notice {
        kind: NotificationKind::Error,
        title: "Analysis in progress",
        detail: "Please wait for the current file to finish processing.",
    };

    const PROCESSING_FAILED: Notice = Notice {
        kind: NotificationKind::Error,
        title: "Error",
        detail: "Failed to process the CSV file. Please try again.",
    };

    pub fn for_failure(err: &WorkflowError) -> Notice {
        match err {
            WorkflowError::Validation(ValidationError::NoFile) => Notice {
                kind: NotificationKind::Error,
                title: "No file selected",
                detail: "Please choose a CSV file to upload.",
            },
            WorkflowError::Validation(ValidationError::TooManyFiles { .. }) => Notice {
                kind: NotificationKind::Error,
                title: "Too many files",
                detail: "Please upload only one CSV file at a time.",
            },
            WorkflowError::Validation(ValidationError::InvalidExtension { .. }) => Notice {
                kind: NotificationKind::Error,
                title: "Invalid file type",
                detail: "Please upload a CSV file.",
            },
            WorkflowError::Submit(_) | WorkflowError::Poll(_) => Self::PROCESSING_FAILED,
        }
    }

    pub fn send_to(&self, sink: &dyn NotificationSink) {
        sink.notify(self.kind, self.title, self.detail);
    }
}
