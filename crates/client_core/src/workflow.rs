//! The user-visible state machine: validate, upload, poll, aggregate.

use std::sync::{Arc, Mutex, PoisonError};

use shared::domain::{AnalysisResult, BackendProfile, CandidateFile, JobId, ResultShape};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::{
    aggregator,
    error::{Busy, ValidationError, WorkflowError},
    notify::{Notice, NotificationSink},
    poller::{PollPolicy, ResultPoller},
    submitter::JobSubmitter,
    transport::AnalysisTransport,
    validator,
};

#[derive(Debug, Clone, PartialEq)]
pub enum WorkflowState {
    Idle,
    Uploading,
    Polling(JobId),
    Succeeded(AnalysisResult),
    Failed(WorkflowError),
}

impl WorkflowState {
    /// A job is in flight and new submissions are refused.
    pub fn is_busy(&self) -> bool {
        matches!(self, Self::Uploading | Self::Polling(_))
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Uploading => "uploading",
            Self::Polling(_) => "polling",
            Self::Succeeded(_) => "succeeded",
            Self::Failed(_) => "failed",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorkflowConfig {
    pub profile: BackendProfile,
    pub result_shape: ResultShape,
    pub poll_policy: PollPolicy,
}

enum Admission {
    Busy,
    Rejected(ValidationError),
    Accepted(CandidateFile, CancellationToken),
}

/// Runs one analysis at a time and reports outcomes to a [`NotificationSink`].
pub struct WorkflowController {
    profile: BackendProfile,
    submitter: JobSubmitter,
    poller: ResultPoller,
    sink: Arc<dyn NotificationSink>,
    state: watch::Sender<WorkflowState>,
    active: Mutex<Option<CancellationToken>>,
}

impl WorkflowController {
    pub fn new(
        transport: Arc<dyn AnalysisTransport>,
        config: WorkflowConfig,
        sink: Arc<dyn NotificationSink>,
    ) -> Self {
        let (state, _) = watch::channel(WorkflowState::Idle);
        Self {
            profile: config.profile,
            submitter: JobSubmitter::new(transport.clone()),
            poller: ResultPoller::new(transport, config.result_shape, config.poll_policy),
            sink,
            state,
            active: Mutex::new(None),
        }
    }

    pub fn state(&self) -> WorkflowState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<WorkflowState> {
        self.state.subscribe()
    }

    /// Abandon the job in flight. Returns `false` when there is none.
    pub fn cancel(&self) -> bool {
        let active = self.active.lock().unwrap_or_else(PoisonError::into_inner);
        match active.as_ref().filter(|token| !token.is_cancelled()) {
            Some(token) => {
                info!("cancelling active analysis");
                token.cancel();
                true
            }
            None => false,
        }
    }

    /// Run one file drop through the pipeline and return the state it ended in.
    ///
    /// A drop made while another job is uploading or polling is refused with [`Busy`]
    /// and leaves that job untouched. Dropping the returned future abandons the job and
    /// puts the controller back in `Idle`.
    pub async fn submit(&self, candidates: Vec<CandidateFile>) -> Result<WorkflowState, Busy> {
        let (file, cancel) = match self.admit(candidates) {
            Admission::Busy => {
                warn!("submission refused; an analysis is already running");
                Notice::BUSY.send_to(self.sink.as_ref());
                return Err(Busy);
            }
            Admission::Rejected(err) => {
                warn!(error = %err, "file rejected");
                Notice::for_failure(&WorkflowError::Validation(err)).send_to(self.sink.as_ref());
                return Ok(self.state());
            }
            Admission::Accepted(file, cancel) => (file, cancel),
        };

        let guard = ActiveJob::new(self);
        let outcome = self.run(file, &cancel).await;
        guard.finish();

        let next = match outcome {
            Ok(result) => WorkflowState::Succeeded(result),
            Err(err) if err.is_cancellation() => {
                info!("analysis cancelled");
                WorkflowState::Idle
            }
            Err(err) => {
                warn!(error = %err, "analysis failed");
                WorkflowState::Failed(err)
            }
        };
        self.state.send_replace(next.clone());

        match &next {
            WorkflowState::Succeeded(_) => Notice::SUCCESS.send_to(self.sink.as_ref()),
            WorkflowState::Failed(err) => Notice::for_failure(err).send_to(self.sink.as_ref()),
            _ => {}
        }
        Ok(next)
    }

    /// Busy check, validation, the cancellation token and the move to `Uploading` all
    /// happen under the channel's lock, so two racing drops cannot both get through and
    /// `cancel()` sees every admitted job.
    fn admit(&self, candidates: Vec<CandidateFile>) -> Admission {
        let mut admission = Admission::Busy;
        self.state.send_if_modified(|state| {
            if state.is_busy() {
                return false;
            }
            match validator::validate(candidates) {
                Ok(file) => {
                    let cancel = CancellationToken::new();
                    self.set_active(Some(cancel.clone()));
                    *state = WorkflowState::Uploading;
                    admission = Admission::Accepted(file, cancel);
                }
                Err(err) => {
                    *state = WorkflowState::Failed(err.clone().into());
                    admission = Admission::Rejected(err);
                }
            }
            true
        });
        admission
    }

    async fn run(
        &self,
        file: CandidateFile,
        cancel: &CancellationToken,
    ) -> Result<AnalysisResult, WorkflowError> {
        info!(
            file_name = %file.name,
            size_bytes = file.content.len(),
            profile = ?self.profile,
            "submitting sample"
        );
        let raw = match self.profile {
            BackendProfile::Sync => self.submitter.estimate(file, cancel).await?,
            BackendProfile::Job => {
                let job = self.submitter.submit(file, cancel).await?;
                self.state.send_replace(WorkflowState::Polling(job.clone()));
                self.poller.poll(&job, cancel).await?
            }
        };
        Ok(aggregator::aggregate(raw))
    }

    fn set_active(&self, token: Option<CancellationToken>) {
        *self.active.lock().unwrap_or_else(PoisonError::into_inner) = token;
    }
}

/// Clears the active token when a job ends. If the job's future is dropped before an
/// outcome is recorded, also returns the controller to `Idle`.
struct ActiveJob<'a> {
    controller: &'a WorkflowController,
    finished: bool,
}

impl<'a> ActiveJob<'a> {
    fn new(controller: &'a WorkflowController) -> Self {
        Self {
            controller,
            finished: false,
        }
    }

    /// Must run before the final state is published, so a drop admitted right after
    /// cannot have its token cleared by this job.
    fn finish(mut self) {
        self.finished = true;
        self.controller.set_active(None);
    }
}

impl Drop for ActiveJob<'_> {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        self.controller.set_active(None);
        self.controller.state.send_if_modified(|state| {
            if !state.is_busy() {
                return false;
            }
            *state = WorkflowState::Idle;
            true
        });
        info!("analysis abandoned");
    }
}
