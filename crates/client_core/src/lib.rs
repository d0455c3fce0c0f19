//! Client for the biological-age analysis service.
//!
//! A file drop goes through [`validator::validate`], is uploaded by
//! [`submitter::JobSubmitter`], polled by [`poller::ResultPoller`] and reduced by
//! [`aggregator::aggregate`]. [`WorkflowController`] sequences those steps, keeps the
//! single-job state machine and reports outcomes to a [`notify::NotificationSink`].

pub mod aggregator;
pub mod error;
pub mod notify;
pub mod poller;
pub mod submitter;
pub mod transport;
pub mod validator;
mod workflow;

pub use error::{Busy, PollError, SubmitError, TransportSetupError, ValidationError, WorkflowError};
pub use notify::{NotificationKind, NotificationSink};
pub use poller::{PollPolicy, PollStatus, ResultPoller};
pub use submitter::JobSubmitter;
pub use transport::{AnalysisTransport, HttpTransport, TransportOptions};
pub use workflow::{WorkflowConfig, WorkflowController, WorkflowState};

#[cfg(test)]
#[path = "tests/support.rs"]
mod test_support;

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
