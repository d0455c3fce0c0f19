//! Polls a job's result endpoint until the service answers with something other than
//! "not ready".

use std::{sync::Arc, time::Duration};

use shared::{
    domain::{JobId, ResultShape},
    protocol::RawResult,
};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::{error::PollError, transport::AnalysisTransport};

/// Status the service uses to say the job is still running.
pub const NOT_READY_STATUS: u16 = 400;
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(1000);

/// Fixed-interval retry policy. Without bounds the poller waits forever.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    pub max_attempts: Option<u32>,
    pub max_wait: Option<Duration>,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self::unbounded(DEFAULT_POLL_INTERVAL)
    }
}

impl PollPolicy {
    pub fn unbounded(interval: Duration) -> Self {
        Self {
            interval,
            max_attempts: None,
            max_wait: None,
        }
    }

    pub fn is_bounded(&self) -> bool {
        self.max_attempts.is_some() || self.max_wait.is_some()
    }

    fn is_exhausted(&self, attempts: u32, elapsed: Duration) -> bool {
        self.max_attempts.is_some_and(|max| attempts >= max)
            || self.max_wait.is_some_and(|max| elapsed >= max)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PollStatus {
    Pending,
    Ready(RawResult),
}

pub struct ResultPoller {
    transport: Arc<dyn AnalysisTransport>,
    shape: ResultShape,
    policy: PollPolicy,
}

impl ResultPoller {
    pub fn new(transport: Arc<dyn AnalysisTransport>, shape: ResultShape, policy: PollPolicy) -> Self {
        Self {
            transport,
            shape,
            policy,
        }
    }

    /// One status request.
    pub async fn check(&self, job: &JobId) -> Result<PollStatus, PollError> {
        let reply = self
            .transport
            .get_result(job)
            .await
            .map_err(|err| PollError::Transport {
                message: err.message,
            })?;

        if reply.status == NOT_READY_STATUS {
            return Ok(PollStatus::Pending);
        }
        if !reply.is_success() {
            return Err(PollError::Status {
                status: reply.status,
            });
        }

        RawResult::parse(self.shape, &reply.body)
            .map(PollStatus::Ready)
            .map_err(|err| PollError::Malformed {
                message: err.to_string(),
            })
    }

    /// Check, sleep `interval`, repeat until the job is ready, fails, or `cancel` fires.
    ///
    /// `max_wait` is a deadline: it also cuts short a request that never answers.
    pub async fn poll(
        &self,
        job: &JobId,
        cancel: &CancellationToken,
    ) -> Result<RawResult, PollError> {
        let started = Instant::now();
        let deadline = self.policy.max_wait.map(|max| started + max);
        let mut attempts: u32 = 0;

        loop {
            attempts = attempts.saturating_add(1);
            let status = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(PollError::Cancelled),
                status = self.check(job) => status,
                _ = wait_until(deadline) => return Err(exhausted(job, attempts, started)),
            };

            match status {
                Ok(PollStatus::Ready(raw)) => {
                    info!(
                        job_id = %job,
                        attempts,
                        elapsed_ms = started.elapsed().as_millis() as u64,
                        "job result ready"
                    );
                    return Ok(raw);
                }
                Ok(PollStatus::Pending) => {}
                Err(err) => {
                    warn!(job_id = %job, attempts, error = %err, "polling stopped");
                    return Err(err);
                }
            }

            if self.policy.is_exhausted(attempts, started.elapsed()) {
                return Err(exhausted(job, attempts, started));
            }

            debug!(job_id = %job, attempt = attempts, "job not ready; retrying");
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(PollError::Cancelled),
                _ = tokio::time::sleep(self.policy.interval) => {}
                _ = wait_until(deadline) => return Err(exhausted(job, attempts, started)),
            }
        }
    }
}

async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

fn exhausted(job: &JobId, attempts: u32, started: Instant) -> PollError {
    let elapsed = started.elapsed();
    warn!(job_id = %job, attempts, ?elapsed, "job still not ready; giving up");
    PollError::Exhausted { attempts, elapsed }
}

#[cfg(test)]
#[path = "tests/poller_tests.rs"]
mod tests;
