use std::sync::Arc;

use serde_json::Error as JsonError;
use shared::{
    domain::{CandidateFile, JobId},
    protocol::{BioAgeResponse, RawResult, UploadResponse},
};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::{
    error::SubmitError,
    transport::{AnalysisTransport, Endpoint, Reply},
};

/// Sends a validated file to the service. Each call is exactly one request.
pub struct JobSubmitter {
    transport: Arc<dyn AnalysisTransport>,
}

impl JobSubmitter {
    pub fn new(transport: Arc<dyn AnalysisTransport>) -> Self {
        Self { transport }
    }

    /// Upload `file` and return the job id the service assigned to it.
    pub async fn submit(
        &self,
        file: CandidateFile,
        cancel: &CancellationToken,
    ) -> Result<JobId, SubmitError> {
        let file_name = file.name.clone();
        let reply = self.send(Endpoint::Upload, file, cancel).await?;
        let response: UploadResponse = serde_json::from_slice(&reply.body).map_err(malformed)?;
        if response.id.is_empty() {
            return Err(SubmitError::Malformed {
                message: "empty job id".into(),
            });
        }
        let job = JobId(response.id);
        info!(file_name = %file_name, job_id = %job, "sample uploaded");
        Ok(job)
    }

    /// Single-request estimate for deployments that answer synchronously.
    pub async fn estimate(
        &self,
        file: CandidateFile,
        cancel: &CancellationToken,
    ) -> Result<RawResult, SubmitError> {
        let file_name = file.name.clone();
        let reply = self.send(Endpoint::BioAge, file, cancel).await?;
        let response: BioAgeResponse = serde_json::from_slice(&reply.body).map_err(malformed)?;
        info!(file_name = %file_name, bio_age = response.bio_age, "biological age estimated");
        Ok(response.into())
    }

    async fn send(
        &self,
        endpoint: Endpoint,
        file: CandidateFile,
        cancel: &CancellationToken,
    ) -> Result<Reply, SubmitError> {
        let reply = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(SubmitError::Cancelled),
            reply = self.transport.post_file(endpoint, file) => reply,
        };
        let reply = reply.map_err(|err| {
            warn!(?endpoint, error = %err, "upload request failed");
            SubmitError::Transport {
                message: err.message,
            }
        })?;
        if !reply.is_success() {
            warn!(?endpoint, status = reply.status, "upload rejected");
            return Err(SubmitError::Status {
                status: reply.status,
            });
        }
        Ok(reply)
    }
}

fn malformed(err: JsonError) -> SubmitError {
    SubmitError::Malformed {
        message: err.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use shared::protocol::SingleValueResult;

    use super::*;
    use crate::test_support::{csv, json_reply, network_down, ScriptedTransport, StalledTransport};

    #[tokio::test]
    async fn returns_job_id_from_upload_response() {
        let transport =
            Arc::new(ScriptedTransport::new().with_post(json_reply(201, json!({ "id": "abc" }))));
        let submitter = JobSubmitter::new(transport.clone());

        let job = submitter
            .submit(csv("sample.csv"), &CancellationToken::new())
            .await
            .expect("submit");

        assert_eq!(job, JobId("abc".into()));
        assert_eq!(
            transport.posted(),
            vec![(Endpoint::Upload, "sample.csv".to_string())]
        );
    }

    #[tokio::test]
    async fn non_success_status_is_reported_without_retry() {
        let transport = Arc::new(
            ScriptedTransport::new()
                .with_post(json_reply(500, json!({ "detail": "boom" })))
                .with_post(json_reply(200, json!({ "id": "abc" }))),
        );
        let submitter = JobSubmitter::new(transport.clone());

        let err = submitter
            .submit(csv("sample.csv"), &CancellationToken::new())
            .await
            .expect_err("status");

        assert_eq!(err, SubmitError::Status { status: 500 });
        assert_eq!(transport.post_calls(), 1);
    }

    #[tokio::test]
    async fn missing_or_mistyped_id_is_malformed() {
        for body in [json!({ "sample": "abc" }), json!({ "id": 7 }), json!({ "id": "" })] {
            let transport = Arc::new(ScriptedTransport::new().with_post(json_reply(200, body)));
            let err = JobSubmitter::new(transport)
                .submit(csv("sample.csv"), &CancellationToken::new())
                .await
                .expect_err("malformed");
            assert!(matches!(err, SubmitError::Malformed { .. }), "{err:?}");
        }
    }

    #[tokio::test]
    async fn network_failure_is_a_transport_error() {
        let transport = Arc::new(ScriptedTransport::new().with_post(network_down()));
        let err = JobSubmitter::new(transport)
            .submit(csv("sample.csv"), &CancellationToken::new())
            .await
            .expect_err("transport");
        assert!(matches!(err, SubmitError::Transport { .. }));
    }

    #[tokio::test]
    async fn cancelled_token_sends_nothing() {
        let transport = Arc::new(ScriptedTransport::new());
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = JobSubmitter::new(transport.clone())
            .submit(csv("sample.csv"), &cancel)
            .await
            .expect_err("cancelled");

        assert_eq!(err, SubmitError::Cancelled);
        assert_eq!(transport.post_calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn cancelling_mid_upload_drops_the_request() {
        let transport = Arc::new(StalledTransport::default());
        let cancel = CancellationToken::new();

        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_millis(100)).await;
            trigger.cancel();
        });

        let err = JobSubmitter::new(transport.clone())
            .submit(csv("sample.csv"), &cancel)
            .await
            .expect_err("cancelled");

        assert_eq!(err, SubmitError::Cancelled);
        assert_eq!(transport.post_calls(), 1);
    }

    #[tokio::test]
    async fn estimate_reads_bio_age() {
        let transport =
            Arc::new(ScriptedTransport::new().with_post(json_reply(200, json!({ "bioAge": 37.5 }))));
        let raw = JobSubmitter::new(transport.clone())
            .estimate(csv("sample.csv"), &CancellationToken::new())
            .await
            .expect("estimate");

        assert_eq!(
            raw,
            RawResult::SingleValue(SingleValueResult { predicted_age: 37.5 })
        );
        assert_eq!(transport.posted()[0].0, Endpoint::BioAge);
    }
}
