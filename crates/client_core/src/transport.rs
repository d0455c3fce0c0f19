//! HTTP access to the analysis service.
//!
//! The transport only moves bytes: it reports the status code and body of each reply and
//! leaves their interpretation to the submitter and the poller.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{
    multipart::{Form, Part},
    Client, RequestBuilder,
};
use shared::domain::{CandidateFile, JobId};
use thiserror::Error;
use tracing::debug;
use url::Url;

use crate::error::TransportSetupError;

pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";
const UPLOAD_FIELD: &str = "file";
const CSV_MIME: &str = "text/csv";

/// Where a file is posted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    /// `POST /api/upload`, answered with a job id.
    Upload,
    /// `POST /getbioage`, answered with the age itself.
    BioAge,
}

impl Endpoint {
    fn segments(self) -> &'static [&'static str] {
        match self {
            Endpoint::Upload => &["api", "upload"],
            Endpoint::BioAge => &["getbioage"],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub status: u16,
    pub body: Vec<u8>,
}

impl Reply {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// The request never produced a reply (DNS, refused connection, timeout, broken body).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct TransportError {
    pub message: String,
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        let message = if err.is_timeout() {
            format!("request timed out: {err}")
        } else if err.is_connect() {
            format!("failed to connect: {err}")
        } else {
            err.to_string()
        };
        Self { message }
    }
}

#[async_trait]
pub trait AnalysisTransport: Send + Sync {
    /// Post `file` as multipart field `file`. One request, no retry.
    async fn post_file(&self, endpoint: Endpoint, file: CandidateFile)
        -> Result<Reply, TransportError>;

    /// `GET /api/samples/{id}/result`.
    async fn get_result(&self, job: &JobId) -> Result<Reply, TransportError>;
}

#[derive(Debug, Clone)]
pub struct TransportOptions {
    pub base_url: String,
    pub request_timeout: Option<Duration>,
}

impl Default for TransportOptions {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.into(),
            request_timeout: None,
        }
    }
}

pub struct HttpTransport {
    http: Client,
    base_url: Url,
}

impl HttpTransport {
    pub fn new(options: &TransportOptions) -> Result<Self, TransportSetupError> {
        let base_url = parse_base_url(&options.base_url)?;
        let mut builder =
            Client::builder().user_agent(concat!("bioage-client/", env!("CARGO_PKG_VERSION")));
        if let Some(timeout) = options.request_timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            http: builder.build()?,
            base_url,
        })
    }

    pub fn endpoint_url(&self, endpoint: Endpoint) -> Url {
        self.url_with_segments(endpoint.segments())
    }

    /// The job id is pushed as a single path segment, so it is percent-encoded.
    pub fn result_url(&self, job: &JobId) -> Url {
        self.url_with_segments(&["api", "samples", job.0.as_str(), "result"])
    }

    fn url_with_segments(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        // parse_base_url only admits urls that can be a base.
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    async fn send(&self, request: RequestBuilder) -> Result<Reply, TransportError> {
        let response = request.send().await?;
        let status = response.status().as_u16();
        let body = response.bytes().await?;
        Ok(Reply::new(status, body.to_vec()))
    }
}

#[async_trait]
impl AnalysisTransport for HttpTransport {
    async fn post_file(
        &self,
        endpoint: Endpoint,
        file: CandidateFile,
    ) -> Result<Reply, TransportError> {
        let url = self.endpoint_url(endpoint);
        debug!(%url, file_name = %file.name, size_bytes = file.content.len(), "posting file");
        let part = Part::bytes(file.content)
            .file_name(file.name)
            .mime_str(CSV_MIME)?;
        let form = Form::new().part(UPLOAD_FIELD, part);
        self.send(self.http.post(url).multipart(form)).await
    }

    async fn get_result(&self, job: &JobId) -> Result<Reply, TransportError> {
        let url = self.result_url(job);
        debug!(%url, job_id = %job, "fetching job result");
        self.send(self.http.get(url)).await
    }
}

fn parse_base_url(raw: &str) -> Result<Url, TransportSetupError> {
    let invalid = |reason: String| TransportSetupError::InvalidBaseUrl {
        url: raw.to_string(),
        reason,
    };
    let url = Url::parse(raw.trim()).map_err(|e| invalid(e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid(format!("unsupported scheme '{}'", url.scheme())));
    }
    if url.cannot_be_a_base() {
        return Err(invalid("url cannot be used as a base".into()));
    }
    Ok(url)
}
