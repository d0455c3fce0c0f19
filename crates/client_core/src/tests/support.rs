//! In-memory doubles shared by the unit tests.

use std::{
    collections::VecDeque,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Mutex,
    },
};

use async_trait::async_trait;
use shared::domain::{CandidateFile, JobId};

use crate::{
    notify::{NotificationKind, NotificationSink},
    poller::NOT_READY_STATUS,
    transport::{AnalysisTransport, Endpoint, Reply, TransportError},
};

pub(crate) fn json_reply(status: u16, body: serde_json::Value) -> Result<Reply, TransportError> {
    Ok(Reply::new(status, body.to_string()))
}

pub(crate) fn not_ready() -> Result<Reply, TransportError> {
    Ok(Reply::new(NOT_READY_STATUS, r#"{"detail":"analysis not complete"}"#))
}

pub(crate) fn network_down() -> Result<Reply, TransportError> {
    Err(TransportError {
        message: "failed to connect: connection refused".into(),
    })
}

/// Replays canned replies. Once the result script runs out, every poll is "not ready".
#[derive(Default)]
pub(crate) struct ScriptedTransport {
    posts: Mutex<VecDeque<Result<Reply, TransportError>>>,
    results: Mutex<VecDeque<Result<Reply, TransportError>>>,
    posted: Mutex<Vec<(Endpoint, String)>>,
    polled: Mutex<Vec<JobId>>,
    post_calls: AtomicUsize,
    result_calls: AtomicUsize,
}

impl ScriptedTransport {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_post(self, reply: Result<Reply, TransportError>) -> Self {
        self.posts.lock().expect("posts").push_back(reply);
        self
    }

    pub(crate) fn with_result(self, reply: Result<Reply, TransportError>) -> Self {
        self.results.lock().expect("results").push_back(reply);
        self
    }

    pub(crate) fn with_not_ready(self, times: usize) -> Self {
        for _ in 0..times {
            self.results.lock().expect("results").push_back(not_ready());
        }
        self
    }

    pub(crate) fn post_calls(&self) -> usize {
        self.post_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn result_calls(&self) -> usize {
        self.result_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn posted(&self) -> Vec<(Endpoint, String)> {
        self.posted.lock().expect("posted").clone()
    }

    pub(crate) fn polled(&self) -> Vec<JobId> {
        self.polled.lock().expect("polled").clone()
    }
}

#[async_trait]
impl AnalysisTransport for ScriptedTransport {
    async fn post_file(
        &self,
        endpoint: Endpoint,
        file: CandidateFile,
    ) -> Result<Reply, TransportError> {
        self.post_calls.fetch_add(1, Ordering::SeqCst);
        self.posted.lock().expect("posted").push((endpoint, file.name));
        self.posts
            .lock()
            .expect("posts")
            .pop_front()
            .unwrap_or_else(|| Ok(Reply::new(500, "unscripted upload")))
    }

    async fn get_result(&self, job: &JobId) -> Result<Reply, TransportError> {
        self.result_calls.fetch_add(1, Ordering::SeqCst);
        self.polled.lock().expect("polled").push(job.clone());
        self.results
            .lock()
            .expect("results")
            .pop_front()
            .unwrap_or_else(not_ready)
    }
}

/// Accepts every request and never answers it.
#[derive(Default)]
pub(crate) struct StalledTransport {
    post_calls: AtomicUsize,
    result_calls: AtomicUsize,
}

impl StalledTransport {
    pub(crate) fn post_calls(&self) -> usize {
        self.post_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn result_calls(&self) -> usize {
        self.result_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AnalysisTransport for StalledTransport {
    async fn post_file(
        &self,
        _endpoint: Endpoint,
        _file: CandidateFile,
    ) -> Result<Reply, TransportError> {
        self.post_calls.fetch_add(1, Ordering::SeqCst);
        std::future::pending().await
    }

    async fn get_result(&self, _job: &JobId) -> Result<Reply, TransportError> {
        self.result_calls.fetch_add(1, Ordering::SeqCst);
        std::future::pending().await
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Recorded {
    pub kind: NotificationKind,
    pub title: String,
    pub detail: String,
}

#[derive(Default)]
pub(crate) struct RecordingSink {
    notices: Mutex<Vec<Recorded>>,
}

impl RecordingSink {
    pub(crate) fn notices(&self) -> Vec<Recorded> {
        self.notices.lock().expect("notices").clone()
    }

    pub(crate) fn titles(&self) -> Vec<String> {
        self.notices().into_iter().map(|n| n.title).collect()
    }
}

impl NotificationSink for RecordingSink {
    fn notify(&self, kind: NotificationKind, title: &str, detail: &str) {
        self.notices.lock().expect("notices").push(Recorded {
            kind,
            title: title.to_string(),
            detail: detail.to_string(),
        });
    }
}

pub(crate) fn csv(name: &str) -> CandidateFile {
    CandidateFile::new(name, b"probe,value\ncg00000029,0.51\n".to_vec())
}
