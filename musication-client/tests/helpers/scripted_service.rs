//! Scripted in-memory Analysis Service
//!
//! Replies are scripted per operation. Status replies are consumed in order;
//! once the queue is empty the fallback reply repeats.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use musication_client::{AnalysisService, AudioFile, ClientError};
use musication_common::models::{AnalysisResults, Job, JobStatus, StartAck};

use super::fixtures;

/// Scripted outcome of one call
#[derive(Debug, Clone)]
pub enum Reply<T> {
    Ok(T),
    Err(ClientError),
    /// Never resolves (only cancellation ends the call)
    Hang,
}

pub type StatusReply = Reply<JobStatus>;

async fn resolve<T>(reply: Reply<T>) -> Result<T, ClientError> {
    match reply {
        Reply::Ok(value) => Ok(value),
        Reply::Err(error) => Err(error),
        Reply::Hang => std::future::pending().await,
    }
}

pub struct ScriptedService {
    job_id: String,
    upload: Mutex<Reply<String>>,
    start: Mutex<Reply<StartAck>>,
    statuses: Mutex<VecDeque<StatusReply>>,
    status_fallback: Mutex<StatusReply>,
    results: Mutex<Reply<AnalysisResults>>,
    upload_calls: AtomicUsize,
    start_calls: AtomicUsize,
    status_calls: AtomicUsize,
    results_calls: AtomicUsize,
    uploaded: Mutex<Vec<String>>,
}

impl ScriptedService {
    /// Happy-path service: every status poll reports `processing`
    pub fn new(job_id: &str) -> Self {
        Self {
            job_id: job_id.to_string(),
            upload: Mutex::new(Reply::Ok(job_id.to_string())),
            start: Mutex::new(Reply::Ok(StartAck {
                status: "processing".to_string(),
            })),
            statuses: Mutex::new(VecDeque::new()),
            status_fallback: Mutex::new(Reply::Ok(JobStatus::Processing)),
            results: Mutex::new(Reply::Ok(fixtures::sample_results(job_id, Vec::new()))),
            upload_calls: AtomicUsize::new(0),
            start_calls: AtomicUsize::new(0),
            status_calls: AtomicUsize::new(0),
            results_calls: AtomicUsize::new(0),
            uploaded: Mutex::new(Vec::new()),
        }
    }

    pub fn with_upload(self, reply: Reply<String>) -> Self {
        *self.upload.lock().unwrap() = reply;
        self
    }

    pub fn with_start(self, reply: Reply<StartAck>) -> Self {
        *self.start.lock().unwrap() = reply;
        self
    }

    pub fn with_statuses(self, replies: Vec<StatusReply>) -> Self {
        *self.statuses.lock().unwrap() = replies.into();
        self
    }

    pub fn with_status_fallback(self, reply: StatusReply) -> Self {
        *self.status_fallback.lock().unwrap() = reply;
        self
    }

    pub fn with_results(self, reply: Reply<AnalysisResults>) -> Self {
        *self.results.lock().unwrap() = reply;
        self
    }

    pub fn upload_calls(&self) -> usize {
        self.upload_calls.load(Ordering::SeqCst)
    }

    pub fn start_calls(&self) -> usize {
        self.start_calls.load(Ordering::SeqCst)
    }

    pub fn status_calls(&self) -> usize {
        self.status_calls.load(Ordering::SeqCst)
    }

    pub fn results_calls(&self) -> usize {
        self.results_calls.load(Ordering::SeqCst)
    }

    pub fn uploaded_files(&self) -> Vec<String> {
        self.uploaded.lock().unwrap().clone()
    }
}

#[async_trait]
impl AnalysisService for ScriptedService {
    async fn upload(&self, file: &AudioFile) -> Result<String, ClientError> {
        self.upload_calls.fetch_add(1, Ordering::SeqCst);
        self.uploaded
            .lock()
            .unwrap()
            .push(file.file_name().to_string());
        let reply = self.upload.lock().unwrap().clone();
        resolve(reply).await
    }

    async fn start(&self, _job_id: &str) -> Result<StartAck, ClientError> {
        self.start_calls.fetch_add(1, Ordering::SeqCst);
        let reply = self.start.lock().unwrap().clone();
        resolve(reply).await
    }

    async fn status(&self, job_id: &str) -> Result<Job, ClientError> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        let reply = {
            let next = self.statuses.lock().unwrap().pop_front();
            next.unwrap_or_else(|| self.status_fallback.lock().unwrap().clone())
        };
        let status = resolve(reply).await?;
        Ok(if status == JobStatus::Completed {
            fixtures::completed_job(job_id)
        } else {
            fixtures::job(job_id, status)
        })
    }

    async fn results(&self, _job_id: &str) -> Result<AnalysisResults, ClientError> {
        self.results_calls.fetch_add(1, Ordering::SeqCst);
        let reply = self.results.lock().unwrap().clone();
        resolve(reply).await
    }
}

impl std::fmt::Debug for ScriptedService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScriptedService")
            .field("job_id", &self.job_id)
            .field("status_calls", &self.status_calls())
            .finish()
    }
}
