//! Analysis Service HTTP client
//!
//! Stateless transport adapter for the job endpoints:
//!
//! | Operation     | Request                      |
//! |---------------|------------------------------|
//! | Upload        | `POST /api/upload` (multipart field `audio`) |
//! | Start         | `POST /api/analyze/{jobId}`  |
//! | Status        | `GET /api/status/{jobId}`    |
//! | Results       | `GET /api/results/{jobId}`   |
//! | Library stats | `GET /api/library/stats`     |
//!
//! Each call is a single request/response. Retrying is the lifecycle
//! controller's job, never the client's.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use std::fmt;
use std::time::Duration;

use musication_common::models::{AnalysisResults, Job, LibraryStats, StartAck, UploadAck};

use crate::error::ClientError;
use crate::models::AudioFile;

const USER_AGENT: &str = concat!("Musication/", env!("CARGO_PKG_VERSION"));

/// Multipart form field carrying the audio bytes
const UPLOAD_FIELD: &str = "audio";

/// Analysis Service operations used by the lifecycle controller
#[async_trait]
pub trait AnalysisService: Send + Sync {
    /// Upload the file, returning the job id assigned by the service
    async fn upload(&self, file: &AudioFile) -> Result<String, ClientError>;

    /// Ask the service to start analyzing an uploaded job
    async fn start(&self, job_id: &str) -> Result<StartAck, ClientError>;

    /// Side-effect-free status read
    async fn status(&self, job_id: &str) -> Result<Job, ClientError>;

    /// Fetch results; only valid once status is `completed`
    async fn results(&self, job_id: &str) -> Result<AnalysisResults, ClientError>;
}

/// Operation label used for error mapping and logging
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Upload,
    Start,
    Status,
    Results,
    LibraryStats,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Operation::Upload => "upload",
            Operation::Start => "start",
            Operation::Status => "status",
            Operation::Results => "results",
            Operation::LibraryStats => "library_stats",
        };
        f.write_str(name)
    }
}

/// reqwest-backed Analysis Service client
#[derive(Debug, Clone)]
pub struct AnalysisServiceClient {
    http_client: reqwest::Client,
    base_url: String,
}

impl AnalysisServiceClient {
    /// Create a client for `base_url` (trailing slashes are ignored)
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, ClientError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| ClientError::Transport(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Absolute URL of a visualization asset (presentation only)
    pub fn visualization_url(&self, path: &str) -> String {
        resolve_asset_url(&self.base_url, path)
    }

    /// Library statistics (`GET /api/library/stats`)
    pub async fn library_stats(&self) -> Result<LibraryStats, ClientError> {
        let request = self.http_client.get(self.url("/api/library/stats"));
        self.send_json(request, Operation::LibraryStats, None).await
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// `{base}{path}/{job_id}` with the job id percent-encoded as one segment
    fn job_url(&self, path: &str, job_id: &str) -> Result<reqwest::Url, ClientError> {
        let mut url = reqwest::Url::parse(&self.url(path))
            .map_err(|e| ClientError::Transport(format!("Invalid service URL: {}", e)))?;
        url.path_segments_mut()
            .map_err(|_| ClientError::Transport(format!("Invalid service URL: {}", self.base_url)))?
            .push(job_id);
        Ok(url)
    }

    /// Send a request and decode a JSON success body
    async fn send_json<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
        operation: Operation,
        job_id: Option<&str>,
    ) -> Result<T, ClientError> {
        tracing::debug!(%operation, job_id = ?job_id, "Calling Analysis Service");

        let response = request.send().await.map_err(|e| {
            tracing::debug!(%operation, error = %e, "Analysis Service unreachable");
            ClientError::Transport(e.to_string())
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let error = map_error_status(operation, status, &body, job_id);
            tracing::debug!(
                %operation,
                status = status.as_u16(),
                error = %error,
                "Analysis Service error"
            );
            return Err(error);
        }

        response
            .json::<T>()
            .await
            .map_err(|e| ClientError::Decode(format!("{} response: {}", operation, e)))
    }
}

#[async_trait]
impl AnalysisService for AnalysisServiceClient {
    async fn upload(&self, file: &AudioFile) -> Result<String, ClientError> {
        let part = reqwest::multipart::Part::bytes(file.bytes().to_vec())
            .file_name(file.file_name().to_string())
            .mime_str(file.mime_type())
            .map_err(|e| {
                ClientError::Transport(format!("Failed to build multipart body: {}", e))
            })?;
        let form = reqwest::multipart::Form::new().part(UPLOAD_FIELD, part);

        let request = self
            .http_client
            .post(self.url("/api/upload"))
            .multipart(form);
        let ack: UploadAck = self.send_json(request, Operation::Upload, None).await?;

        tracing::info!(
            job_id = %ack.job_id,
            file_name = %file.file_name(),
            size = file.size(),
            "Audio file uploaded"
        );
        Ok(ack.job_id)
    }

    async fn start(&self, job_id: &str) -> Result<StartAck, ClientError> {
        let request = self.http_client.post(self.job_url("/api/analyze", job_id)?);
        self.send_json(request, Operation::Start, Some(job_id))
            .await
    }

    async fn status(&self, job_id: &str) -> Result<Job, ClientError> {
        let request = self.http_client.get(self.job_url("/api/status", job_id)?);
        self.send_json(request, Operation::Status, Some(job_id))
            .await
    }

    async fn results(&self, job_id: &str) -> Result<AnalysisResults, ClientError> {
        let request = self.http_client.get(self.job_url("/api/results", job_id)?);
        self.send_json(request, Operation::Results, Some(job_id))
            .await
    }
}

/// Join a base URL and a relative asset path with exactly one slash
pub fn resolve_asset_url(base_url: &str, path: &str) -> String {
    if path.starts_with("http://") || path.starts_with("https://") {
        return path.to_string();
    }
    format!(
        "{}/{}",
        base_url.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

/// Map a non-success HTTP status onto the client error taxonomy
pub fn map_error_status(
    operation: Operation,
    status: StatusCode,
    body: &str,
    job_id: Option<&str>,
) -> ClientError {
    let message = extract_error_message(body);
    let code = status.as_u16();

    match (operation, code) {
        (Operation::Results, 409 | 425) => ClientError::NotReady {
            job_id: job_id.unwrap_or_default().to_string(),
        },
        (Operation::Start | Operation::Status | Operation::Results, 404) => ClientError::NotFound {
            job_id: job_id.unwrap_or_default().to_string(),
            message,
        },
        (_, 400 | 413 | 415 | 422) => ClientError::Validation {
            status: code,
            message,
        },
        _ => ClientError::Service {
            status: code,
            message,
        },
    }
}

/// Pull a human-readable message out of a JSON error payload
///
/// Looks at `message`, `error` (string or `{ message }`) and `detail`.
/// Non-JSON bodies yield `None` so callers fall back to a generic message.
pub fn extract_error_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;

    let candidates = [
        value.get("message"),
        value.get("error").and_then(|e| e.get("message")),
        value.get("error"),
        value.get("detail"),
    ];

    let found = candidates
        .into_iter()
        .flatten()
        .filter_map(|v| v.as_str())
        .map(str::trim)
        .find(|s| !s.is_empty())
        .map(str::to_string);
    found
}
