//! Error types for musication-client
//!
//! Three layers:
//! - `ValidationError`: local pre-flight rejection of the selected file
//! - `ClientError`: one failed Analysis Service request
//! - `SubmitError`: misuse of a lifecycle controller

use musication_common::models::{FailureReason, JobFailure, PhaseKind};
use thiserror::Error;

/// Analysis Service client errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientError {
    /// Service unreachable, connection reset, request timeout
    #[error("Network error: {0}")]
    Transport(String),

    /// Service rejected the request (bad file type, size, parameters)
    #[error("Request rejected ({status}): {}", .message.as_deref().unwrap_or("no details"))]
    Validation {
        status: u16,
        message: Option<String>,
    },

    /// Service-side failure (5xx or unexpected status)
    #[error("Service error ({status}): {}", .message.as_deref().unwrap_or("no details"))]
    Service {
        status: u16,
        message: Option<String>,
    },

    /// Job id unknown to the service
    #[error("Job not found: {job_id}")]
    NotFound {
        job_id: String,
        message: Option<String>,
    },

    /// Results requested before the job completed
    #[error("Results not ready for job {job_id}")]
    NotReady { job_id: String },

    /// Success response with an undecodable body
    #[error("Parse error: {0}")]
    Decode(String),
}

impl ClientError {
    /// Whether the controller may retry this error while polling
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ClientError::Transport(_) | ClientError::Service { .. } | ClientError::Decode(_)
        )
    }

    /// Message taken from the service's error payload, if it sent one
    pub fn payload_message(&self) -> Option<String> {
        match self {
            ClientError::Validation { message, .. }
            | ClientError::Service { message, .. }
            | ClientError::NotFound { message, .. } => message.clone(),
            ClientError::Transport(_) | ClientError::NotReady { .. } | ClientError::Decode(_) => {
                None
            }
        }
    }

    /// Terminal failure for `reason`, preferring the service's own message
    pub fn into_failure(self, reason: FailureReason) -> JobFailure {
        JobFailure::new(reason, self.payload_message())
    }
}

/// Local pre-flight rejection of an upload candidate
#[derive(Debug, Error)]
pub enum ValidationError {
    /// Neither the detected MIME type nor the extension is an accepted audio format
    #[error("Please upload an audio file (MP3, WAV, FLAC, M4A, OGG): {file_name}")]
    NotAudio {
        file_name: String,
        detected_mime: Option<String>,
    },

    #[error("File is empty: {0}")]
    Empty(String),

    #[error("Cannot read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl ValidationError {
    pub fn to_failure(&self) -> JobFailure {
        JobFailure::new(FailureReason::Validation, Some(self.to_string()))
    }
}

/// Lifecycle controller misuse
#[derive(Debug, Error)]
pub enum SubmitError {
    /// A controller runs exactly one job; build a fresh one for the next
    #[error("Controller already handled a job (phase {0}); create a fresh controller")]
    AlreadySubmitted(PhaseKind),

    #[error("Controller was cancelled")]
    Cancelled,

    #[error("No tokio runtime available to drive the job")]
    NoRuntime,

    #[error(transparent)]
    Validation(#[from] ValidationError),
}
