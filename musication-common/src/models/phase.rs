//! Job lifecycle phases
//!
//! A job progresses through:
//! IDLE → UPLOADING → STARTING → POLLING → FETCHING → READY
//! with FAILED reachable from every non-terminal phase. Only POLLING repeats.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

use super::results::ClassifiedResults;

/// Why a job ended in the FAILED phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    /// Local pre-flight rejection of the selected file
    Validation,
    UploadError,
    StartError,
    StatusCheckFailed,
    /// The service reported the job as failed
    AnalysisFailed,
    /// Progress attempt budget exhausted
    Timeout,
    ResultsFetchError,
}

impl FailureReason {
    /// Message shown when the service supplied none
    pub fn fallback_message(self) -> &'static str {
        match self {
            FailureReason::Validation => "Please upload an audio file (MP3, WAV, FLAC, M4A, OGG)",
            FailureReason::UploadError | FailureReason::StartError => {
                "Failed to analyze audio file. Please try again."
            }
            FailureReason::StatusCheckFailed => "Failed to check analysis status.",
            FailureReason::AnalysisFailed => "Analysis failed. Please try again.",
            FailureReason::Timeout => "Analysis timeout. Please try again.",
            FailureReason::ResultsFetchError => "Failed to load results.",
        }
    }
}

/// Terminal failure with a human-readable message
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[error("{message}")]
pub struct JobFailure {
    pub reason: FailureReason,
    pub message: String,
}

impl JobFailure {
    /// Use `message` when present and non-blank, otherwise the reason's fallback
    pub fn new(reason: FailureReason, message: Option<String>) -> Self {
        let message = message
            .map(|m| m.trim().to_string())
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| reason.fallback_message().to_string());
        Self { reason, message }
    }

    pub fn fallback(reason: FailureReason) -> Self {
        Self::new(reason, None)
    }
}

/// Current phase of a job lifecycle controller
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum JobPhase {
    Idle,
    Uploading { file_name: String },
    Starting { job_id: String },
    Polling { job_id: String },
    Fetching { job_id: String },
    Ready { results: Arc<ClassifiedResults> },
    Failed { failure: JobFailure },
}

impl JobPhase {
    pub fn kind(&self) -> PhaseKind {
        match self {
            JobPhase::Idle => PhaseKind::Idle,
            JobPhase::Uploading { .. } => PhaseKind::Uploading,
            JobPhase::Starting { .. } => PhaseKind::Starting,
            JobPhase::Polling { .. } => PhaseKind::Polling,
            JobPhase::Fetching { .. } => PhaseKind::Fetching,
            JobPhase::Ready { .. } => PhaseKind::Ready,
            JobPhase::Failed { .. } => PhaseKind::Failed,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.kind().is_terminal()
    }

    /// Job id, once the service has assigned one
    pub fn job_id(&self) -> Option<&str> {
        match self {
            JobPhase::Starting { job_id }
            | JobPhase::Polling { job_id }
            | JobPhase::Fetching { job_id } => Some(job_id),
            JobPhase::Ready { results } => Some(&results.job_id),
            JobPhase::Idle | JobPhase::Uploading { .. } | JobPhase::Failed { .. } => None,
        }
    }

    pub fn results(&self) -> Option<&Arc<ClassifiedResults>> {
        match self {
            JobPhase::Ready { results } => Some(results),
            _ => None,
        }
    }

    pub fn failure(&self) -> Option<&JobFailure> {
        match self {
            JobPhase::Failed { failure } => Some(failure),
            _ => None,
        }
    }
}

/// Phase discriminant, used for transition bookkeeping
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PhaseKind {
    Idle,
    Uploading,
    Starting,
    Polling,
    Fetching,
    Ready,
    Failed,
}

impl PhaseKind {
    pub fn is_terminal(self) -> bool {
        matches!(self, PhaseKind::Ready | PhaseKind::Failed)
    }

    /// Whether the lifecycle allows moving from `self` to `next`
    pub fn can_transition_to(self, next: PhaseKind) -> bool {
        use PhaseKind::*;
        match (self, next) {
            (Idle, Uploading) => true,
            (Uploading, Starting) => true,
            (Starting, Polling) => true,
            (Polling, Fetching) => true,
            (Fetching, Ready) => true,
            (from, Failed) => !from.is_terminal() && from != Idle,
            _ => false,
        }
    }
}

impl fmt::Display for PhaseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PhaseKind::Idle => "IDLE",
            PhaseKind::Uploading => "UPLOADING",
            PhaseKind::Starting => "STARTING",
            PhaseKind::Polling => "POLLING",
            PhaseKind::Fetching => "FETCHING",
            PhaseKind::Ready => "READY",
            PhaseKind::Failed => "FAILED",
        };
        f.write_str(name)
    }
}

/// Phase transition record
#[derive(Debug, Clone, Serialize)]
pub struct PhaseTransition {
    pub controller_id: Uuid,
    pub old_phase: PhaseKind,
    pub new_phase: JobPhase,
    pub transitioned_at: DateTime<Utc>,
}
