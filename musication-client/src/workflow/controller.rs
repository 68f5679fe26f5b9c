//! Job lifecycle controller
//!
//! Owns one analysis job from submission to a terminal phase. The state
//! machine runs in a spawned tokio task; every await point in that task races
//! the controller's `CancellationToken`, and every publication goes through
//! the gated [`PhaseReporter`].

use std::future::Future;
use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::runtime::Handle;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use musication_common::events::{EventBus, MusicationEvent};
use musication_common::models::{
    ClassifiedResults, FailureReason, JobFailure, JobPhase, JobStatus, PhaseKind,
};

use super::reporter::{PhaseReporter, PollTick};
use super::ControllerSettings;
use crate::error::{ClientError, SubmitError};
use crate::models::AudioFile;
use crate::services::{classifier, AnalysisService};

/// Handle for one analysis job
///
/// A controller runs at most one job. Dropping it cancels the job.
pub struct JobLifecycleController {
    id: Uuid,
    service: Arc<dyn AnalysisService>,
    settings: ControllerSettings,
    event_bus: EventBus,
    reporter: Arc<PhaseReporter>,
    cancel_token: CancellationToken,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl JobLifecycleController {
    pub fn new(
        service: Arc<dyn AnalysisService>,
        settings: ControllerSettings,
        event_bus: EventBus,
    ) -> Self {
        let id = Uuid::new_v4();
        Self {
            id,
            service,
            settings,
            reporter: Arc::new(PhaseReporter::new(id, event_bus.clone())),
            event_bus,
            cancel_token: CancellationToken::new(),
            task: Mutex::new(None),
        }
    }

    /// New idle controller sharing this one's service, settings and bus
    pub fn fresh(&self) -> Self {
        Self::new(
            Arc::clone(&self.service),
            self.settings.clone(),
            self.event_bus.clone(),
        )
    }

    /// Controller id, carried by every event this controller emits
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn settings(&self) -> &ControllerSettings {
        &self.settings
    }

    /// Current phase
    pub fn phase(&self) -> JobPhase {
        self.reporter.current()
    }

    /// Receiver updated on every published phase
    pub fn watch_phase(&self) -> watch::Receiver<JobPhase> {
        self.reporter.watch()
    }

    /// Subscribe to the event bus
    ///
    /// The bus may be shared; filter on [`MusicationEvent::controller_id`].
    pub fn subscribe(&self) -> broadcast::Receiver<MusicationEvent> {
        self.event_bus.subscribe()
    }

    /// Start the job for an already validated file
    ///
    /// Publishes `Uploading` before returning; the rest of the lifecycle runs
    /// on the current tokio runtime.
    pub fn submit(&self, file: AudioFile) -> Result<(), SubmitError> {
        let runtime = Handle::try_current().map_err(|_| SubmitError::NoRuntime)?;

        let mut task = self.task.lock().unwrap_or_else(PoisonError::into_inner);
        if self.cancel_token.is_cancelled() || self.reporter.is_cancelled() {
            return Err(SubmitError::Cancelled);
        }
        let current = self.reporter.current_kind();
        if task.is_some() || current != PhaseKind::Idle {
            return Err(SubmitError::AlreadySubmitted(current));
        }

        if !self.reporter.transition(JobPhase::Uploading {
            file_name: file.file_name().to_string(),
        }) {
            return Err(SubmitError::Cancelled);
        }

        tracing::info!(
            controller_id = %self.id,
            file_name = %file.file_name(),
            mime_type = %file.mime_type(),
            size = file.size(),
            "Submitting audio file for analysis"
        );

        let run = JobRun {
            service: Arc::clone(&self.service),
            settings: self.settings.clone(),
            reporter: Arc::clone(&self.reporter),
            cancel_token: self.cancel_token.clone(),
        };
        *task = Some(runtime.spawn(run.execute(file)));
        Ok(())
    }

    /// Validate a file on disk and submit it
    ///
    /// A rejected file leaves the controller in `Idle` and nothing is sent.
    pub fn submit_path(&self, path: &Path) -> Result<(), SubmitError> {
        let file = AudioFile::from_path(path).map_err(|e| {
            tracing::info!(
                controller_id = %self.id,
                path = %path.display(),
                error = %e,
                "Pre-flight validation failed"
            );
            e
        })?;
        self.submit(file)
    }

    /// Wait until the job reaches a terminal phase or is cancelled
    ///
    /// Returns the last published phase. On an idle controller this only
    /// returns once the controller is cancelled.
    pub async fn wait(&self) -> JobPhase {
        let mut rx = self.reporter.watch();
        loop {
            {
                let phase = rx.borrow_and_update();
                if phase.is_terminal() {
                    return phase.clone();
                }
            }
            tokio::select! {
                _ = self.cancel_token.cancelled() => return self.reporter.current(),
                changed = rx.changed() => {
                    if changed.is_err() {
                        return self.reporter.current();
                    }
                }
            }
        }
    }

    /// Cancel the job
    ///
    /// After this returns no further phase is published. Idempotent.
    pub fn cancel(&self) {
        let cancelled_in = self.reporter.cancel();
        self.cancel_token.cancel();

        let handle = self
            .task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            handle.abort();
        }

        if let Some(phase) = cancelled_in {
            tracing::info!(controller_id = %self.id, %phase, "Job cancelled");
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel_token.is_cancelled()
    }
}

impl Drop for JobLifecycleController {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Why a run stopped before `Ready`
#[derive(Debug)]
enum Halt {
    Cancelled,
    Failed(JobFailure),
}

impl Halt {
    fn from_client(error: ClientError, reason: FailureReason) -> Self {
        tracing::debug!(error = %error, ?reason, "Service call failed");
        Halt::Failed(error.into_failure(reason))
    }
}

/// State owned by the spawned task for one job
struct JobRun {
    service: Arc<dyn AnalysisService>,
    settings: ControllerSettings,
    reporter: Arc<PhaseReporter>,
    cancel_token: CancellationToken,
}

impl JobRun {
    async fn execute(self, file: AudioFile) {
        match self.drive(file).await {
            Ok(results) => {
                self.reporter.transition(JobPhase::Ready { results });
            }
            Err(Halt::Failed(failure)) => {
                self.reporter.transition(JobPhase::Failed { failure });
            }
            Err(Halt::Cancelled) => {
                tracing::debug!("Job run stopped by cancellation");
            }
        }
    }

    /// Race `fut` against cancellation
    async fn guarded<F: Future>(&self, fut: F) -> Result<F::Output, Halt> {
        tokio::select! {
            biased;
            _ = self.cancel_token.cancelled() => Err(Halt::Cancelled),
            out = fut => Ok(out),
        }
    }

    fn advance(&self, next: JobPhase) -> Result<(), Halt> {
        if self.reporter.transition(next) {
            Ok(())
        } else {
            Err(Halt::Cancelled)
        }
    }

    async fn drive(&self, file: AudioFile) -> Result<Arc<ClassifiedResults>, Halt> {
        let job_id = self
            .guarded(self.service.upload(&file))
            .await?
            .map_err(|e| Halt::from_client(e, FailureReason::UploadError))?;
        drop(file);

        self.advance(JobPhase::Starting {
            job_id: job_id.clone(),
        })?;
        let ack = self
            .guarded(self.service.start(&job_id))
            .await?
            .map_err(|e| Halt::from_client(e, FailureReason::StartError))?;
        tracing::debug!(job_id = %job_id, status = %ack.status, "Analysis started");

        self.advance(JobPhase::Polling {
            job_id: job_id.clone(),
        })?;
        self.poll(&job_id).await?;

        self.advance(JobPhase::Fetching {
            job_id: job_id.clone(),
        })?;
        let results = self
            .guarded(self.service.results(&job_id))
            .await?
            .map_err(|e| {
                if let ClientError::NotReady { .. } = e {
                    tracing::error!(job_id = %job_id, "Results not ready after completed status");
                }
                Halt::from_client(e, FailureReason::ResultsFetchError)
            })?;

        tracing::info!(
            job_id = %job_id,
            matches = results.matches.len(),
            processing_time = results.processing_time,
            "Analysis results received"
        );
        Ok(Arc::new(classifier::annotate(results)))
    }

    /// Poll until the job completes
    ///
    /// The first status call is immediate. `attempt` counts non-terminal
    /// statuses; `error_streak` counts consecutive transient failures. A
    /// successful call resets only the streak.
    async fn poll(&self, job_id: &str) -> Result<(), Halt> {
        let max_attempts = self.settings.max_attempts;
        let max_error_retries = self.settings.max_error_retries;
        let mut attempt: u32 = 0;
        let mut error_streak: u32 = 0;

        loop {
            let outcome = self.guarded(self.service.status(job_id)).await?;
            let tick = |attempt, error_streak, status| PollTick {
                attempt,
                max_attempts,
                error_streak,
                status,
            };

            match outcome {
                Ok(job) => {
                    error_streak = 0;
                    match job.status {
                        JobStatus::Completed => {
                            self.reporter
                                .progress(job_id, tick(attempt, error_streak, Some(job.status)));
                            return Ok(());
                        }
                        JobStatus::Failed => {
                            self.reporter
                                .progress(job_id, tick(attempt, error_streak, Some(job.status)));
                            return Err(Halt::Failed(JobFailure::fallback(
                                FailureReason::AnalysisFailed,
                            )));
                        }
                        status => {
                            if status == JobStatus::Unknown {
                                tracing::warn!(
                                    job_id = %job_id,
                                    "Unrecognized job status, still waiting"
                                );
                            }
                            attempt += 1;
                            self.reporter
                                .progress(job_id, tick(attempt, error_streak, Some(status)));
                            if attempt >= max_attempts {
                                tracing::warn!(
                                    job_id = %job_id,
                                    attempt,
                                    "Poll attempt budget exhausted"
                                );
                                return Err(Halt::Failed(JobFailure::fallback(
                                    FailureReason::Timeout,
                                )));
                            }
                        }
                    }
                }
                Err(error) if error.is_transient() => {
                    error_streak += 1;
                    self.reporter
                        .progress(job_id, tick(attempt, error_streak, None));
                    tracing::warn!(
                        job_id = %job_id,
                        error_streak,
                        max_error_retries,
                        error = %error,
                        "Status check failed"
                    );
                    if error_streak >= max_error_retries {
                        return Err(Halt::from_client(error, FailureReason::StatusCheckFailed));
                    }
                }
                Err(error) => {
                    return Err(Halt::from_client(error, FailureReason::StatusCheckFailed));
                }
            }

            self.guarded(tokio::time::sleep(self.settings.poll_interval))
                .await?;
        }
    }
}
