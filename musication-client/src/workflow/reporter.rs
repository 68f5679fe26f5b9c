//! Phase publication
//!
//! Every phase change and progress tick goes through the reporter. Its gate
//! mutex serializes publication with cancellation: once `cancel()` has
//! returned, or once a terminal phase has been published, nothing else is
//! delivered.

use chrono::Utc;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::sync::watch;
use uuid::Uuid;

use musication_common::events::{EventBus, MusicationEvent};
use musication_common::models::{JobPhase, JobStatus, PhaseKind, PhaseTransition};

#[derive(Debug, Default)]
struct Gate {
    cancelled: bool,
}

/// Progress snapshot for one polling tick
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollTick {
    pub attempt: u32,
    pub max_attempts: u32,
    pub error_streak: u32,
    /// None when the status check itself failed
    pub status: Option<JobStatus>,
}

/// Gated publisher of one controller's phases
pub struct PhaseReporter {
    controller_id: Uuid,
    phase_tx: watch::Sender<JobPhase>,
    event_bus: EventBus,
    gate: Mutex<Gate>,
}

impl PhaseReporter {
    pub fn new(controller_id: Uuid, event_bus: EventBus) -> Self {
        let (phase_tx, _) = watch::channel(JobPhase::Idle);
        Self {
            controller_id,
            phase_tx,
            event_bus,
            gate: Mutex::new(Gate::default()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Gate> {
        self.gate.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Current phase (cloned snapshot)
    pub fn current(&self) -> JobPhase {
        self.phase_tx.borrow().clone()
    }

    pub fn current_kind(&self) -> PhaseKind {
        self.phase_tx.borrow().kind()
    }

    /// Receiver that observes every published phase
    pub fn watch(&self) -> watch::Receiver<JobPhase> {
        self.phase_tx.subscribe()
    }

    pub fn is_cancelled(&self) -> bool {
        self.lock().cancelled
    }

    /// Publish `next` if the lifecycle allows it
    ///
    /// Returns false (and publishes nothing) after cancellation, after a
    /// terminal phase, or for an out-of-order transition.
    pub fn transition(&self, next: JobPhase) -> bool {
        let gate = self.lock();
        if gate.cancelled {
            tracing::debug!(
                controller_id = %self.controller_id,
                phase = %next.kind(),
                "Suppressed transition after cancellation"
            );
            return false;
        }

        let old_phase = self.current_kind();
        let new_kind = next.kind();
        if !old_phase.can_transition_to(new_kind) {
            tracing::warn!(
                controller_id = %self.controller_id,
                from = %old_phase,
                to = %new_kind,
                "Rejected invalid phase transition"
            );
            return false;
        }

        self.phase_tx.send_replace(next.clone());

        match &next {
            JobPhase::Failed { failure } => tracing::warn!(
                controller_id = %self.controller_id,
                from = %old_phase,
                reason = ?failure.reason,
                message = %failure.message,
                "Job failed"
            ),
            _ => tracing::info!(
                controller_id = %self.controller_id,
                from = %old_phase,
                to = %new_kind,
                job_id = ?next.job_id(),
                "Phase transition"
            ),
        }

        self.event_bus
            .emit_lossy(MusicationEvent::from(PhaseTransition {
                controller_id: self.controller_id,
                old_phase,
                new_phase: next,
                transitioned_at: Utc::now(),
            }));

        drop(gate);
        true
    }

    /// Publish a polling tick unless the controller was cancelled or finished
    pub fn progress(&self, job_id: &str, tick: PollTick) {
        let gate = self.lock();
        if gate.cancelled || self.current_kind() != PhaseKind::Polling {
            return;
        }

        tracing::debug!(
            controller_id = %self.controller_id,
            job_id = %job_id,
            attempt = tick.attempt,
            max_attempts = tick.max_attempts,
            error_streak = tick.error_streak,
            status = ?tick.status,
            "Poll tick"
        );

        self.event_bus.emit_lossy(MusicationEvent::PollProgress {
            controller_id: self.controller_id,
            job_id: job_id.to_string(),
            attempt: tick.attempt,
            max_attempts: tick.max_attempts,
            error_streak: tick.error_streak,
            status: tick.status,
            timestamp: Utc::now(),
        });
    }

    /// Close the gate
    ///
    /// Returns the in-flight phase the job was cancelled in, or None when
    /// there was nothing to cancel (idle, already terminal, already cancelled).
    pub fn cancel(&self) -> Option<PhaseKind> {
        let mut gate = self.lock();
        if gate.cancelled {
            return None;
        }
        gate.cancelled = true;

        let phase = self.current_kind();
        if phase == PhaseKind::Idle || phase.is_terminal() {
            return None;
        }

        self.event_bus.emit_lossy(MusicationEvent::JobCancelled {
            controller_id: self.controller_id,
            phase,
            timestamp: Utc::now(),
        });
        Some(phase)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use musication_common::models::{FailureReason, JobFailure};

    fn reporter() -> (
        PhaseReporter,
        tokio::sync::broadcast::Receiver<MusicationEvent>,
    ) {
        let bus = EventBus::new(32);
        let rx = bus.subscribe();
        (PhaseReporter::new(Uuid::new_v4(), bus), rx)
    }

    fn failed() -> JobPhase {
        JobPhase::Failed {
            failure: JobFailure::fallback(FailureReason::Timeout),
        }
    }

    #[test]
    fn test_transition_publishes_phase_and_event() {
        let (reporter, mut rx) = reporter();
        assert!(reporter.transition(JobPhase::Uploading {
            file_name: "a.mp3".into()
        }));
        assert_eq!(reporter.current_kind(), PhaseKind::Uploading);

        match rx.try_recv().unwrap() {
            MusicationEvent::PhaseChanged {
                old_phase,
                new_phase,
                ..
            } => {
                assert_eq!(old_phase, PhaseKind::Idle);
                assert_eq!(new_phase.kind(), PhaseKind::Uploading);
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn test_out_of_order_transition_rejected() {
        let (reporter, mut rx) = reporter();
        assert!(!reporter.transition(JobPhase::Polling { job_id: "j".into() }));
        assert_eq!(reporter.current_kind(), PhaseKind::Idle);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_single_terminal_transition() {
        let (reporter, _rx) = reporter();
        reporter.transition(JobPhase::Uploading {
            file_name: "a".into(),
        });
        assert!(reporter.transition(failed()));
        assert!(!reporter.transition(failed()));
        assert_eq!(reporter.current_kind(), PhaseKind::Failed);
    }

    #[test]
    fn test_cancel_closes_gate() {
        let (reporter, mut rx) = reporter();
        reporter.transition(JobPhase::Uploading {
            file_name: "a".into(),
        });
        let _ = rx.try_recv();

        assert_eq!(reporter.cancel(), Some(PhaseKind::Uploading));
        assert!(matches!(
            rx.try_recv().unwrap(),
            MusicationEvent::JobCancelled {
                phase: PhaseKind::Uploading,
                ..
            }
        ));

        assert!(!reporter.transition(JobPhase::Starting { job_id: "j".into() }));
        assert!(rx.try_recv().is_err());
        assert_eq!(reporter.current_kind(), PhaseKind::Uploading);

        // Second cancel is a no-op
        assert_eq!(reporter.cancel(), None);
    }

    #[test]
    fn test_cancel_when_idle_emits_nothing() {
        let (reporter, mut rx) = reporter();
        assert_eq!(reporter.cancel(), None);
        assert!(reporter.is_cancelled());
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_progress_only_while_polling() {
        let (reporter, mut rx) = reporter();
        let tick = PollTick {
            attempt: 1,
            max_attempts: 60,
            error_streak: 0,
            status: Some(JobStatus::Processing),
        };
        reporter.progress("j", tick.clone());
        assert!(rx.try_recv().is_err());

        reporter.transition(JobPhase::Uploading {
            file_name: "a".into(),
        });
        reporter.transition(JobPhase::Starting { job_id: "j".into() });
        reporter.transition(JobPhase::Polling { job_id: "j".into() });
        while rx.try_recv().is_ok() {}

        reporter.progress("j", tick);
        assert!(matches!(
            rx.try_recv().unwrap(),
            MusicationEvent::PollProgress { attempt: 1, .. }
        ));
    }
}
