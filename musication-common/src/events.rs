//! Event types for the Musication event system
//!
//! Provides the shared event definitions and the EventBus that lifecycle
//! controllers publish to and presentation subscribes to.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::models::{JobPhase, JobStatus, PhaseKind, PhaseTransition};

/// Musication event types
///
/// Events are broadcast via EventBus and can be serialized (e.g. as JSON lines).
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum MusicationEvent {
    /// Controller moved to a new lifecycle phase
    ///
    /// Triggers:
    /// - Presentation: render the new phase
    PhaseChanged {
        /// Controller instance that owns the job
        controller_id: Uuid,
        /// Phase before the change
        old_phase: PhaseKind,
        /// Phase after the change (carries results or failure)
        new_phase: JobPhase,
        /// When the phase changed
        timestamp: DateTime<Utc>,
    },

    /// One status poll resolved
    ///
    /// Emitted once per polling tick while in POLLING.
    PollProgress {
        controller_id: Uuid,
        job_id: String,
        /// Non-terminal statuses observed so far
        attempt: u32,
        max_attempts: u32,
        /// Consecutive failed status checks
        error_streak: u32,
        /// Status returned by this poll (None if the check failed)
        status: Option<JobStatus>,
        timestamp: DateTime<Utc>,
    },

    /// Controller was cancelled by its owner
    ///
    /// NOTE: not a phase. No PhaseChanged follows this event.
    JobCancelled {
        controller_id: Uuid,
        /// Phase the controller was in when cancelled
        phase: PhaseKind,
        timestamp: DateTime<Utc>,
    },
}

impl MusicationEvent {
    pub fn controller_id(&self) -> Uuid {
        match self {
            MusicationEvent::PhaseChanged { controller_id, .. }
            | MusicationEvent::PollProgress { controller_id, .. }
            | MusicationEvent::JobCancelled { controller_id, .. } => *controller_id,
        }
    }
}

impl From<PhaseTransition> for MusicationEvent {
    fn from(transition: PhaseTransition) -> Self {
        MusicationEvent::PhaseChanged {
            controller_id: transition.controller_id,
            old_phase: transition.old_phase,
            new_phase: transition.new_phase,
            timestamp: transition.transitioned_at,
        }
    }
}

/// Central event distribution bus
///
/// Cloning shares the underlying channel.
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<MusicationEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus with specified channel capacity
    ///
    /// # Arguments
    ///
    /// * `capacity` - Number of events to buffer before lagging receivers drop old events
    ///
    /// # Examples
    ///
    /// ```
    /// use musication_common::events::EventBus;
    ///
    /// let event_bus = EventBus::new(100);
    /// assert_eq!(event_bus.capacity(), 100);
    /// ```
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    ///
    /// Events emitted before subscription are not received.
    pub fn subscribe(&self) -> broadcast::Receiver<MusicationEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Ok(subscriber_count)` if at least one subscriber exists.
    /// Returns `Err` if no subscribers are listening.
    #[allow(clippy::result_large_err)]
    pub fn emit(
        &self,
        event: MusicationEvent,
    ) -> Result<usize, broadcast::error::SendError<MusicationEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: MusicationEvent) {
        let _ = self.tx.send(event);
    }

    /// Get the current number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Get the channel capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
