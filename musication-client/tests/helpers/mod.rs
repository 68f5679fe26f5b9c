//! Test Helper Utilities
//!
//! Shared utilities for testing musication-client

#![allow(dead_code)]

pub mod fixtures;
pub mod scripted_service;

pub use fixtures::{audio_file, completed_job, job, sample_results, similarity_result};
pub use scripted_service::{Reply, ScriptedService, StatusReply};

use musication_common::events::MusicationEvent;
use musication_common::models::PhaseKind;
use tokio::sync::broadcast;

/// Drain every event currently buffered in `rx`
pub fn drain_events(rx: &mut broadcast::Receiver<MusicationEvent>) -> Vec<MusicationEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

/// Phase kinds from the PhaseChanged events, in emission order
pub fn phase_kinds(events: &[MusicationEvent]) -> Vec<PhaseKind> {
    events
        .iter()
        .filter_map(|e| match e {
            MusicationEvent::PhaseChanged { new_phase, .. } => Some(new_phase.kind()),
            _ => None,
        })
        .collect()
}

/// (attempt, error_streak) pairs from the PollProgress events
pub fn poll_counters(events: &[MusicationEvent]) -> Vec<(u32, u32)> {
    events
        .iter()
        .filter_map(|e| match e {
            MusicationEvent::PollProgress {
                attempt,
                error_streak,
                ..
            } => Some((*attempt, *error_streak)),
            _ => None,
        })
        .collect()
}
