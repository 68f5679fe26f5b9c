//! Job lifecycle workflow
//!
//! One controller drives one analysis job through
//! IDLE → UPLOADING → STARTING → POLLING → FETCHING → READY (or FAILED).
//!
//! # Architecture
//!
//! - `JobLifecycleController` is the handle owned by presentation. It exposes
//!   the current phase, transition subscriptions and cancellation.
//! - A spawned task runs the state machine against an `AnalysisService`.
//! - `PhaseReporter` is the single publishing point for phases and progress.
//!   It refuses anything after cancellation or a terminal phase.

pub mod controller;
pub mod reporter;

use std::time::Duration;

use musication_common::config::PollingConfig;

pub use controller::JobLifecycleController;
pub use reporter::PhaseReporter;

/// Polling knobs for a controller
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControllerSettings {
    /// Delay between consecutive status polls
    pub poll_interval: Duration,
    /// Non-terminal statuses tolerated before `Timeout`
    pub max_attempts: u32,
    /// Consecutive transient status errors tolerated before `StatusCheckFailed`
    pub max_error_retries: u32,
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self::from(&PollingConfig::default())
    }
}

impl From<&PollingConfig> for ControllerSettings {
    fn from(config: &PollingConfig) -> Self {
        Self {
            poll_interval: config.interval(),
            max_attempts: config.max_attempts,
            max_error_retries: config.max_error_retries,
        }
    }
}
