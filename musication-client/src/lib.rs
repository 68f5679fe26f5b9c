//! musication-client library interface
//!
//! Exposes the analysis client, the job lifecycle controller and the text
//! renderer used by the `musication` binary and by integration tests.

pub mod error;
pub mod models;
pub mod render;
pub mod services;
pub mod workflow;

pub use crate::error::{ClientError, SubmitError, ValidationError};
pub use crate::models::AudioFile;
pub use crate::services::{AnalysisService, AnalysisServiceClient};
pub use crate::workflow::{ControllerSettings, JobLifecycleController};

use std::sync::Arc;

use musication_common::config::TomlConfig;
use musication_common::events::EventBus;

/// Event bus capacity for one CLI session
pub const EVENT_BUS_CAPACITY: usize = 256;

/// Build a controller talking to `service_url` with the polling settings of
/// `config`
pub fn build_controller(
    service_url: &str,
    config: &TomlConfig,
    event_bus: EventBus,
) -> Result<(JobLifecycleController, Arc<AnalysisServiceClient>), ClientError> {
    let client = Arc::new(AnalysisServiceClient::new(
        service_url,
        config.polling.request_timeout(),
    )?);
    let controller = JobLifecycleController::new(
        client.clone(),
        ControllerSettings::from(&config.polling),
        event_bus,
    );
    Ok((controller, client))
}
