//! Conformance run orchestration: settings, endpoint probes, filtering
//! scenarios and the per-test problem report.

mod probes;
mod report;
mod runner;
mod scenarios;
mod settings;

pub use report::{SuiteReport, TestOutcome};
pub use runner::Suite;
pub use scenarios::{object_by_id_scenarios, objects_scenarios, FilterScenario};
pub use settings::{
    full_media_type, normalize_endpoint, SettingsOverrides, SuiteSettings, TAXII_MEDIA_TYPE,
    TAXII_VERSION,
};

use taxii_testlab_client::TransportError;
use taxii_testlab_core::CoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SuiteError {
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error("settings error: {0}")]
    Settings(String),
    #[error(transparent)]
    Core(#[from] CoreError),
}
