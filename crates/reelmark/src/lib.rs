// Public fallible APIs in this crate share one concrete error contract (`ReelError`).
// Repeating per-function `# Errors` boilerplate obscures behavior more than it clarifies.
#![allow(
    clippy::missing_errors_doc,
    reason = "crate-wide fallible API uses one explicit error type; per-item boilerplate would duplicate contract"
)]

pub mod config;
pub mod correlate;
pub mod error;
pub mod event_log;
pub mod factory;
pub mod models;
pub mod naming;
pub mod recorder;
pub mod registry;
pub mod scan;
pub mod session;
#[cfg(test)]
pub(crate) mod test_support;

pub use config::{CaptureConfig, OutputIsolation};
pub use error::{ReelError, Result};
pub use factory::ExecutionContext;
pub use models::{CandidateArtifact, CorrelationState, ExecutionRecord};
pub use recorder::{Recorder, Recording, RecordingRequest};
pub use session::{CaptureSession, CompletionOutcome};
