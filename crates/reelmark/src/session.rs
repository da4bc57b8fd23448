use std::sync::Arc;
use std::time::Instant;

use crate::config::CaptureConfig;
use crate::error::Result;
use crate::event_log::{EventLog, STATUS_OK};
use crate::factory::ContextFactory;
use crate::models::{ExecutionRecord, SessionSummary};
use crate::recorder::Recorder;
use crate::registry::ExecutionRegistry;
use crate::scan::ArtifactScanner;

mod completion;
mod lifecycle;
mod run;

pub use completion::CompletionOutcome;

/// One test session: owns the registry shared by the per-test teardown path
/// and the runner's completion hook. Share across runner threads via `Arc`.
pub struct CaptureSession {
    config: CaptureConfig,
    factory: ContextFactory,
    scanner: ArtifactScanner,
    registry: ExecutionRegistry,
    log: EventLog,
}

impl std::fmt::Debug for CaptureSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CaptureSession")
            .field("output_dir", &self.config.output_dir)
            .field("isolation", &self.config.isolation)
            .finish_non_exhaustive()
    }
}

impl CaptureSession {
    pub fn new(config: CaptureConfig, recorder: Arc<dyn Recorder>) -> Result<Self> {
        config.validate()?;
        let scanner = ArtifactScanner::new(&config.artifact_extension)?;
        let log = EventLog::new(config.event_log_path.clone());
        Ok(Self {
            factory: ContextFactory::new(config.clone(), recorder),
            config,
            scanner,
            registry: ExecutionRegistry::new(),
            log,
        })
    }

    #[must_use]
    pub fn config(&self) -> &CaptureConfig {
        &self.config
    }

    #[must_use]
    pub fn event_log(&self) -> &EventLog {
        &self.log
    }

    pub fn record(&self, test_identity: &str) -> Result<Option<ExecutionRecord>> {
        self.registry.get(test_identity)
    }

    pub fn records(&self) -> Result<Vec<ExecutionRecord>> {
        self.registry.records()
    }

    pub fn summary(&self) -> Result<SessionSummary> {
        self.registry.summary()
    }

    /// Ends the session; the registry and every record go with it.
    pub fn finish(self) -> Result<SessionSummary> {
        let started = Instant::now();
        let summary = self.registry.summary()?;
        self.log.log_status(
            "session_finish",
            STATUS_OK,
            "",
            started,
            None,
            serde_json::to_value(&summary).ok(),
        );
        Ok(summary)
    }
}

#[cfg(test)]
mod tests;
