use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;

use crate::config::{CaptureConfig, OutputIsolation};
use crate::error::{ReelError, Result};
use crate::models::ExecutionRecord;
use crate::naming::execution_dir_name;
use crate::recorder::{Recorder, Recording, RecordingRequest};
use crate::registry::ExecutionRegistry;

pub const EXECUTION_DIRS: &str = ".runs";

/// A live recording-enabled context for one test. Closing flushes the
/// artifact; dropping an unclosed context closes it best-effort.
pub struct ExecutionContext {
    test_identity: String,
    output_dir: PathBuf,
    recording: Option<Box<dyn Recording>>,
}

impl std::fmt::Debug for ExecutionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutionContext")
            .field("test_identity", &self.test_identity)
            .field("output_dir", &self.output_dir)
            .field("open", &self.recording.is_some())
            .finish()
    }
}

impl ExecutionContext {
    #[must_use]
    pub fn test_identity(&self) -> &str {
        &self.test_identity
    }

    #[must_use]
    pub fn is_open(&self) -> bool {
        self.recording.is_some()
    }

    /// Closing twice is a no-op.
    pub fn close(&mut self) -> Result<()> {
        match self.recording.take() {
            Some(mut recording) => recording.close(),
            None => Ok(()),
        }
    }
}

impl Drop for ExecutionContext {
    fn drop(&mut self) {
        let _ = self.close();
    }
}

#[derive(Clone)]
pub struct ContextFactory {
    config: CaptureConfig,
    recorder: Arc<dyn Recorder>,
}

impl std::fmt::Debug for ContextFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContextFactory").finish_non_exhaustive()
    }
}

impl ContextFactory {
    pub fn new(config: CaptureConfig, recorder: Arc<dyn Recorder>) -> Self {
        Self { config, recorder }
    }

    /// Creates the directories, stamps `start_time`, starts the recorder and
    /// registers the record. `start_time` is always taken before the recorder
    /// is asked to start.
    pub fn create(
        &self,
        registry: &ExecutionRegistry,
        test_identity: &str,
        display_name: Option<&str>,
    ) -> Result<(ExecutionRecord, ExecutionContext)> {
        if test_identity.trim().is_empty() {
            return Err(ReelError::Setup("test identity must not be empty".to_string()));
        }
        if registry.get(test_identity)?.is_some() {
            return Err(ReelError::Setup(format!(
                "test identity already registered in this session: {test_identity}"
            )));
        }

        let target_dir = self.config.output_dir.clone();
        let output_dir = match self.config.isolation {
            OutputIsolation::Shared => target_dir.clone(),
            OutputIsolation::PerExecution => target_dir
                .join(EXECUTION_DIRS)
                .join(execution_dir_name(test_identity)),
        };
        for dir in [&target_dir, &output_dir] {
            fs::create_dir_all(dir).map_err(|err| {
                ReelError::Setup(format!(
                    "cannot create output directory {}: {err}",
                    dir.display()
                ))
            })?;
        }

        let start_time = Utc::now();
        let record = ExecutionRecord::new(test_identity, start_time, &output_dir)
            .with_display_name(display_name.unwrap_or(test_identity))
            .with_target_dir(&target_dir);

        let request = RecordingRequest {
            test_identity: test_identity.to_string(),
            output_dir: output_dir.clone(),
            frame_size: self.config.frame_size,
            viewport: self.config.viewport,
            user_agent: self.config.user_agent.clone(),
        };
        let recording = self.recorder.start(&request).map_err(|err| {
            ReelError::Setup(format!("recorder failed to start for {test_identity}: {err}"))
        })?;
        let mut context = ExecutionContext {
            test_identity: test_identity.to_string(),
            output_dir,
            recording: Some(recording),
        };

        if let Err(err) = registry.register(record.clone()) {
            let _ = context.close();
            return Err(err);
        }
        Ok((record, context))
    }
}
