use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ReelError, Result};
use crate::models::FrameSize;

mod env;
mod file;

use file::CaptureConfigFile;

pub const CONFIG_FILE_NAME: &str = "reelmark.toml";

const ENV_OUTPUT_DIR: &str = "REELMARK_OUTPUT_DIR";
const ENV_ARTIFACT_EXT: &str = "REELMARK_ARTIFACT_EXT";
const ENV_CLOCK_SKEW_MS: &str = "REELMARK_CLOCK_SKEW_MS";
const ENV_FLUSH_GRACE_MS: &str = "REELMARK_FLUSH_GRACE_MS";
const ENV_ISOLATION: &str = "REELMARK_ISOLATION";
const ENV_EVENT_LOG: &str = "REELMARK_EVENT_LOG";
const ENV_FRAME_WIDTH: &str = "REELMARK_FRAME_WIDTH";
const ENV_FRAME_HEIGHT: &str = "REELMARK_FRAME_HEIGHT";

const DEFAULT_ARTIFACT_EXT: &str = "webm";
const DEFAULT_CLOCK_SKEW_MS: u64 = 1_000;
const DEFAULT_FLUSH_GRACE_MS: u64 = 500;
const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36";

/// Where recorders write artifacts before they are placed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputIsolation {
    /// Every execution records into the shared output directory.
    /// Correlation is only reliable while executions are serialized.
    #[default]
    Shared,
    /// Every execution records into its own subdirectory; the placed
    /// artifact still lands in the shared output directory.
    PerExecution,
}

impl OutputIsolation {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Shared => "shared",
            Self::PerExecution => "per_execution",
        }
    }

    fn parse(raw: &str) -> Result<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "shared" => Ok(Self::Shared),
            "per_execution" | "per-execution" => Ok(Self::PerExecution),
            other => Err(ReelError::Validation(format!(
                "invalid {ENV_ISOLATION}: {other} (expected shared|per_execution)"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureConfig {
    pub output_dir: PathBuf,
    pub artifact_extension: String,
    pub clock_skew_tolerance_ms: u64,
    pub flush_grace_ms: u64,
    pub frame_size: FrameSize,
    pub viewport: FrameSize,
    pub user_agent: String,
    pub isolation: OutputIsolation,
    pub event_log_path: Option<PathBuf>,
}

impl CaptureConfig {
    /// Defaults laid out under `<base>/test-results`.
    #[must_use]
    pub fn rooted_at(base: &Path) -> Self {
        let results = base.join("test-results");
        Self {
            output_dir: results.join("videos"),
            artifact_extension: DEFAULT_ARTIFACT_EXT.to_string(),
            clock_skew_tolerance_ms: DEFAULT_CLOCK_SKEW_MS,
            flush_grace_ms: DEFAULT_FLUSH_GRACE_MS,
            frame_size: FrameSize::default(),
            viewport: FrameSize::default(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            isolation: OutputIsolation::Shared,
            event_log_path: Some(results.join("logs").join("artifact_events.jsonl")),
        }
    }

    /// Defaults, then `<base>/reelmark.toml` if present, then `REELMARK_*` variables.
    pub fn load(base: &Path) -> Result<Self> {
        let mut config = Self::rooted_at(base);
        let file_path = base.join(CONFIG_FILE_NAME);
        if file_path.is_file() {
            let raw = fs::read_to_string(&file_path)?;
            config.apply_file(&CaptureConfigFile::parse(&raw)?, base);
        }
        config.apply_env_with(base, &|name| std::env::var(name).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_str(base: &Path, raw: &str) -> Result<Self> {
        let mut config = Self::rooted_at(base);
        config.apply_file(&CaptureConfigFile::parse(raw)?, base);
        config.validate()?;
        Ok(config)
    }

    #[must_use]
    pub fn clock_skew_tolerance(&self) -> chrono::Duration {
        i64::try_from(self.clock_skew_tolerance_ms)
            .ok()
            .and_then(chrono::Duration::try_milliseconds)
            .unwrap_or(chrono::Duration::MAX)
    }

    #[must_use]
    pub fn flush_grace(&self) -> Duration {
        Duration::from_millis(self.flush_grace_ms)
    }

    pub fn validate(&self) -> Result<()> {
        let ext = self.artifact_extension.as_str();
        if ext.is_empty() {
            return Err(ReelError::Validation(
                "artifact extension must not be empty".to_string(),
            ));
        }
        if ext
            .chars()
            .any(|c| matches!(c, '.' | '/' | '\\' | '*' | '?' | '[' | ']' | '{' | '}'))
        {
            return Err(ReelError::Validation(format!(
                "artifact extension must be a bare suffix: {ext}"
            )));
        }
        for (label, size) in [("frame_size", self.frame_size), ("viewport", self.viewport)] {
            if size.width == 0 || size.height == 0 {
                return Err(ReelError::Validation(format!(
                    "{label} must be non-zero: {}x{}",
                    size.width, size.height
                )));
            }
        }
        Ok(())
    }

    fn apply_file(&mut self, file: &CaptureConfigFile, base: &Path) {
        if let Some(dir) = &file.output_dir {
            self.output_dir = base.join(dir);
        }
        if let Some(ext) = &file.artifact_extension {
            self.artifact_extension = normalize_extension(ext);
        }
        if let Some(ms) = file.clock_skew_tolerance_ms {
            self.clock_skew_tolerance_ms = ms;
        }
        if let Some(ms) = file.flush_grace_ms {
            self.flush_grace_ms = ms;
        }
        if let Some(size) = file.frame_size {
            self.frame_size = size;
        }
        if let Some(size) = file.viewport {
            self.viewport = size;
        }
        if let Some(agent) = &file.user_agent {
            self.user_agent.clone_from(agent);
        }
        if let Some(isolation) = file.isolation {
            self.isolation = isolation;
        }
        if let Some(path) = &file.event_log_path {
            self.event_log_path = Some(base.join(path));
        }
        if file.event_log == Some(false) {
            self.event_log_path = None;
        }
    }

    pub(crate) fn apply_env_with(
        &mut self,
        base: &Path,
        lookup: &dyn Fn(&str) -> Option<String>,
    ) -> Result<()> {
        if let Some(dir) = env::read_non_empty(lookup, ENV_OUTPUT_DIR) {
            self.output_dir = base.join(dir);
        }
        if let Some(ext) = env::read_non_empty(lookup, ENV_ARTIFACT_EXT) {
            self.artifact_extension = normalize_extension(&ext);
        }
        if let Some(ms) = env::read_u64(lookup, ENV_CLOCK_SKEW_MS) {
            self.clock_skew_tolerance_ms = ms;
        }
        if let Some(ms) = env::read_u64(lookup, ENV_FLUSH_GRACE_MS) {
            self.flush_grace_ms = ms;
        }
        if let Some(width) = env::read_u32(lookup, ENV_FRAME_WIDTH) {
            self.frame_size.width = width;
        }
        if let Some(height) = env::read_u32(lookup, ENV_FRAME_HEIGHT) {
            self.frame_size.height = height;
        }
        if let Some(raw) = env::read_non_empty(lookup, ENV_ISOLATION) {
            self.isolation = OutputIsolation::parse(&raw)?;
        }
        if let Some(raw) = env::read_non_empty(lookup, ENV_EVENT_LOG) {
            if !env::parse_enabled_default_true(Some(&raw)) {
                self.event_log_path = None;
            } else if !matches!(raw.to_ascii_lowercase().as_str(), "on" | "1" | "true" | "yes") {
                self.event_log_path = Some(base.join(raw));
            }
        }
        Ok(())
    }
}

fn normalize_extension(raw: &str) -> String {
    raw.trim().trim_start_matches('.').to_ascii_lowercase()
}
