use std::path::PathBuf;

use serde::Deserialize;

use crate::error::Result;
use crate::models::FrameSize;

use super::OutputIsolation;

/// On-disk shape of `reelmark.toml`; every key is optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub(super) struct CaptureConfigFile {
    pub(super) output_dir: Option<PathBuf>,
    pub(super) artifact_extension: Option<String>,
    pub(super) clock_skew_tolerance_ms: Option<u64>,
    pub(super) flush_grace_ms: Option<u64>,
    pub(super) frame_size: Option<FrameSize>,
    pub(super) viewport: Option<FrameSize>,
    pub(super) user_agent: Option<String>,
    pub(super) isolation: Option<OutputIsolation>,
    pub(super) event_log: Option<bool>,
    pub(super) event_log_path: Option<PathBuf>,
}

impl CaptureConfigFile {
    pub(super) fn parse(raw: &str) -> Result<Self> {
        Ok(toml::from_str(raw)?)
    }
}
