use std::path::PathBuf;

use crate::error::Result;
use crate::models::FrameSize;

/// What the recording subsystem is told when a context is created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordingRequest {
    pub test_identity: String,
    pub output_dir: PathBuf,
    pub frame_size: FrameSize,
    pub viewport: FrameSize,
    pub user_agent: String,
}

/// External recording subsystem. Each started recording flushes exactly one
/// artifact into `RecordingRequest::output_dir`, under a name of its own
/// choosing, at some point after `Recording::close`.
pub trait Recorder: Send + Sync {
    fn start(&self, request: &RecordingRequest) -> Result<Box<dyn Recording>>;
}

pub trait Recording: Send {
    fn close(&mut self) -> Result<()>;
}
