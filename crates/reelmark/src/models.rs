use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CorrelationState {
    #[default]
    Created,
    Correlating,
    Correlated,
    Uncorrelated,
}

impl CorrelationState {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Correlating => "correlating",
            Self::Correlated => "correlated",
            Self::Uncorrelated => "uncorrelated",
        }
    }

    /// States from which the correlate-and-place step may be (re)started.
    #[must_use]
    pub const fn is_claimable(self) -> bool {
        matches!(self, Self::Created | Self::Uncorrelated)
    }
}

/// One test execution as seen by the registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionRecord {
    pub test_identity: String,
    pub display_name: String,
    pub start_time: DateTime<Utc>,
    pub output_dir: PathBuf,
    pub target_dir: PathBuf,
    pub correlated: bool,
    pub state: CorrelationState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub final_path: Option<PathBuf>,
}

impl ExecutionRecord {
    pub fn new(
        test_identity: impl Into<String>,
        start_time: DateTime<Utc>,
        output_dir: impl Into<PathBuf>,
    ) -> Self {
        let test_identity = test_identity.into();
        let output_dir = output_dir.into();
        Self {
            display_name: test_identity.clone(),
            test_identity,
            start_time,
            target_dir: output_dir.clone(),
            output_dir,
            correlated: false,
            state: CorrelationState::Created,
            final_path: None,
        }
    }

    #[must_use]
    pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = display_name.into();
        self
    }

    #[must_use]
    pub fn with_target_dir(mut self, target_dir: impl Into<PathBuf>) -> Self {
        self.target_dir = target_dir.into();
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateArtifact {
    pub path: PathBuf,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameSize {
    pub width: u32,
    pub height: u32,
}

impl Default for FrameSize {
    fn default() -> Self {
        Self {
            width: 1920,
            height: 1080,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactEvent {
    pub event_id: String,
    pub operation: String,
    pub status: String,
    pub test_identity: String,
    pub latency_ms: u128,
    pub created_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artifact_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub total: usize,
    pub created: usize,
    pub correlating: usize,
    pub correlated: usize,
    pub uncorrelated: usize,
    pub uncorrelated_identities: Vec<String>,
}
