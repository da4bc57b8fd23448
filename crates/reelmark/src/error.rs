use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

pub type Result<T> = std::result::Result<T, ReelError>;

#[derive(Debug, Error)]
pub enum ReelError {
    #[error("setup failed: {0}")]
    Setup(String),

    #[error("no artifact correlated: {0}")]
    CorrelationMiss(String),

    #[error("could not place {} at {}: {reason}", .source_path.display(), .target.display())]
    RenameCollisionUnresolved {
        source_path: PathBuf,
        target: PathBuf,
        reason: String,
    },

    #[error("not found: {0}")]
    NotFound(String),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Toml(#[from] toml::de::Error),

    #[error(transparent)]
    Glob(#[from] globset::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorPayload {
    pub code: String,
    pub message: String,
    pub operation: String,
    pub trace_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ReelError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Setup(_) => "SETUP_ERROR",
            Self::CorrelationMiss(_) => "CORRELATION_MISS",
            Self::RenameCollisionUnresolved { .. } => "RENAME_COLLISION_UNRESOLVED",
            Self::NotFound(_) => "NOT_FOUND",
            Self::Validation(_) => "VALIDATION_FAILED",
            Self::Io(_) => "IO_ERROR",
            Self::Json(_) => "JSON_ERROR",
            Self::Toml(_) => "TOML_ERROR",
            Self::Glob(_) => "GLOB_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Only setup failures may fail a test; everything after setup is diagnostic.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Setup(_))
    }

    pub fn to_payload(&self, operation: impl Into<String>, path: Option<String>) -> ErrorPayload {
        let details = match self {
            Self::RenameCollisionUnresolved {
                source_path,
                target,
                ..
            } => Some(serde_json::json!({
                "source_path": source_path.display().to_string(),
                "target": target.display().to_string(),
            })),
            _ => None,
        };
        ErrorPayload {
            code: self.code().to_string(),
            message: self.to_string(),
            operation: operation.into(),
            trace_id: Uuid::new_v4().to_string(),
            path,
            details,
        }
    }
}
