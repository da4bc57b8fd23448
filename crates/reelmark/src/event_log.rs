use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Instant;

use chrono::Utc;
use uuid::Uuid;

use crate::error::{ReelError, Result};
use crate::models::ArtifactEvent;

pub const STATUS_OK: &str = "ok";
pub const STATUS_WARNING: &str = "warning";
pub const STATUS_ERROR: &str = "error";
pub const STATUS_SKIPPED: &str = "skipped";

/// Append-only JSONL log of lifecycle operations. Writes are best-effort.
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    path: Option<PathBuf>,
}

impl EventLog {
    #[must_use]
    pub fn new(path: Option<PathBuf>) -> Self {
        Self { path }
    }

    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn try_append(&self, event: &ArtifactEvent) {
        let Some(path) = self.path.as_deref() else {
            return;
        };
        if let Ok(serialized) = serde_json::to_string(event) {
            let mut line = serialized;
            line.push('\n');
            let _ = append_line(path, &line);
        }
    }

    pub fn log_status(
        &self,
        operation: &str,
        status: &str,
        test_identity: &str,
        started: Instant,
        artifact_path: Option<&Path>,
        details: Option<serde_json::Value>,
    ) {
        self.try_append(&ArtifactEvent {
            event_id: Uuid::new_v4().to_string(),
            operation: operation.to_string(),
            status: status.to_string(),
            test_identity: test_identity.to_string(),
            latency_ms: started.elapsed().as_millis(),
            created_at: Utc::now().to_rfc3339(),
            artifact_path: artifact_path.map(|path| path.display().to_string()),
            error_code: None,
            error_message: None,
            details,
        });
    }

    pub fn log_error(
        &self,
        operation: &str,
        test_identity: &str,
        started: Instant,
        err: &ReelError,
        details: Option<serde_json::Value>,
    ) {
        let status = if matches!(err, ReelError::CorrelationMiss(_)) {
            STATUS_WARNING
        } else {
            STATUS_ERROR
        };
        self.try_append(&ArtifactEvent {
            event_id: Uuid::new_v4().to_string(),
            operation: operation.to_string(),
            status: status.to_string(),
            test_identity: test_identity.to_string(),
            latency_ms: started.elapsed().as_millis(),
            created_at: Utc::now().to_rfc3339(),
            artifact_path: None,
            error_code: Some(err.code().to_string()),
            error_message: Some(err.to_string()),
            details,
        });
    }
}

fn append_line(path: &Path, line: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)?;
    file.write_all(line.as_bytes())?;
    Ok(())
}

/// Events read back from a log. Torn or foreign lines are counted, not fatal.
#[derive(Debug, Clone, Default)]
pub struct EventLogReadout {
    pub events: Vec<ArtifactEvent>,
    pub skipped_lines: usize,
    /// 1-based line number and parse error of the first skipped line.
    pub first_error: Option<(usize, String)>,
}

/// Reads an event log back; a missing file is an empty log. A file with
/// content but no parseable event is not an event log.
pub fn read_events(path: &Path) -> Result<EventLogReadout> {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            return Ok(EventLogReadout::default());
        }
        Err(err) => return Err(ReelError::from(err)),
    };

    let mut readout = EventLogReadout::default();
    for (line_no, line) in raw.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<ArtifactEvent>(line) {
            Ok(event) => readout.events.push(event),
            Err(err) => {
                readout.skipped_lines += 1;
                if readout.first_error.is_none() {
                    readout.first_error = Some((line_no + 1, err.to_string()));
                }
            }
        }
    }

    if readout.events.is_empty() {
        if let Some((line_no, err)) = readout.first_error {
            return Err(ReelError::Validation(format!(
                "{} holds no artifact events (line {line_no}: {err})",
                path.display()
            )));
        }
    }
    Ok(readout)
}
