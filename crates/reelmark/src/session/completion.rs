use std::fs;
use std::path::PathBuf;
use std::time::Instant;

use crate::correlate::correlate;
use crate::error::{ReelError, Result};
use crate::event_log::{STATUS_OK, STATUS_SKIPPED};
use crate::models::ExecutionRecord;
use crate::naming::{place, resolve_name};
use crate::registry::Claim;

use super::CaptureSession;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompletionOutcome {
    /// No context was ever created for this identity.
    NotRegistered,
    /// An earlier call already placed the artifact; nothing was touched.
    AlreadyCorrelated(PathBuf),
    /// Another call site holds the record right now.
    InProgress,
    Correlated(PathBuf),
    /// The raw artifact, if any, stays under its recorder-assigned name.
    Uncorrelated { code: &'static str, message: String },
    ContextCloseFailed(String),
}

impl CompletionOutcome {
    #[must_use]
    pub fn final_path(&self) -> Option<&PathBuf> {
        match self {
            Self::AlreadyCorrelated(path) | Self::Correlated(path) => Some(path),
            _ => None,
        }
    }
}

impl CaptureSession {
    /// Runner hook invoked after every test's teardown. Never fails: artifact
    /// capture is diagnostic and must not change a test's outcome.
    pub fn complete(&self, test_identity: &str) -> CompletionOutcome {
        self.finalize("complete", test_identity)
    }

    /// The single idempotent correlate-and-place step behind both `teardown`
    /// and `complete`.
    pub(super) fn finalize(&self, operation: &str, test_identity: &str) -> CompletionOutcome {
        let started = Instant::now();
        let claim = match self.registry.claim(test_identity) {
            Ok(claim) => claim,
            Err(err) => {
                self.log
                    .log_error(operation, test_identity, started, &err, None);
                return uncorrelated(&err);
            }
        };

        let record = match claim {
            Claim::Claimed(record) => record,
            Claim::NotRegistered => {
                self.log_skip(operation, test_identity, started, "not_registered");
                return CompletionOutcome::NotRegistered;
            }
            Claim::InProgress => {
                self.log_skip(operation, test_identity, started, "in_progress");
                return CompletionOutcome::InProgress;
            }
            // Repeat hooks leave the file system, the event log included, untouched.
            Claim::AlreadyCorrelated(record) => {
                return match record.final_path {
                    Some(path) => CompletionOutcome::AlreadyCorrelated(path),
                    None => CompletionOutcome::AlreadyCorrelated(record.target_dir),
                };
            }
        };

        match self.correlate_and_place(&record) {
            Ok(final_path) => {
                if let Err(err) = self
                    .registry
                    .mark_correlated(test_identity, final_path.clone())
                {
                    self.log
                        .log_error(operation, test_identity, started, &err, None);
                }
                if record.output_dir != record.target_dir {
                    let _ = fs::remove_dir(&record.output_dir);
                }
                self.log.log_status(
                    operation,
                    STATUS_OK,
                    test_identity,
                    started,
                    Some(&final_path),
                    None,
                );
                CompletionOutcome::Correlated(final_path)
            }
            Err(err) => {
                let _ = self.registry.mark_uncorrelated(test_identity);
                self.log.log_error(
                    operation,
                    test_identity,
                    started,
                    &err,
                    Some(serde_json::json!({
                        "output_dir": record.output_dir.display().to_string(),
                    })),
                );
                uncorrelated(&err)
            }
        }
    }

    fn correlate_and_place(&self, record: &ExecutionRecord) -> Result<PathBuf> {
        let claimed = self.registry.claimed_paths()?;
        let candidate = correlate(
            record,
            &self.scanner,
            self.config.clock_skew_tolerance(),
            &claimed,
        )?
        .ok_or_else(|| {
            ReelError::CorrelationMiss(format!(
                "no .{} artifact in {} created after {}",
                self.scanner.extension(),
                record.output_dir.display(),
                record.start_time.to_rfc3339(),
            ))
        })?;
        place(
            &candidate.path,
            &record.target_dir,
            &resolve_name(&record.display_name),
            self.scanner.extension(),
        )
    }

    fn log_skip(&self, operation: &str, test_identity: &str, started: Instant, reason: &str) {
        self.log.log_status(
            operation,
            STATUS_SKIPPED,
            test_identity,
            started,
            None,
            Some(serde_json::json!({ "reason": reason })),
        );
    }
}

fn uncorrelated(err: &ReelError) -> CompletionOutcome {
    CompletionOutcome::Uncorrelated {
        code: err.code(),
        message: err.to_string(),
    }
}
