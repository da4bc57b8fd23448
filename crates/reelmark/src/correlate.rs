//! Attributes recorder artifacts to executions by creation time.
//!
//! The recorder gives no identifier linking a file to the context that wrote
//! it, so attribution uses the window `[start_time - tolerance, ..)` and takes
//! the newest file inside it.
//!
//! Precondition: with a shared output directory this is only correct while
//! executions writing into that directory are serialized. Two overlapping
//! executions can swap artifacts. `OutputIsolation::PerExecution` gives each
//! execution its own directory and removes the hazard.

use std::path::PathBuf;

use chrono::{DateTime, Duration, Utc};

use crate::error::Result;
use crate::models::{CandidateArtifact, ExecutionRecord};
use crate::scan::ArtifactScanner;

pub fn correlate(
    record: &ExecutionRecord,
    scanner: &ArtifactScanner,
    tolerance: Duration,
    claimed: &[PathBuf],
) -> Result<Option<CandidateArtifact>> {
    let candidates = scanner.list(&record.output_dir)?;
    Ok(select_latest(candidates, record.start_time, tolerance, claimed))
}

/// Newest candidate created no earlier than `start_time - tolerance`,
/// skipping paths already placed for another execution.
#[must_use]
pub fn select_latest(
    candidates: Vec<CandidateArtifact>,
    start_time: DateTime<Utc>,
    tolerance: Duration,
    claimed: &[PathBuf],
) -> Option<CandidateArtifact> {
    let window_start = start_time
        .checked_sub_signed(tolerance)
        .unwrap_or(DateTime::<Utc>::MIN_UTC);
    candidates
        .into_iter()
        .filter(|candidate| candidate.created_at >= window_start)
        .filter(|candidate| !claimed.contains(&candidate.path))
        .max_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.path.cmp(&b.path))
        })
}
