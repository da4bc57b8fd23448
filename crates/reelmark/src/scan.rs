use std::fs::Metadata;
use std::path::Path;

use chrono::{DateTime, Utc};
use globset::{GlobBuilder, GlobMatcher};
use walkdir::WalkDir;

use crate::error::{ReelError, Result};
use crate::models::CandidateArtifact;

/// Lists recorder artifacts in a single directory level.
#[derive(Debug, Clone)]
pub struct ArtifactScanner {
    extension: String,
    matcher: GlobMatcher,
}

impl ArtifactScanner {
    pub fn new(extension: &str) -> Result<Self> {
        let glob = GlobBuilder::new(&format!("*.{extension}"))
            .case_insensitive(true)
            .literal_separator(true)
            .build()?;
        Ok(Self {
            extension: extension.to_string(),
            matcher: glob.compile_matcher(),
        })
    }

    #[must_use]
    pub fn extension(&self) -> &str {
        &self.extension
    }

    #[must_use]
    pub fn matches(&self, file_name: &str) -> bool {
        self.matcher.is_match(file_name)
    }

    /// Missing directories and unreadable entries yield nothing rather than an error.
    pub fn list(&self, dir: &Path) -> Result<Vec<CandidateArtifact>> {
        if !dir.is_dir() {
            return Ok(Vec::new());
        }

        let mut out = Vec::new();
        for entry in WalkDir::new(dir).min_depth(1).max_depth(1) {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) if err.depth() == 0 => {
                    return Err(ReelError::Io(std::io::Error::from(err)));
                }
                Err(_) => continue,
            };
            if !entry.file_type().is_file() {
                continue;
            }
            let Some(name) = entry.file_name().to_str() else {
                continue;
            };
            if !self.matches(name) {
                continue;
            }
            let Ok(metadata) = entry.metadata() else {
                continue;
            };
            let Some(created_at) = creation_time(&metadata) else {
                continue;
            };
            out.push(CandidateArtifact {
                path: entry.into_path(),
                created_at,
            });
        }

        out.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.path.cmp(&b.path))
        });
        Ok(out)
    }
}

/// Birth time where the filesystem records it, otherwise the last modification.
fn creation_time(metadata: &Metadata) -> Option<DateTime<Utc>> {
    metadata
        .created()
        .or_else(|_| metadata.modified())
        .ok()
        .map(DateTime::<Utc>::from)
}
