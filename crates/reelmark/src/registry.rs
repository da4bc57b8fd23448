use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard};

use crate::error::{ReelError, Result};
use crate::models::{CorrelationState, ExecutionRecord, SessionSummary};

/// Result of trying to take ownership of a record's correlate-and-place step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Claim {
    Claimed(ExecutionRecord),
    NotRegistered,
    AlreadyCorrelated(ExecutionRecord),
    InProgress,
}

/// Session-scoped map from test identity to its execution record.
///
/// Callers only ever get clones; the lock is released before any
/// filesystem work happens.
#[derive(Debug, Default)]
pub struct ExecutionRegistry {
    records: Mutex<HashMap<String, ExecutionRecord>>,
}

impl ExecutionRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn guard(&self) -> Result<MutexGuard<'_, HashMap<String, ExecutionRecord>>> {
        self.records
            .lock()
            .map_err(|_| ReelError::Internal("execution registry mutex poisoned".to_string()))
    }

    pub fn register(&self, record: ExecutionRecord) -> Result<()> {
        let mut records = self.guard()?;
        match records.entry(record.test_identity.clone()) {
            Entry::Occupied(_) => Err(ReelError::Setup(format!(
                "test identity already registered in this session: {}",
                record.test_identity
            ))),
            Entry::Vacant(slot) => {
                slot.insert(record);
                Ok(())
            }
        }
    }

    pub fn get(&self, test_identity: &str) -> Result<Option<ExecutionRecord>> {
        Ok(self.guard()?.get(test_identity).cloned())
    }

    pub fn claim(&self, test_identity: &str) -> Result<Claim> {
        let mut records = self.guard()?;
        let Some(record) = records.get_mut(test_identity) else {
            return Ok(Claim::NotRegistered);
        };
        match record.state {
            CorrelationState::Correlated => Ok(Claim::AlreadyCorrelated(record.clone())),
            CorrelationState::Correlating => Ok(Claim::InProgress),
            CorrelationState::Created | CorrelationState::Uncorrelated => {
                record.state = CorrelationState::Correlating;
                Ok(Claim::Claimed(record.clone()))
            }
        }
    }

    pub fn mark_correlated(&self, test_identity: &str, final_path: PathBuf) -> Result<()> {
        let mut records = self.guard()?;
        let record = records
            .get_mut(test_identity)
            .ok_or_else(|| ReelError::NotFound(test_identity.to_string()))?;
        record.state = CorrelationState::Correlated;
        record.correlated = true;
        record.final_path = Some(final_path);
        Ok(())
    }

    pub fn mark_uncorrelated(&self, test_identity: &str) -> Result<()> {
        let mut records = self.guard()?;
        let record = records
            .get_mut(test_identity)
            .ok_or_else(|| ReelError::NotFound(test_identity.to_string()))?;
        record.state = CorrelationState::Uncorrelated;
        record.correlated = false;
        Ok(())
    }

    /// Artifacts already placed for some record; never candidates again.
    pub fn claimed_paths(&self) -> Result<Vec<PathBuf>> {
        Ok(self
            .guard()?
            .values()
            .filter_map(|record| record.final_path.clone())
            .collect())
    }

    pub fn records(&self) -> Result<Vec<ExecutionRecord>> {
        let mut out = self.guard()?.values().cloned().collect::<Vec<_>>();
        out.sort_by(|a, b| {
            a.start_time
                .cmp(&b.start_time)
                .then_with(|| a.test_identity.cmp(&b.test_identity))
        });
        Ok(out)
    }

    pub fn summary(&self) -> Result<SessionSummary> {
        let mut summary = SessionSummary::default();
        for record in self.records()? {
            summary.total += 1;
            match record.state {
                CorrelationState::Created => summary.created += 1,
                CorrelationState::Correlating => summary.correlating += 1,
                CorrelationState::Correlated => summary.correlated += 1,
                CorrelationState::Uncorrelated => {
                    summary.uncorrelated += 1;
                    summary.uncorrelated_identities.push(record.test_identity);
                }
            }
        }
        Ok(summary)
    }

    pub fn len(&self) -> Result<usize> {
        Ok(self.guard()?.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.guard()?.is_empty())
    }
}
