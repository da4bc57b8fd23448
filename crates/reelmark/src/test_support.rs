use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::{ReelError, Result};
use crate::recorder::{Recorder, Recording, RecordingRequest};

#[derive(Debug, Default)]
struct ScriptState {
    fail_start: HashSet<String>,
    fail_close: HashSet<String>,
    skip_flush: HashSet<String>,
    started: HashMap<String, (DateTime<Utc>, PathBuf)>,
    flushed: HashMap<String, Vec<PathBuf>>,
    starts: usize,
}

/// In-process stand-in for the recording subsystem: on close it writes one
/// randomly named artifact into the requested directory.
#[derive(Debug, Clone)]
pub(crate) struct ScriptedRecorder {
    extension: String,
    state: Arc<Mutex<ScriptState>>,
}

impl ScriptedRecorder {
    pub(crate) fn new(extension: &str) -> Self {
        Self {
            extension: extension.to_string(),
            state: Arc::new(Mutex::new(ScriptState::default())),
        }
    }

    fn with_state<T>(&self, f: impl FnOnce(&mut ScriptState) -> T) -> T {
        let mut state = self.state.lock().expect("script state");
        f(&mut state)
    }

    pub(crate) fn fail_start(&self, identity: &str) {
        self.with_state(|s| s.fail_start.insert(identity.to_string()));
    }

    /// Close reports an error even though the artifact was flushed.
    pub(crate) fn fail_close(&self, identity: &str) {
        self.with_state(|s| s.fail_close.insert(identity.to_string()));
    }

    pub(crate) fn skip_flush(&self, identity: &str) {
        self.with_state(|s| s.skip_flush.insert(identity.to_string()));
    }

    pub(crate) fn started_at(&self, identity: &str) -> Option<DateTime<Utc>> {
        self.with_state(|s| s.started.get(identity).map(|(at, _)| *at))
    }

    pub(crate) fn requested_dir(&self, identity: &str) -> Option<PathBuf> {
        self.with_state(|s| s.started.get(identity).map(|(_, dir)| dir.clone()))
    }

    pub(crate) fn start_count(&self) -> usize {
        self.with_state(|s| s.starts)
    }

    pub(crate) fn flushed(&self, identity: &str) -> Vec<PathBuf> {
        self.with_state(|s| s.flushed.get(identity).cloned().unwrap_or_default())
    }
}

impl Recorder for ScriptedRecorder {
    fn start(&self, request: &RecordingRequest) -> Result<Box<dyn Recording>> {
        let identity = request.test_identity.clone();
        let refused = self.with_state(|s| {
            if s.fail_start.contains(&identity) {
                return true;
            }
            s.starts += 1;
            s.started
                .insert(identity.clone(), (Utc::now(), request.output_dir.clone()));
            false
        });
        if refused {
            return Err(ReelError::Internal(format!("scripted start failure: {identity}")));
        }
        Ok(Box::new(ScriptedRecording {
            identity,
            output_dir: request.output_dir.clone(),
            extension: self.extension.clone(),
            state: Arc::clone(&self.state),
        }))
    }
}

struct ScriptedRecording {
    identity: String,
    output_dir: PathBuf,
    extension: String,
    state: Arc<Mutex<ScriptState>>,
}

impl Recording for ScriptedRecording {
    fn close(&mut self) -> Result<()> {
        let mut state = self.state.lock().expect("script state");
        if !state.skip_flush.contains(&self.identity) {
            let path = self
                .output_dir
                .join(format!("{}.{}", Uuid::new_v4().simple(), self.extension));
            fs::write(&path, self.identity.as_bytes())?;
            state
                .flushed
                .entry(self.identity.clone())
                .or_default()
                .push(path);
        }
        if state.fail_close.contains(&self.identity) {
            return Err(ReelError::Internal(format!(
                "scripted close failure: {}",
                self.identity
            )));
        }
        Ok(())
    }
}
