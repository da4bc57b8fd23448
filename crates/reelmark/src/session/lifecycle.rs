use std::thread;
use std::time::Instant;

use crate::error::Result;
use crate::event_log::STATUS_OK;
use crate::factory::ExecutionContext;

use super::{CaptureSession, CompletionOutcome};

impl CaptureSession {
    pub fn setup(&self, test_identity: &str) -> Result<ExecutionContext> {
        self.setup_inner(test_identity, None)
    }

    /// Like `setup`, but names the artifact after `display_name` rather than
    /// the registry key.
    pub fn setup_named(&self, test_identity: &str, display_name: &str) -> Result<ExecutionContext> {
        self.setup_inner(test_identity, Some(display_name))
    }

    fn setup_inner(&self, test_identity: &str, display_name: Option<&str>) -> Result<ExecutionContext> {
        let started = Instant::now();
        match self
            .factory
            .create(&self.registry, test_identity, display_name)
        {
            Ok((record, context)) => {
                self.log.log_status(
                    "setup",
                    STATUS_OK,
                    test_identity,
                    started,
                    None,
                    Some(serde_json::json!({
                        "start_time": record.start_time.to_rfc3339(),
                        "output_dir": record.output_dir.display().to_string(),
                        "isolation": self.config.isolation.as_str(),
                    })),
                );
                Ok(context)
            }
            Err(err) => {
                self.log
                    .log_error("setup", test_identity, started, &err, None);
                Err(err)
            }
        }
    }

    /// Primary teardown path: close the context, wait out the recorder's
    /// flush, then correlate. A failed close is logged and left to `complete`.
    pub fn teardown(&self, mut context: ExecutionContext) -> CompletionOutcome {
        let started = Instant::now();
        let test_identity = context.test_identity().to_string();
        if let Err(err) = context.close() {
            self.log.log_error(
                "teardown",
                &test_identity,
                started,
                &err,
                Some(serde_json::json!({ "phase": "close" })),
            );
            return CompletionOutcome::ContextCloseFailed(err.to_string());
        }

        let grace = self.config.flush_grace();
        if !grace.is_zero() {
            thread::sleep(grace);
        }
        self.log.log_status(
            "teardown",
            STATUS_OK,
            &test_identity,
            started,
            None,
            Some(serde_json::json!({ "flush_grace_ms": self.config.flush_grace_ms })),
        );
        self.finalize("teardown_correlate", &test_identity)
    }
}
