use std::panic::{self, AssertUnwindSafe};

use crate::error::Result;
use crate::factory::ExecutionContext;

use super::CaptureSession;

impl CaptureSession {
    /// Runs one test body the way a runner would: setup, body, teardown,
    /// completion hook. A panicking body still gets its artifact placed
    /// before the panic resumes. Only setup can return an error.
    pub fn run<T>(
        &self,
        test_identity: &str,
        body: impl FnOnce(&mut ExecutionContext) -> T,
    ) -> Result<T> {
        let context = self.setup(test_identity)?;
        Ok(self.drive(test_identity, context, body))
    }

    pub fn run_named<T>(
        &self,
        test_identity: &str,
        display_name: &str,
        body: impl FnOnce(&mut ExecutionContext) -> T,
    ) -> Result<T> {
        let context = self.setup_named(test_identity, display_name)?;
        Ok(self.drive(test_identity, context, body))
    }

    fn drive<T>(
        &self,
        test_identity: &str,
        mut context: ExecutionContext,
        body: impl FnOnce(&mut ExecutionContext) -> T,
    ) -> T {
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| body(&mut context)));
        let _ = self.teardown(context);
        let _ = self.complete(test_identity);
        match outcome {
            Ok(value) => value,
            Err(payload) => panic::resume_unwind(payload),
        }
    }
}
