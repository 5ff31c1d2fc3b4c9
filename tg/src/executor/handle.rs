//! Execution handles and completion signals

use tokio::task::AbortHandle;

use super::ExecutorError;
use crate::domain::RequestId;

/// Cancelable handle to a started unit of work
#[derive(Debug)]
pub struct ExecutionHandle {
    abort: AbortHandle,
}

impl ExecutionHandle {
    pub fn new(abort: AbortHandle) -> Self {
        Self { abort }
    }

    /// Request cancellation of the unit
    ///
    /// Safe to call after the unit has finished or more than once.
    pub fn cancel(&self) {
        self.abort.abort();
    }
}

/// Sent exactly once by every unit that runs to the end of `execute`
#[derive(Debug)]
pub struct Completion {
    pub id: RequestId,
    pub outcome: Result<(), ExecutorError>,
}

impl Completion {
    pub fn succeeded(&self) -> bool {
        self.outcome.is_ok()
    }
}
