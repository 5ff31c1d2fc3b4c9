//! Scheduler controller messages
//!
//! Commands and responses for the actor pattern.

use thiserror::Error;
use tokio::sync::oneshot;

use super::core::CancelOutcome;
use super::queue::QueueSnapshot;
use crate::domain::{Request, RequestId, WorkType};

/// Errors a host can see from the scheduler
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SchedulerError {
    #[error("Scheduler is not running")]
    Closed,
}

/// Commands sent to the ProcessController actor
#[derive(Debug)]
pub enum SchedulerCommand {
    Submit {
        work_type: WorkType,
        reply: oneshot::Sender<Request>,
    },
    Cancel {
        id: RequestId,
        reply: oneshot::Sender<CancelOutcome>,
    },
    Snapshot {
        reply: oneshot::Sender<QueueSnapshot>,
    },
    /// Run a dispatch pass now; replies once it is applied
    Dispatch {
        reply: oneshot::Sender<()>,
    },
    /// Cancel everything and stop the controller
    Shutdown {
        reply: oneshot::Sender<()>,
    },
}
