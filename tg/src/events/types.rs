//! Scheduler lifecycle events
//!
//! Every state transition a request goes through is published as one of
//! these: submitted, started, then exactly one of completed, failed, or
//! cancelled.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{Request, RequestId};

/// Where a failure happened
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailureStage {
    /// The executor refused to start the unit; it never ran
    Start,
    /// The unit ran and reported an error
    Run,
}

impl std::fmt::Display for FailureStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FailureStage::Start => write!(f, "start"),
            FailureStage::Run => write!(f, "run"),
        }
    }
}

/// Core event enum
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum SchedulerEvent {
    /// A request entered the queue
    Submitted { request: Request },
    /// A request was admitted and handed to its executor
    Started { request: Request },
    /// The unit finished successfully
    Completed { request: Request, elapsed_ms: u64 },
    /// The unit could not start, or ran and failed
    Failed {
        request: Request,
        stage: FailureStage,
        error: String,
    },
    /// The request was cancelled by the host or by shutdown
    Cancelled { request: Request, was_running: bool },
}

impl SchedulerEvent {
    pub fn request(&self) -> &Request {
        match self {
            SchedulerEvent::Submitted { request }
            | SchedulerEvent::Started { request }
            | SchedulerEvent::Completed { request, .. }
            | SchedulerEvent::Failed { request, .. }
            | SchedulerEvent::Cancelled { request, .. } => request,
        }
    }

    pub fn request_id(&self) -> RequestId {
        self.request().id
    }

    /// Get the event type name
    pub fn event_type(&self) -> &'static str {
        match self {
            SchedulerEvent::Submitted { .. } => "Submitted",
            SchedulerEvent::Started { .. } => "Started",
            SchedulerEvent::Completed { .. } => "Completed",
            SchedulerEvent::Failed { .. } => "Failed",
            SchedulerEvent::Cancelled { .. } => "Cancelled",
        }
    }

    /// No further events follow for this request
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SchedulerEvent::Completed { .. } | SchedulerEvent::Failed { .. } | SchedulerEvent::Cancelled { .. }
        )
    }
}

/// A timestamped event log entry for file persistence
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EventLogEntry {
    #[serde(rename = "ts")]
    pub timestamp: DateTime<Utc>,
    pub event: SchedulerEvent,
}

impl EventLogEntry {
    /// Create a new log entry with current timestamp
    pub fn new(event: SchedulerEvent) -> Self {
        Self {
            timestamp: Utc::now(),
            event,
        }
    }
}
