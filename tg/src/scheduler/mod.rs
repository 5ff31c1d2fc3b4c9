//! Task admission scheduler
//!
//! Requests wait in a FIFO queue and are admitted per work type against a
//! fixed concurrency limit. [`SchedulerCore`] holds the state and the
//! admission rules; [`ProcessController`] runs it as an actor and talks to
//! the executors, the event bus, and the host through [`SchedulerHandle`].

mod config;
mod controller;
mod core;
mod messages;
mod queue;
mod registry;

pub use config::{DEFAULT_MAX_WORKERS, SchedulerConfig};
pub use controller::{ProcessController, SchedulerHandle};
pub use core::{CancelOutcome, DispatchReport, FinishedTask, SchedulerCore};
pub use messages::{SchedulerCommand, SchedulerError};
pub use queue::{QueueSnapshot, RequestQueue, RunningEntry, SchedulerStats};
pub use registry::{RunningTask, TaskRegistry};
