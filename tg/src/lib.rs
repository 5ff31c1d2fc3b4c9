//! taskgate - typed task admission scheduler
//!
//! Requests of a fixed set of work types wait in a FIFO queue and are started
//! through per-type executors, never exceeding each type's concurrency limit.
//!
//! # Modules
//!
//! - [`domain`] - request, id, and work type primitives
//! - [`scheduler`] - queue, running registry, admission core, and controller actor
//! - [`executor`] - executor trait, per-type registry, kai and kantra backends
//! - [`events`] - lifecycle event bus and JSONL event log
//! - [`config`] - configuration types and loading
//! - [`cli`] / [`console`] - command-line and interactive front ends

pub mod cli;
pub mod config;
pub mod console;
pub mod domain;
pub mod events;
pub mod executor;
pub mod scheduler;

pub use config::{Config, EventsConfig, ExecutorsConfig, KaiConfig, KantraConfig};
pub use domain::{ParseWorkTypeError, Request, RequestId, WorkType};
pub use events::{EventBus, EventLogEntry, EventLogger, FailureStage, SchedulerEvent, read_events, spawn_event_logger};
pub use executor::{Completion, ExecutionHandle, Executor, ExecutorError, ExecutorSet, KaiExecutor, KantraExecutor};
pub use scheduler::{
    CancelOutcome, ProcessController, QueueSnapshot, SchedulerConfig, SchedulerCore, SchedulerError, SchedulerHandle,
    SchedulerStats,
};
