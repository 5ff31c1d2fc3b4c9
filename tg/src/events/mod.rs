//! Scheduler event stream
//!
//! The controller publishes a [`SchedulerEvent`] for every request
//! transition on an [`EventBus`]. Consumers subscribe independently: the
//! console prints them, the [`EventLogger`] appends them to a JSONL file.
//!
//! ```text
//!   ProcessController ──emit──▶ EventBus (broadcast)
//!                                  │
//!                    ┌─────────────┼──────────────┐
//!                    ▼             ▼              ▼
//!                 console      EventLogger      tests
//!                              events.jsonl
//! ```

mod bus;
mod logger;
mod types;

pub use bus::{DEFAULT_CHANNEL_CAPACITY, EventBus};
pub use logger::{EventLogger, read_events, spawn_event_logger};
pub use types::{EventLogEntry, FailureStage, SchedulerEvent};
