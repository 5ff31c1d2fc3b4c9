//! Event Logger - persists events to a JSONL file
//!
//! The EventLogger subscribes to the EventBus and appends every event,
//! timestamped, to one JSONL file for history and debugging.

use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use eyre::{Context, Result};
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

use super::bus::EventBus;
use super::types::{EventLogEntry, SchedulerEvent};

/// Event logger that appends events to a single JSONL file
pub struct EventLogger {
    path: PathBuf,
    writer: BufWriter<File>,
}

impl EventLogger {
    /// Open (or create) the log file, creating parent directories
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        debug!(?path, "EventLogger::open: called");
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).context(format!("Failed to create {}", parent.display()))?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .context(format!("Failed to open event log {}", path.display()))?;
        Ok(Self {
            path,
            writer: BufWriter::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one event as a JSON line
    pub fn write_event(&mut self, event: &SchedulerEvent) -> Result<()> {
        debug!(id = %event.request_id(), event_type = event.event_type(), "EventLogger::write_event");
        let entry = EventLogEntry::new(event.clone());
        let json = serde_json::to_string(&entry)?;
        writeln!(self.writer, "{}", json)?;
        self.writer.flush()?;
        Ok(())
    }

    /// Consume events from the bus until every sender is gone
    ///
    /// The receiver is taken up front so no event published after spawning
    /// is missed.
    pub async fn run(mut self, mut rx: broadcast::Receiver<SchedulerEvent>) {
        debug!(path = ?self.path, "EventLogger::run: starting event logger");
        loop {
            match rx.recv().await {
                Ok(event) => {
                    log_event(&event);
                    if let Err(e) = self.write_event(&event) {
                        error!(id = %event.request_id(), error = %e, "EventLogger: failed to write event");
                    }
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!(missed = n, "EventLogger: lagged behind, missed events");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    debug!("EventLogger: channel closed, shutting down");
                    break;
                }
            }
        }
        let _ = self.writer.flush();
    }
}

fn log_event(event: &SchedulerEvent) {
    let request = event.request();
    match event {
        SchedulerEvent::Submitted { .. } => {
            info!(id = %request.id, work_type = %request.work_type, "{} submitted", request.name)
        }
        SchedulerEvent::Started { .. } => {
            info!(id = %request.id, work_type = %request.work_type, "{} started", request.name)
        }
        SchedulerEvent::Completed { elapsed_ms, .. } => {
            info!(id = %request.id, elapsed_ms, "{} completed", request.name)
        }
        SchedulerEvent::Failed { stage, error, .. } => {
            warn!(id = %request.id, %stage, %error, "{} failed", request.name)
        }
        SchedulerEvent::Cancelled { was_running, .. } => {
            info!(id = %request.id, was_running, "{} cancelled", request.name)
        }
    }
}

/// Read every entry back from a JSONL event log
pub fn read_events(path: impl AsRef<Path>) -> Result<Vec<EventLogEntry>> {
    let path = path.as_ref();
    debug!(?path, "read_events: reading log file");

    if !path.exists() {
        return Ok(Vec::new());
    }

    let content = fs::read_to_string(path)?;
    let mut entries = Vec::new();
    for line in content.lines() {
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<EventLogEntry>(line) {
            Ok(entry) => entries.push(entry),
            Err(e) => {
                warn!(line, error = %e, "read_events: failed to parse line");
            }
        }
    }

    debug!(count = entries.len(), "read_events: loaded entries");
    Ok(entries)
}

/// Spawn the event logger as a background task
pub fn spawn_event_logger(bus: &EventBus, path: impl AsRef<Path>) -> Result<tokio::task::JoinHandle<()>> {
    let logger = EventLogger::open(path)?;
    let rx = bus.subscribe();
    Ok(tokio::spawn(async move {
        logger.run(rx).await;
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Request, RequestId, WorkType};
    use tempfile::tempdir;

    fn started(id: u64) -> SchedulerEvent {
        SchedulerEvent::Started {
            request: Request::new(RequestId(id), WorkType::Kai),
        }
    }

    #[test]
    fn test_write_and_read_events() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("nested").join("events.jsonl");
        let mut logger = EventLogger::open(&path).unwrap();

        logger.write_event(&started(0)).unwrap();
        logger.write_event(&started(1)).unwrap();

        let entries = read_events(&path).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].event.request_id(), RequestId(0));
        assert_eq!(entries[1].event.request_id(), RequestId(1));
    }

    #[test]
    fn test_read_missing_file() {
        let temp = tempdir().unwrap();
        let entries = read_events(temp.path().join("absent.jsonl")).unwrap();
        assert!(entries.is_empty());
    }

    #[test]
    fn test_read_skips_malformed_lines() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("events.jsonl");
        let mut logger = EventLogger::open(&path).unwrap();
        logger.write_event(&started(3)).unwrap();
        drop(logger);

        let mut content = fs::read_to_string(&path).unwrap();
        content.push_str("not json\n\n");
        fs::write(&path, content).unwrap();

        let entries = read_events(&path).unwrap();
        assert_eq!(entries.len(), 1);
    }

    #[tokio::test]
    async fn test_logger_run_until_bus_dropped() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("events.jsonl");
        let bus = EventBus::new(16);
        let handle = spawn_event_logger(&bus, &path).unwrap();

        bus.emit(started(0));
        bus.emit(SchedulerEvent::Completed {
            request: Request::new(RequestId(0), WorkType::Kai),
            elapsed_ms: 5,
        });
        drop(bus);
        handle.await.unwrap();

        let entries = read_events(&path).unwrap();
        let types: Vec<_> = entries.iter().map(|e| e.event.event_type()).collect();
        assert_eq!(types, vec!["Started", "Completed"]);
    }
}
