//! Integration tests for taskgate
//!
//! These drive a real ProcessController with the kai and kantra executors
//! built from configuration.

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::time::Duration;

use taskgate::config::{Config, ExecutorsConfig, KaiConfig, KantraConfig};
use taskgate::domain::{RequestId, WorkType};
use taskgate::events::{EventBus, FailureStage, SchedulerEvent, read_events, spawn_event_logger};
use taskgate::executor::ExecutorSet;
use taskgate::scheduler::{CancelOutcome, ProcessController, SchedulerConfig, SchedulerHandle};
use tempfile::TempDir;
use tokio::sync::broadcast;

fn executors(kai_ms: u64, kantra: KantraConfig) -> ExecutorSet {
    ExecutorSet::from_config(&ExecutorsConfig {
        kai: KaiConfig {
            simulate_ms: kai_ms,
            ..Default::default()
        },
        kantra,
    })
    .expect("Failed to build executors")
}

fn simulated_kantra(ms: u64) -> KantraConfig {
    KantraConfig {
        simulate_ms: ms,
        ..Default::default()
    }
}

/// Wait for a terminal event for every id in `ids`, returning all events seen
async fn drain_until_done(
    rx: &mut broadcast::Receiver<SchedulerEvent>,
    ids: impl IntoIterator<Item = RequestId>,
) -> Vec<SchedulerEvent> {
    let mut pending: BTreeSet<RequestId> = ids.into_iter().collect();
    let mut events = Vec::new();
    while !pending.is_empty() {
        let event = tokio::time::timeout(Duration::from_secs(10), rx.recv())
            .await
            .expect("Timed out waiting for events")
            .expect("Event bus closed");
        if event.is_terminal() {
            pending.remove(&event.request_id());
        }
        events.push(event);
    }
    events
}

async fn submit_many(handle: &SchedulerHandle, work_type: WorkType, count: usize) -> Vec<RequestId> {
    let mut ids = Vec::new();
    for _ in 0..count {
        ids.push(handle.submit(work_type).await.unwrap().id);
    }
    ids
}

// =============================================================================
// Scheduling
// =============================================================================

#[tokio::test]
async fn test_batch_respects_per_type_limits() {
    let config = SchedulerConfig::with_limits([(WorkType::Kai, 2), (WorkType::Kantra, 1)]);
    let (handle, task) =
        ProcessController::spawn(config, executors(40, simulated_kantra(40)), EventBus::new(256));
    let mut rx = handle.subscribe();

    let mut ids = submit_many(&handle, WorkType::Kai, 5).await;
    ids.extend(submit_many(&handle, WorkType::Kantra, 3).await);

    let events = drain_until_done(&mut rx, ids.clone()).await;
    let completed = events
        .iter()
        .filter(|e| matches!(e, SchedulerEvent::Completed { .. }))
        .count();
    assert_eq!(completed, ids.len());

    let snapshot = handle.snapshot().await.unwrap();
    assert!(snapshot.is_idle());
    assert_eq!(snapshot.stats.total_started, 8);
    assert_eq!(snapshot.stats.peak_active_for(WorkType::Kai), 2);
    assert_eq!(snapshot.stats.peak_active_for(WorkType::Kantra), 1);

    handle.shutdown().await.unwrap();
    tokio::time::timeout(Duration::from_secs(5), task)
        .await
        .expect("Controller should stop")
        .unwrap();
}

#[tokio::test]
async fn test_start_order_is_fifo_per_type() {
    let config = SchedulerConfig::with_limits([(WorkType::Kai, 1), (WorkType::Kantra, 1)]);
    let (handle, _task) =
        ProcessController::spawn(config, executors(10, simulated_kantra(10)), EventBus::new(256));
    let mut rx = handle.subscribe();

    let kai = submit_many(&handle, WorkType::Kai, 3).await;
    let kantra = submit_many(&handle, WorkType::Kantra, 2).await;
    let events = drain_until_done(&mut rx, kai.iter().chain(kantra.iter()).copied()).await;

    let started = |work_type: WorkType| -> Vec<RequestId> {
        events
            .iter()
            .filter_map(|e| match e {
                SchedulerEvent::Started { request } if request.work_type == work_type => Some(request.id),
                _ => None,
            })
            .collect()
    };
    assert_eq!(started(WorkType::Kai), kai);
    assert_eq!(started(WorkType::Kantra), kantra);
}

#[tokio::test]
async fn test_cancel_running_kantra_process() {
    let kantra = KantraConfig {
        binary: Some(PathBuf::from("sh")),
        args: vec!["-c".to_string(), "sleep 30".to_string()],
        simulate_ms: 0,
    };
    let config = SchedulerConfig::with_limits([(WorkType::Kai, 1), (WorkType::Kantra, 1)]);
    let (handle, _task) = ProcessController::spawn(config, executors(10, kantra), EventBus::new(256));

    let first = handle.submit(WorkType::Kantra).await.unwrap();
    let second = handle.submit(WorkType::Kantra).await.unwrap();
    assert!(matches!(handle.cancel(first.id).await.unwrap(), CancelOutcome::Running(_)));

    let snapshot = handle.snapshot().await.unwrap();
    assert_eq!(snapshot.running.len(), 1);
    assert_eq!(snapshot.running[0].request.id, second.id);
    assert!(snapshot.queued.is_empty());

    handle.shutdown().await.unwrap();
}

/// A process counts as gone once it no longer exists or is only a zombie
#[cfg(target_os = "linux")]
fn process_alive(pid: u32) -> bool {
    match std::fs::read_to_string(format!("/proc/{}/stat", pid)) {
        Ok(stat) => stat
            .rsplit_once(')')
            .map(|(_, rest)| !rest.trim_start().starts_with('Z'))
            .unwrap_or(true),
        Err(_) => false,
    }
}

#[cfg(target_os = "linux")]
#[tokio::test]
async fn test_cancel_kills_kantra_child() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let pid_file = temp_dir.path().join("kantra.pid");
    let script = format!(
        "echo $$ > '{0}.tmp' && mv '{0}.tmp' '{0}'; exec sleep 30",
        pid_file.display()
    );
    let kantra = KantraConfig {
        binary: Some(PathBuf::from("sh")),
        args: vec!["-c".to_string(), script],
        simulate_ms: 0,
    };
    let (handle, _task) =
        ProcessController::spawn(SchedulerConfig::default(), executors(10, kantra), EventBus::new(64));

    let request = handle.submit(WorkType::Kantra).await.unwrap();
    let pid: u32 = tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            if let Ok(content) = std::fs::read_to_string(&pid_file) {
                if let Ok(pid) = content.trim().parse::<u32>() {
                    return pid;
                }
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("kantra child should write its pid");
    assert!(process_alive(pid));

    assert!(matches!(handle.cancel(request.id).await.unwrap(), CancelOutcome::Running(_)));

    let gone = tokio::time::timeout(Duration::from_secs(5), async {
        while process_alive(pid) {
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await;
    assert!(gone.is_ok(), "kantra child {} survived cancellation", pid);

    handle.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_missing_kantra_binary_fails_at_start() {
    let kantra = KantraConfig {
        binary: Some(PathBuf::from("/nonexistent/kantra")),
        ..Default::default()
    };
    let (handle, _task) =
        ProcessController::spawn(SchedulerConfig::default(), executors(10, kantra), EventBus::new(256));
    let mut rx = handle.subscribe();

    let kantra_id = handle.submit(WorkType::Kantra).await.unwrap().id;
    let kai_id = handle.submit(WorkType::Kai).await.unwrap().id;
    let events = drain_until_done(&mut rx, [kantra_id, kai_id]).await;

    let failure = events
        .iter()
        .find(|e| e.request_id() == kantra_id && e.is_terminal())
        .unwrap();
    match failure {
        SchedulerEvent::Failed { stage, error, .. } => {
            assert_eq!(*stage, FailureStage::Start);
            assert!(error.contains("/nonexistent/kantra"));
        }
        other => panic!("Expected Failed, got {:?}", other),
    }
    assert!(
        events
            .iter()
            .any(|e| matches!(e, SchedulerEvent::Completed { request, .. } if request.id == kai_id))
    );
}

// =============================================================================
// Event log
// =============================================================================

#[tokio::test]
async fn test_event_log_records_lifecycle() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let log_path = temp_dir.path().join("events.jsonl");

    let bus = EventBus::new(256);
    let logger = spawn_event_logger(&bus, &log_path).unwrap();
    let (handle, task) = ProcessController::spawn(
        SchedulerConfig::default(),
        executors(10, simulated_kantra(10)),
        bus.clone(),
    );
    let mut rx = handle.subscribe();

    let id = handle.submit(WorkType::Kai).await.unwrap().id;
    drain_until_done(&mut rx, [id]).await;

    handle.shutdown().await.unwrap();
    task.await.unwrap();
    drop(rx);
    drop(handle);
    drop(bus);
    tokio::time::timeout(Duration::from_secs(5), logger)
        .await
        .expect("Logger should stop once the bus is gone")
        .unwrap();

    let types: Vec<_> = read_events(&log_path)
        .unwrap()
        .iter()
        .map(|entry| entry.event.event_type())
        .collect();
    assert_eq!(types, vec!["Submitted", "Started", "Completed"]);
}

// =============================================================================
// Configuration
// =============================================================================

#[test]
fn test_config_file_drives_scheduler_limits() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let path = temp_dir.path().join("taskgate.yml");
    std::fs::write(
        &path,
        "scheduler:\n  max-workers:\n    kai: 4\n    kantra: 1\nexecutors:\n  kantra:\n    binary: sh\n",
    )
    .unwrap();

    let config = Config::load(Some(&path)).unwrap();
    config.validate().unwrap();
    assert_eq!(config.scheduler.limit_for(WorkType::Kai), 4);
    assert_eq!(config.scheduler.limit_for(WorkType::Kantra), 1);
    assert_eq!(config.executors.kantra.binary, Some(PathBuf::from("sh")));
    assert!(ExecutorSet::from_config(&config.executors).is_ok());
}
