//! Scheduler state machine
//!
//! `SchedulerCore` owns every piece of mutable scheduling state: the id
//! counter, the pending queue, the running registry, and the per-type active
//! sets. It is synchronous and single-owner; the [`ProcessController`]
//! serializes all access to it.
//!
//! [`ProcessController`]: super::ProcessController

use std::collections::{BTreeMap, BTreeSet};
use std::time::{Duration, Instant};

use tracing::debug;

use super::config::SchedulerConfig;
use super::queue::{QueueSnapshot, RequestQueue, RunningEntry, SchedulerStats};
use super::registry::TaskRegistry;
use crate::domain::{IdCounter, Request, RequestId, WorkType};
use crate::executor::{ExecutionHandle, ExecutorError};

/// Result of one dispatch pass
#[derive(Debug, Default)]
pub struct DispatchReport {
    /// Admitted and handed to their executor, in admission order
    pub started: Vec<Request>,

    /// Admitted but refused by their executor; their slots are already free
    pub failed: Vec<(Request, ExecutorError)>,
}

impl DispatchReport {
    pub fn is_empty(&self) -> bool {
        self.started.is_empty() && self.failed.is_empty()
    }

    /// A start failure freed a slot that this pass could not reuse
    pub fn needs_redispatch(&self) -> bool {
        !self.failed.is_empty()
    }
}

/// What a cancellation found
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CancelOutcome {
    /// The request was running; its handle was cancelled
    Running(Request),
    /// The request was still queued and has been removed
    Dequeued(Request),
    /// Already finished, already cancelled, or never submitted
    NotFound,
}

/// A request that left the running state through its executor
#[derive(Debug, Clone)]
pub struct FinishedTask {
    pub request: Request,
    pub elapsed: Duration,
}

/// Single-owner scheduling state
#[derive(Debug)]
pub struct SchedulerCore {
    config: SchedulerConfig,
    counter: IdCounter,
    queue: RequestQueue,
    registry: TaskRegistry,
    active: BTreeMap<WorkType, BTreeSet<RequestId>>,
    stats: SchedulerStats,
}

impl SchedulerCore {
    pub fn new(config: SchedulerConfig) -> Self {
        debug!(?config, "SchedulerCore::new: called");
        Self {
            config,
            counter: IdCounter::new(),
            queue: RequestQueue::new(),
            registry: TaskRegistry::new(),
            active: BTreeMap::new(),
            stats: SchedulerStats::default(),
        }
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Allocate the next id and queue a new request
    pub fn submit(&mut self, work_type: WorkType) -> Request {
        let request = Request::new(self.counter.next_id(), work_type);
        debug!(id = %request.id, %work_type, "SchedulerCore::submit: queued");
        self.queue.enqueue(request.clone());
        self.stats.total_submitted += 1;
        self.stats.peak_queue_depth = self.stats.peak_queue_depth.max(self.queue.len());
        request
    }

    /// Admit as many queued requests as capacity allows
    ///
    /// Decisions are taken against a snapshot of the queue in arrival order,
    /// counting admissions already made in this pass. A saturated type is
    /// skipped without blocking later requests of other types. Admissions are
    /// applied afterwards; `start` is called once per admitted request and
    /// must not block.
    pub fn dispatch<F>(&mut self, mut start: F) -> DispatchReport
    where
        F: FnMut(&Request) -> Result<ExecutionHandle, ExecutorError>,
    {
        let snapshot = self.queue.list();
        let mut planned: BTreeMap<WorkType, usize> = BTreeMap::new();
        let mut admitted = Vec::new();

        for request in &snapshot {
            let limit = self.config.limit_for(request.work_type);
            let count = planned
                .entry(request.work_type)
                .or_insert_with(|| self.active_count(request.work_type));
            if *count < limit {
                *count += 1;
                admitted.push(request.id);
            }
        }
        debug!(
            queued = snapshot.len(),
            admitted = admitted.len(),
            "SchedulerCore::dispatch: decided"
        );

        let mut report = DispatchReport::default();
        for id in admitted {
            // Removed since the snapshot was taken; never resurrect it
            let Some(request) = self.queue.remove_by_id(id) else {
                debug!(%id, "SchedulerCore::dispatch: no longer queued, skipping");
                continue;
            };
            let work_type = request.work_type;
            self.active.entry(work_type).or_default().insert(id);

            match start(&request) {
                Ok(handle) => {
                    self.registry.insert(request.clone(), handle);
                    self.stats.total_started += 1;
                    let active = self.active_count(work_type);
                    self.stats.record_active(work_type, active);
                    debug!(%id, %work_type, active, "SchedulerCore::dispatch: started");
                    report.started.push(request);
                }
                Err(error) => {
                    self.release(work_type, id);
                    self.stats.total_failed += 1;
                    debug!(%id, %work_type, %error, "SchedulerCore::dispatch: start failed, slot released");
                    report.failed.push((request, error));
                }
            }
        }

        report
    }

    /// Record that a running request finished
    ///
    /// Returns `None` when the id is not running, which makes duplicate or
    /// late completions (for example after a cancellation) a no-op.
    pub fn complete_task(&mut self, id: RequestId, succeeded: bool) -> Option<FinishedTask> {
        let Some(task) = self.registry.remove(id) else {
            debug!(%id, "SchedulerCore::complete_task: not running, ignoring");
            return None;
        };
        self.release(task.work_type(), id);
        if succeeded {
            self.stats.total_completed += 1;
        } else {
            self.stats.total_failed += 1;
        }
        debug!(%id, succeeded, "SchedulerCore::complete_task: slot released");
        Some(FinishedTask {
            elapsed: task.started_at.elapsed(),
            request: task.request,
        })
    }

    /// Cancel a running or queued request
    pub fn cancel_task(&mut self, id: RequestId) -> CancelOutcome {
        if let Some(task) = self.registry.remove(id) {
            task.handle.cancel();
            self.release(task.work_type(), id);
            self.stats.total_cancelled += 1;
            debug!(%id, "SchedulerCore::cancel_task: cancelled running task");
            return CancelOutcome::Running(task.request);
        }

        if let Some(request) = self.queue.remove_by_id(id) {
            self.stats.total_cancelled += 1;
            debug!(%id, "SchedulerCore::cancel_task: removed from queue");
            return CancelOutcome::Dequeued(request);
        }

        debug!(%id, "SchedulerCore::cancel_task: not found");
        CancelOutcome::NotFound
    }

    /// Cancel everything running and drop the queue
    ///
    /// Returns (cancelled running requests, discarded queued requests).
    pub fn shutdown(&mut self) -> (Vec<Request>, Vec<Request>) {
        let running: Vec<Request> = self
            .registry
            .drain()
            .into_iter()
            .map(|task| {
                task.handle.cancel();
                task.request
            })
            .collect();
        self.active.clear();
        let queued = self.queue.drain();
        self.stats.total_cancelled += (running.len() + queued.len()) as u64;
        debug!(running = running.len(), queued = queued.len(), "SchedulerCore::shutdown: done");
        (running, queued)
    }

    fn release(&mut self, work_type: WorkType, id: RequestId) {
        if let Some(set) = self.active.get_mut(&work_type) {
            set.remove(&id);
        }
    }

    pub fn active_count(&self, work_type: WorkType) -> usize {
        self.active.get(&work_type).map(|s| s.len()).unwrap_or(0)
    }

    pub fn is_queued(&self, id: RequestId) -> bool {
        self.queue.contains(id)
    }

    pub fn is_running(&self, id: RequestId) -> bool {
        self.registry.contains(id)
    }

    pub fn queue(&self) -> &RequestQueue {
        &self.queue
    }

    pub fn registry(&self) -> &TaskRegistry {
        &self.registry
    }

    pub fn stats(&self) -> &SchedulerStats {
        &self.stats
    }

    /// Point-in-time view for the host
    pub fn snapshot(&self) -> QueueSnapshot {
        let now = Instant::now();
        QueueSnapshot {
            queued: self.queue.list(),
            running: self
                .registry
                .iter()
                .map(|task| RunningEntry {
                    request: task.request.clone(),
                    elapsed: now.saturating_duration_since(task.started_at),
                })
                .collect(),
            active: WorkType::ALL.iter().map(|t| (*t, self.active_count(*t))).collect(),
            stats: self.stats.clone(),
        }
    }
}
