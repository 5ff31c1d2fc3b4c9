//! Pending request queue and the types used to report on it

use std::collections::VecDeque;
use std::time::Duration;

use serde::Serialize;

use crate::domain::{Request, RequestId, WorkType};

/// Ordered store of requests waiting for a worker slot
///
/// Arrival order is preserved; there is no capacity limit.
#[derive(Debug, Default)]
pub struct RequestQueue {
    entries: VecDeque<Request>,
}

impl RequestQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a request to the tail
    pub fn enqueue(&mut self, request: Request) {
        self.entries.push_back(request);
    }

    /// Pending requests in arrival order
    pub fn list(&self) -> Vec<Request> {
        self.entries.iter().cloned().collect()
    }

    /// Remove the entry with `id`, if any
    pub fn remove_by_id(&mut self, id: RequestId) -> Option<Request> {
        let pos = self.entries.iter().position(|r| r.id == id)?;
        self.entries.remove(pos)
    }

    pub fn contains(&self, id: RequestId) -> bool {
        self.entries.iter().any(|r| r.id == id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop every pending request, returning them in arrival order
    pub fn drain(&mut self) -> Vec<Request> {
        self.entries.drain(..).collect()
    }
}

/// Statistics for the scheduler
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct SchedulerStats {
    pub total_submitted: u64,
    pub total_started: u64,
    pub total_completed: u64,
    pub total_failed: u64,
    pub total_cancelled: u64,
    pub peak_queue_depth: usize,
    pub peak_active: Vec<(WorkType, usize)>,
}

impl SchedulerStats {
    pub(crate) fn record_active(&mut self, work_type: WorkType, active: usize) {
        match self.peak_active.iter_mut().find(|(t, _)| *t == work_type) {
            Some((_, peak)) => *peak = (*peak).max(active),
            None => {
                self.peak_active.push((work_type, active));
                self.peak_active.sort();
            }
        }
    }

    /// Highest number of simultaneously running requests seen for a type
    pub fn peak_active_for(&self, work_type: WorkType) -> usize {
        self.peak_active
            .iter()
            .find(|(t, _)| *t == work_type)
            .map(|(_, peak)| *peak)
            .unwrap_or(0)
    }
}

/// A running request as reported to the host
#[derive(Debug, Clone)]
pub struct RunningEntry {
    pub request: Request,
    pub elapsed: Duration,
}

/// Point-in-time view of the scheduler for host display and pickers
#[derive(Debug, Clone, Default)]
pub struct QueueSnapshot {
    /// Queued requests in arrival order
    pub queued: Vec<Request>,

    /// Running requests in id order
    pub running: Vec<RunningEntry>,

    /// Active count per type
    pub active: Vec<(WorkType, usize)>,

    pub stats: SchedulerStats,
}

impl QueueSnapshot {
    /// Ids a host may offer for cancellation: running first, then queued
    pub fn cancellable_ids(&self) -> Vec<RequestId> {
        self.running
            .iter()
            .map(|e| e.request.id)
            .chain(self.queued.iter().map(|r| r.id))
            .collect()
    }

    pub fn active_for(&self, work_type: WorkType) -> usize {
        self.active
            .iter()
            .find(|(t, _)| *t == work_type)
            .map(|(_, n)| *n)
            .unwrap_or(0)
    }

    /// True when nothing is queued or running
    pub fn is_idle(&self) -> bool {
        self.queued.is_empty() && self.running.is_empty()
    }
}
