//! Registry of requests that are currently executing

use std::collections::BTreeMap;
use std::time::Instant;

use crate::domain::{Request, RequestId, WorkType};
use crate::executor::ExecutionHandle;

/// A request that has been handed to its executor
#[derive(Debug)]
pub struct RunningTask {
    pub request: Request,
    pub handle: ExecutionHandle,
    pub started_at: Instant,
}

impl RunningTask {
    pub fn work_type(&self) -> WorkType {
        self.request.work_type
    }
}

/// Map from request id to its running handle
///
/// This is the source of truth for "is this request still live": a
/// completion or cancellation for an id that is not here is ignored.
#[derive(Debug, Default)]
pub struct TaskRegistry {
    tasks: BTreeMap<RequestId, RunningTask>,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a started request; returns the entry it replaced, if any
    pub fn insert(&mut self, request: Request, handle: ExecutionHandle) -> Option<RunningTask> {
        let id = request.id;
        self.tasks.insert(
            id,
            RunningTask {
                request,
                handle,
                started_at: Instant::now(),
            },
        )
    }

    pub fn remove(&mut self, id: RequestId) -> Option<RunningTask> {
        self.tasks.remove(&id)
    }

    pub fn contains(&self, id: RequestId) -> bool {
        self.tasks.contains_key(&id)
    }

    /// Running ids in ascending order
    pub fn list_ids(&self) -> Vec<RequestId> {
        self.tasks.keys().copied().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &RunningTask> {
        self.tasks.values()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Remove every entry, in id order
    pub fn drain(&mut self) -> Vec<RunningTask> {
        std::mem::take(&mut self.tasks).into_values().collect()
    }
}
