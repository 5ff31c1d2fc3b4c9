//! Per-type executor registry and the start hand-off

use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use super::{Completion, ExecutionHandle, Executor, ExecutorError, KaiExecutor, KantraExecutor};
use crate::config::ExecutorsConfig;
use crate::domain::{Request, WorkType};

/// Executors keyed by the work type they serve
#[derive(Clone, Default)]
pub struct ExecutorSet {
    executors: HashMap<WorkType, Arc<dyn Executor>>,
}

impl ExecutorSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the reference kai and kantra executors from config
    pub fn from_config(config: &ExecutorsConfig) -> Result<Self, ExecutorError> {
        debug!(?config, "ExecutorSet::from_config: called");
        let mut set = Self::new();
        set.register(WorkType::Kai, Arc::new(KaiExecutor::from_config(&config.kai)?));
        set.register(WorkType::Kantra, Arc::new(KantraExecutor::from_config(&config.kantra)));
        Ok(set)
    }

    /// Register (or replace) the executor for a type
    pub fn register(&mut self, work_type: WorkType, executor: Arc<dyn Executor>) {
        debug!(%work_type, executor = executor.name(), "ExecutorSet::register");
        self.executors.insert(work_type, executor);
    }

    /// Builder-style `register`
    pub fn with(mut self, work_type: WorkType, executor: Arc<dyn Executor>) -> Self {
        self.register(work_type, executor);
        self
    }

    pub fn get(&self, work_type: WorkType) -> Option<&Arc<dyn Executor>> {
        self.executors.get(&work_type)
    }

    /// Begin a unit of work without waiting for it
    ///
    /// Runs the executor's `prepare` check, then spawns `execute` on its own
    /// task. The outcome is sent on `completions` once the unit finishes; a
    /// unit that is aborted sends nothing.
    pub fn start(
        &self,
        request: &Request,
        completions: mpsc::UnboundedSender<Completion>,
    ) -> Result<ExecutionHandle, ExecutorError> {
        let executor = self
            .get(request.work_type)
            .cloned()
            .ok_or(ExecutorError::NotRegistered(request.work_type))?;
        executor.prepare(request)?;

        let id = request.id;
        let request = request.clone();
        debug!(%id, executor = executor.name(), "ExecutorSet::start: spawning unit");
        let task = tokio::spawn(async move {
            let outcome = match AssertUnwindSafe(executor.execute(request)).catch_unwind().await {
                Ok(outcome) => outcome,
                Err(panic) => {
                    let message = panic
                        .downcast_ref::<&str>()
                        .map(|s| s.to_string())
                        .or_else(|| panic.downcast_ref::<String>().cloned())
                        .unwrap_or_else(|| "unknown panic".to_string());
                    warn!(%id, %message, "unit of work panicked");
                    Err(ExecutorError::Panicked(message))
                }
            };
            if completions.send(Completion { id, outcome }).is_err() {
                debug!(%id, "completion dropped, scheduler is gone");
            }
        });

        Ok(ExecutionHandle::new(task.abort_handle()))
    }
}

impl std::fmt::Debug for ExecutorSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut types: Vec<_> = self.executors.keys().collect();
        types.sort();
        f.debug_struct("ExecutorSet").field("types", &types).finish()
    }
}
