//! ProcessController - the scheduling actor
//!
//! One tokio task owns the [`SchedulerCore`] and serializes everything that
//! touches it: host commands, unit completions, and the periodic poll. Any
//! operation that frees or adds work only sets a "dispatch requested" flag;
//! the loop runs the pass once the current message is fully applied.

use std::collections::BTreeSet;
use std::time::Duration;

use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use super::config::SchedulerConfig;
use super::core::{CancelOutcome, SchedulerCore};
use super::messages::{SchedulerCommand, SchedulerError};
use super::queue::QueueSnapshot;
use crate::domain::{Request, RequestId, WorkType};
use crate::events::{EventBus, FailureStage, SchedulerEvent};
use crate::executor::{Completion, ExecutorSet};

/// Cloneable client for a running ProcessController
#[derive(Clone, Debug)]
pub struct SchedulerHandle {
    tx: mpsc::Sender<SchedulerCommand>,
    bus: EventBus,
}

impl SchedulerHandle {
    async fn request<T>(&self, build: impl FnOnce(oneshot::Sender<T>) -> SchedulerCommand) -> Result<T, SchedulerError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(build(reply_tx))
            .await
            .map_err(|_| SchedulerError::Closed)?;
        reply_rx.await.map_err(|_| SchedulerError::Closed)
    }

    /// Queue a new request of the given type
    pub async fn submit(&self, work_type: WorkType) -> Result<Request, SchedulerError> {
        debug!(%work_type, "SchedulerHandle::submit: called");
        self.request(|reply| SchedulerCommand::Submit { work_type, reply })
            .await
    }

    /// Cancel a running or queued request
    pub async fn cancel(&self, id: RequestId) -> Result<CancelOutcome, SchedulerError> {
        debug!(%id, "SchedulerHandle::cancel: called");
        self.request(|reply| SchedulerCommand::Cancel { id, reply }).await
    }

    pub async fn snapshot(&self) -> Result<QueueSnapshot, SchedulerError> {
        self.request(|reply| SchedulerCommand::Snapshot { reply }).await
    }

    /// Run a dispatch pass without waiting for the next poll
    pub async fn dispatch(&self) -> Result<(), SchedulerError> {
        debug!("SchedulerHandle::dispatch: called");
        self.request(|reply| SchedulerCommand::Dispatch { reply }).await
    }

    /// Cancel all running work, drop the queue, and stop the controller
    pub async fn shutdown(&self) -> Result<(), SchedulerError> {
        debug!("SchedulerHandle::shutdown: called");
        self.request(|reply| SchedulerCommand::Shutdown { reply }).await
    }

    /// Follow `rx` until every id in `pending` has reached a terminal event
    ///
    /// `on_event` sees each received event. A receiver that falls behind the
    /// bus loses events; the missed terminal events are recovered from a
    /// snapshot, since anything neither queued nor running has finished.
    pub async fn wait_for_finished(
        &self,
        rx: &mut broadcast::Receiver<SchedulerEvent>,
        pending: &mut BTreeSet<RequestId>,
        mut on_event: impl FnMut(&SchedulerEvent),
    ) -> Result<(), SchedulerError> {
        debug!(pending = pending.len(), "SchedulerHandle::wait_for_finished: called");
        while !pending.is_empty() {
            match rx.recv().await {
                Ok(event) => {
                    on_event(&event);
                    if event.is_terminal() {
                        pending.remove(&event.request_id());
                    }
                }
                Err(broadcast::error::RecvError::Lagged(missed)) => {
                    let live: BTreeSet<RequestId> = self.snapshot().await?.cancellable_ids().into_iter().collect();
                    pending.retain(|id| live.contains(id));
                    warn!(missed, remaining = pending.len(), "SchedulerHandle::wait_for_finished: lagged, resynced from snapshot");
                }
                Err(broadcast::error::RecvError::Closed) => return Err(SchedulerError::Closed),
            }
        }
        Ok(())
    }

    /// Subscribe to lifecycle events
    pub fn subscribe(&self) -> broadcast::Receiver<SchedulerEvent> {
        self.bus.subscribe()
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// The scheduling actor
pub struct ProcessController {
    core: SchedulerCore,
    executors: ExecutorSet,
    bus: EventBus,
    commands: mpsc::Receiver<SchedulerCommand>,
    completions_tx: mpsc::UnboundedSender<Completion>,
    completions_rx: mpsc::UnboundedReceiver<Completion>,
    dispatch_requested: bool,
}

impl ProcessController {
    /// Start the controller on its own task
    pub fn spawn(config: SchedulerConfig, executors: ExecutorSet, bus: EventBus) -> (SchedulerHandle, JoinHandle<()>) {
        debug!(?config, ?executors, "ProcessController::spawn: called");
        let (tx, commands) = mpsc::channel(config.command_buffer.max(1));
        let (completions_tx, completions_rx) = mpsc::unbounded_channel();

        let controller = Self {
            core: SchedulerCore::new(config),
            executors,
            bus: bus.clone(),
            commands,
            completions_tx,
            completions_rx,
            dispatch_requested: false,
        };
        let task = tokio::spawn(controller.run());
        (SchedulerHandle { tx, bus }, task)
    }

    async fn run(mut self) {
        let period = self.core.config().poll_interval().max(Duration::from_millis(1));
        info!(poll_ms = period.as_millis() as u64, "ProcessController: started");
        let mut poll = tokio::time::interval(period);
        poll.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                command = self.commands.recv() => match command {
                    Some(SchedulerCommand::Shutdown { reply }) => {
                        self.shutdown();
                        let _ = reply.send(());
                        break;
                    }
                    Some(command) => self.handle_command(command),
                    None => {
                        debug!("ProcessController: all handles dropped");
                        self.shutdown();
                        break;
                    }
                },
                Some(completion) = self.completions_rx.recv() => self.handle_completion(completion),
                _ = poll.tick() => self.dispatch_requested = true,
            }
            self.drain_dispatch_requests();
        }

        info!("ProcessController: stopped");
    }

    fn handle_command(&mut self, command: SchedulerCommand) {
        match command {
            SchedulerCommand::Submit { work_type, reply } => {
                let request = self.core.submit(work_type);
                self.bus.emit(SchedulerEvent::Submitted {
                    request: request.clone(),
                });
                self.dispatch_requested = true;
                let _ = reply.send(request);
            }
            SchedulerCommand::Cancel { id, reply } => {
                let outcome = self.core.cancel_task(id);
                match &outcome {
                    CancelOutcome::Running(request) => {
                        self.bus.emit(SchedulerEvent::Cancelled {
                            request: request.clone(),
                            was_running: true,
                        });
                        self.dispatch_requested = true;
                    }
                    CancelOutcome::Dequeued(request) => {
                        self.bus.emit(SchedulerEvent::Cancelled {
                            request: request.clone(),
                            was_running: false,
                        });
                    }
                    CancelOutcome::NotFound => {
                        debug!(%id, "ProcessController: cancel of unknown id");
                    }
                }
                let _ = reply.send(outcome);
            }
            SchedulerCommand::Snapshot { reply } => {
                let _ = reply.send(self.core.snapshot());
            }
            SchedulerCommand::Dispatch { reply } => {
                self.dispatch_requested = true;
                self.drain_dispatch_requests();
                let _ = reply.send(());
            }
            SchedulerCommand::Shutdown { reply } => {
                // Handled in the run loop; kept exhaustive
                self.shutdown();
                let _ = reply.send(());
            }
        }
    }

    fn handle_completion(&mut self, completion: Completion) {
        let Completion { id, outcome } = completion;
        let Some(finished) = self.core.complete_task(id, outcome.is_ok()) else {
            debug!(%id, "ProcessController: completion for unknown id ignored");
            return;
        };

        let event = match outcome {
            Ok(()) => SchedulerEvent::Completed {
                request: finished.request,
                elapsed_ms: finished.elapsed.as_millis() as u64,
            },
            Err(error) => SchedulerEvent::Failed {
                request: finished.request,
                // The unit was spawned but could not begin, e.g. its binary vanished after prepare
                stage: if error.is_start_failure() {
                    FailureStage::Start
                } else {
                    FailureStage::Run
                },
                error: error.to_string(),
            },
        };
        self.bus.emit(event);
        self.dispatch_requested = true;
    }

    /// Run passes until no trigger is pending
    fn drain_dispatch_requests(&mut self) {
        while self.dispatch_requested {
            self.dispatch_requested = false;
            self.dispatch_once();
        }
    }

    fn dispatch_once(&mut self) {
        let executors = &self.executors;
        let completions = &self.completions_tx;
        let report = self
            .core
            .dispatch(|request| executors.start(request, completions.clone()));

        if report.is_empty() {
            return;
        }
        debug!(
            started = report.started.len(),
            failed = report.failed.len(),
            "ProcessController: dispatch applied"
        );

        if report.needs_redispatch() {
            self.dispatch_requested = true;
        }
        for request in report.started {
            self.bus.emit(SchedulerEvent::Started { request });
        }
        for (request, error) in report.failed {
            warn!(id = %request.id, %error, "ProcessController: executor refused to start");
            self.bus.emit(SchedulerEvent::Failed {
                request,
                stage: FailureStage::Start,
                error: error.to_string(),
            });
        }
    }

    fn shutdown(&mut self) {
        let (running, queued) = self.core.shutdown();
        info!(
            running = running.len(),
            queued = queued.len(),
            "ProcessController: shutting down"
        );
        for request in running {
            self.bus.emit(SchedulerEvent::Cancelled {
                request,
                was_running: true,
            });
        }
        for request in queued {
            self.bus.emit(SchedulerEvent::Cancelled {
                request,
                was_running: false,
            });
        }
    }
}
