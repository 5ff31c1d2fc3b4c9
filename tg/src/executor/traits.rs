//! Executor trait definition

use async_trait::async_trait;

use super::ExecutorError;
use crate::domain::Request;

/// Performs the actual work for requests of one type
///
/// The scheduler calls `prepare` synchronously while admitting a request and
/// then runs `execute` on its own tokio task. Cancellation aborts that task,
/// so `execute` must tolerate being dropped at any await point.
#[async_trait]
pub trait Executor: Send + Sync {
    /// Backend name for logs
    fn name(&self) -> &'static str;

    /// Check that the unit can begin. Must not block.
    ///
    /// An error here is a start failure: the request never runs and its
    /// worker slot is released immediately.
    fn prepare(&self, _request: &Request) -> Result<(), ExecutorError> {
        Ok(())
    }

    /// Run the unit of work to completion
    async fn execute(&self, request: Request) -> Result<(), ExecutorError>;
}

#[cfg(test)]
pub mod mock {
    use super::*;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use tokio::sync::watch;

    use crate::domain::RequestId;

    /// How a mock unit of work behaves
    #[derive(Debug, Clone, Copy)]
    pub enum MockBehavior {
        /// Finish after the given delay
        SucceedAfter(Duration),
        /// Fail at runtime after the given delay
        FailAfter(Duration),
        /// Run until released via `release_all` or cancelled
        Block,
        /// Refuse to start
        RefuseStart,
    }

    /// Mock executor for unit tests
    pub struct MockExecutor {
        behavior: MockBehavior,
        release: watch::Sender<bool>,
        started: Mutex<Vec<RequestId>>,
        finished: AtomicUsize,
    }

    impl MockExecutor {
        pub fn new(behavior: MockBehavior) -> Self {
            Self {
                behavior,
                release: watch::Sender::new(false),
                started: Mutex::new(Vec::new()),
                finished: AtomicUsize::new(0),
            }
        }

        /// Ids whose `execute` has begun, in order
        pub fn started(&self) -> Vec<RequestId> {
            self.started.lock().unwrap().clone()
        }

        /// Number of units that ran to the end of `execute`
        pub fn finished(&self) -> usize {
            self.finished.load(Ordering::SeqCst)
        }

        /// Let every blocked unit finish, including ones not yet waiting
        pub fn release_all(&self) {
            self.release.send_replace(true);
        }
    }

    #[async_trait]
    impl Executor for MockExecutor {
        fn name(&self) -> &'static str {
            "mock"
        }

        fn prepare(&self, _request: &Request) -> Result<(), ExecutorError> {
            match self.behavior {
                MockBehavior::RefuseStart => Err(ExecutorError::BinaryNotFound("mock".into())),
                _ => Ok(()),
            }
        }

        async fn execute(&self, request: Request) -> Result<(), ExecutorError> {
            self.started.lock().unwrap().push(request.id);
            let result = match self.behavior {
                MockBehavior::SucceedAfter(delay) => {
                    tokio::time::sleep(delay).await;
                    Ok(())
                }
                MockBehavior::FailAfter(delay) => {
                    tokio::time::sleep(delay).await;
                    Err(ExecutorError::Backend {
                        status: 500,
                        message: "mock failure".to_string(),
                    })
                }
                MockBehavior::Block => {
                    let mut released = self.release.subscribe();
                    let _ = released.wait_for(|released| *released).await;
                    Ok(())
                }
                MockBehavior::RefuseStart => unreachable!("prepare refuses to start"),
            };
            self.finished.fetch_add(1, Ordering::SeqCst);
            result
        }
    }
}
