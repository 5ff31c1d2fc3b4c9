//! Execution backends
//!
//! The scheduler only needs an abstract unit of work: something it can
//! start without blocking, cancel through a handle, and hear back from
//! exactly once. This module provides that contract ([`Executor`],
//! [`ExecutionHandle`], [`Completion`]), the per-type registry that performs
//! the start hand-off ([`ExecutorSet`]), and the two reference backends.

mod error;
mod handle;
mod kai;
mod kantra;
mod set;
mod traits;

pub use error::ExecutorError;
pub use handle::{Completion, ExecutionHandle};
pub use kai::KaiExecutor;
pub use kantra::{KantraExecutor, resolve_binary};
pub use set::ExecutorSet;
pub use traits::Executor;

#[cfg(test)]
pub use traits::mock;
