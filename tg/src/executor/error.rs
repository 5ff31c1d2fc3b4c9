//! Executor error types

use std::path::PathBuf;
use thiserror::Error;

use crate::domain::WorkType;

/// Errors from starting or running a unit of work
#[derive(Debug, Error)]
pub enum ExecutorError {
    #[error("No executor registered for work type '{0}'")]
    NotRegistered(WorkType),

    #[error("Binary not found: {0}")]
    BinaryNotFound(PathBuf),

    #[error("Failed to spawn {binary}: {source}")]
    Spawn {
        binary: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Process exited with code {code:?}: {stderr}")]
    ProcessFailed { code: Option<i32>, stderr: String },

    #[error("Invalid endpoint: {0}")]
    InvalidEndpoint(String),

    #[error("Backend error {status}: {message}")]
    Backend { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Unit of work panicked: {0}")]
    Panicked(String),
}

impl ExecutorError {
    /// Check if the unit never began running
    pub fn is_start_failure(&self) -> bool {
        matches!(
            self,
            ExecutorError::NotRegistered(_) | ExecutorError::BinaryNotFound(_) | ExecutorError::InvalidEndpoint(_)
        )
    }
}
