//! Kantra external-binary executor

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, info};

use super::{Executor, ExecutorError};
use crate::config::KantraConfig;
use crate::domain::Request;

/// Runs the Kantra binary once per request
///
/// The child is killed when the unit is cancelled. Without a configured
/// binary the run is simulated by sleeping.
pub struct KantraExecutor {
    binary: Option<PathBuf>,
    args: Vec<String>,
    simulate: Duration,
}

impl KantraExecutor {
    pub fn from_config(config: &KantraConfig) -> Self {
        debug!(binary = ?config.binary, args = ?config.args, "KantraExecutor::from_config: called");
        Self {
            binary: config.binary.clone(),
            args: config.args.clone(),
            simulate: config.simulate(),
        }
    }

    /// Executor that only simulates runs
    pub fn simulated(duration: Duration) -> Self {
        Self {
            binary: None,
            args: Vec::new(),
            simulate: duration,
        }
    }

    fn resolved_binary(&self, binary: &Path) -> Result<PathBuf, ExecutorError> {
        resolve_binary(binary).ok_or_else(|| ExecutorError::BinaryNotFound(binary.to_path_buf()))
    }
}

/// Resolve a binary the way a shell would
///
/// Anything with a path separator is checked as-is; a bare name is looked
/// up on PATH.
pub fn resolve_binary(binary: &Path) -> Option<PathBuf> {
    if binary.is_absolute() || binary.components().count() > 1 {
        return binary.is_file().then(|| binary.to_path_buf());
    }
    let path = std::env::var_os("PATH")?;
    std::env::split_paths(&path)
        .map(|dir| dir.join(binary))
        .find(|candidate| candidate.is_file())
}

#[async_trait]
impl Executor for KantraExecutor {
    fn name(&self) -> &'static str {
        "kantra"
    }

    fn prepare(&self, request: &Request) -> Result<(), ExecutorError> {
        if let Some(binary) = &self.binary {
            let resolved = self.resolved_binary(binary)?;
            debug!(id = %request.id, binary = %resolved.display(), "KantraExecutor::prepare: binary resolved");
        }
        Ok(())
    }

    async fn execute(&self, request: Request) -> Result<(), ExecutorError> {
        let Some(binary) = &self.binary else {
            info!(id = %request.id, name = %request.name, simulate = ?self.simulate, "Running Kantra task (simulated)");
            tokio::time::sleep(self.simulate).await;
            info!(id = %request.id, "hi from kantra");
            return Ok(());
        };

        let binary = self.resolved_binary(binary)?;
        info!(id = %request.id, name = %request.name, binary = %binary.display(), "Running Kantra task");

        let output = Command::new(&binary)
            .args(&self.args)
            .env("TASKGATE_REQUEST_ID", request.id.to_string())
            .env("TASKGATE_REQUEST_NAME", &request.name)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|source| ExecutorError::Spawn {
                binary: binary.clone(),
                source,
            })?;

        for line in String::from_utf8_lossy(&output.stdout).lines() {
            info!(id = %request.id, "kantra: {}", line);
        }

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(ExecutorError::ProcessFailed {
                code: output.status.code(),
                stderr,
            });
        }

        Ok(())
    }
}
