//! Scheduler configuration

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

use crate::domain::WorkType;

/// Worker limit used for any type missing from `max-workers`
pub const DEFAULT_MAX_WORKERS: usize = 2;

/// Scheduler configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Max concurrently running requests, per work type
    #[serde(rename = "max-workers", default = "default_max_workers")]
    pub max_workers: BTreeMap<WorkType, usize>,

    /// Fallback dispatch interval in milliseconds
    #[serde(rename = "poll-interval-ms", default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Buffer size of the host command channel
    #[serde(rename = "command-buffer", default = "default_command_buffer")]
    pub command_buffer: usize,
}

fn default_max_workers() -> BTreeMap<WorkType, usize> {
    WorkType::ALL.iter().map(|t| (*t, DEFAULT_MAX_WORKERS)).collect()
}

fn default_poll_interval_ms() -> u64 {
    1000
}

fn default_command_buffer() -> usize {
    256
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            max_workers: default_max_workers(),
            poll_interval_ms: default_poll_interval_ms(),
            command_buffer: default_command_buffer(),
        }
    }
}

impl SchedulerConfig {
    /// Config with explicit per-type limits and default timings
    pub fn with_limits(limits: impl IntoIterator<Item = (WorkType, usize)>) -> Self {
        let mut config = Self::default();
        config.max_workers.extend(limits);
        config
    }

    /// Worker limit for a type
    pub fn limit_for(&self, work_type: WorkType) -> usize {
        self.max_workers.get(&work_type).copied().unwrap_or(DEFAULT_MAX_WORKERS)
    }

    /// Get the poll interval as a Duration
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Reject settings that would stall dispatch forever
    pub fn validate(&self) -> eyre::Result<()> {
        if let Some((work_type, _)) = self.max_workers.iter().find(|(_, limit)| **limit == 0) {
            return Err(eyre::eyre!("max-workers for '{}' must be at least 1", work_type));
        }
        if self.poll_interval_ms == 0 {
            return Err(eyre::eyre!("poll-interval-ms must be greater than 0"));
        }
        if self.command_buffer == 0 {
            return Err(eyre::eyre!("command-buffer must be greater than 0"));
        }
        Ok(())
    }
}
