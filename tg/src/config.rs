//! taskgate configuration types and loading

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::scheduler::SchedulerConfig;

/// Main taskgate configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[serde(rename = "log-level")]
    pub log_level: Option<String>,

    /// Admission limits and dispatch timing
    pub scheduler: SchedulerConfig,

    /// Execution backends
    pub executors: ExecutorsConfig,

    /// Event bus and event log
    pub events: EventsConfig,
}

impl Config {
    /// Validate configuration before use
    pub fn validate(&self) -> Result<()> {
        self.scheduler.validate().context("Invalid scheduler configuration")?;
        if self.events.capacity == 0 {
            return Err(eyre::eyre!("events.capacity must be greater than 0"));
        }
        Ok(())
    }

    /// Load configuration with fallback chain
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        // If explicit config path provided, try to load it
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        // Try project-local config: .taskgate.yml
        let local_config = PathBuf::from(".taskgate.yml");
        if local_config.exists() {
            match Self::load_from_file(&local_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    tracing::warn!("Failed to load config from {}: {}", local_config.display(), e);
                }
            }
        }

        // Try user config: ~/.config/taskgate/taskgate.yml
        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("taskgate").join("taskgate.yml");
            if user_config.exists() {
                match Self::load_from_file(&user_config) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        tracing::warn!("Failed to load config from {}: {}", user_config.display(), e);
                    }
                }
            }
        }

        // No config file found, use defaults
        tracing::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Read only the log level, before logging is initialized
    ///
    /// Errors are swallowed; the full `load` reports them later.
    pub fn load_log_level(config_path: Option<&PathBuf>) -> Option<String> {
        Self::load(config_path).ok().and_then(|c| c.log_level)
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;

        tracing::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }
}

/// Execution backend configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutorsConfig {
    pub kai: KaiConfig,
    pub kantra: KantraConfig,
}

/// Kai remote-call backend
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KaiConfig {
    /// HTTP endpoint to POST requests to; simulated when unset
    pub endpoint: Option<String>,

    /// Request timeout in milliseconds
    #[serde(rename = "timeout-ms")]
    pub timeout_ms: u64,

    /// Simulated call duration in milliseconds
    #[serde(rename = "simulate-ms")]
    pub simulate_ms: u64,
}

impl Default for KaiConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            timeout_ms: 30_000,
            simulate_ms: 120_000,
        }
    }
}

impl KaiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn simulate(&self) -> Duration {
        Duration::from_millis(self.simulate_ms)
    }
}

/// Kantra external-binary backend
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KantraConfig {
    /// Binary to run (path or name on PATH); simulated when unset
    pub binary: Option<PathBuf>,

    /// Arguments passed to the binary
    pub args: Vec<String>,

    /// Simulated run duration in milliseconds
    #[serde(rename = "simulate-ms")]
    pub simulate_ms: u64,
}

impl Default for KantraConfig {
    fn default() -> Self {
        Self {
            binary: None,
            args: Vec::new(),
            simulate_ms: 120_000,
        }
    }
}

impl KantraConfig {
    pub fn simulate(&self) -> Duration {
        Duration::from_millis(self.simulate_ms)
    }
}

/// Event bus and event log configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EventsConfig {
    /// Broadcast channel capacity
    pub capacity: usize,

    /// JSONL event log; defaults to the local data directory
    #[serde(rename = "log-path")]
    pub log_path: Option<PathBuf>,
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self {
            capacity: 1024,
            log_path: None,
        }
    }
}

impl EventsConfig {
    /// Resolved event log path (~/.local/share/taskgate/events.jsonl on Linux)
    pub fn resolved_log_path(&self) -> PathBuf {
        self.log_path.clone().unwrap_or_else(|| {
            dirs::data_local_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("taskgate")
                .join("events.jsonl")
        })
    }
}
