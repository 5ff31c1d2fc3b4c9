//! Work categories that select a capacity budget and an executor

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Category of work a request belongs to
///
/// Each type has its own concurrency budget and its own executor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkType {
    /// Remote-call backend
    Kai,
    /// External-binary backend
    Kantra,
}

impl WorkType {
    /// All known work types, in display order
    pub const ALL: [WorkType; 2] = [WorkType::Kai, WorkType::Kantra];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Kai => "kai",
            Self::Kantra => "kantra",
        }
    }
}

impl std::fmt::Display for WorkType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

/// Returned when a host supplies a type outside the fixed set
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown work type: {0} (expected one of: kai, kantra)")]
pub struct ParseWorkTypeError(pub String);

impl std::str::FromStr for WorkType {
    type Err = ParseWorkTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "kai" => Ok(Self::Kai),
            "kantra" => Ok(Self::Kantra),
            _ => Err(ParseWorkTypeError(s.to_string())),
        }
    }
}
