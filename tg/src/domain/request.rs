//! Request domain type
//!
//! A request is one unit of typed work submitted for scheduling. Its id is
//! handed out by the owning scheduler and is never reused.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::work_type::WorkType;

/// Identity of a request, unique within one scheduler instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(pub u64);

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for RequestId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(RequestId)
    }
}

/// A typed work request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Request {
    pub id: RequestId,

    /// Display label, derived from the id
    pub name: String,

    #[serde(rename = "type")]
    pub work_type: WorkType,

    #[serde(rename = "submitted-at")]
    pub submitted_at: DateTime<Utc>,
}

impl Request {
    /// Create a request with a label derived from `id`
    pub fn new(id: RequestId, work_type: WorkType) -> Self {
        Self {
            id,
            name: format!("Task-{}", id),
            work_type,
            submitted_at: Utc::now(),
        }
    }
}

/// Allocates request ids from a monotonically increasing counter
#[derive(Debug, Default)]
pub struct IdCounter {
    next: u64,
}

impl IdCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the next id and advance the counter
    pub fn next_id(&mut self) -> RequestId {
        let id = RequestId(self.next);
        self.next += 1;
        id
    }

    /// Peek at the id the next call will return
    pub fn peek(&self) -> RequestId {
        RequestId(self.next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_name_derived_from_id() {
        let request = Request::new(RequestId(7), WorkType::Kai);
        assert_eq!(request.name, "Task-7");
        assert_eq!(request.work_type, WorkType::Kai);
    }

    #[test]
    fn test_counter_is_monotonic() {
        let mut counter = IdCounter::new();
        assert_eq!(counter.peek(), RequestId(0));
        assert_eq!(counter.next_id(), RequestId(0));
        assert_eq!(counter.next_id(), RequestId(1));
        assert_eq!(counter.next_id(), RequestId(2));
        assert_eq!(counter.peek(), RequestId(3));
    }

    #[test]
    fn test_request_id_parse() {
        assert_eq!("12".parse::<RequestId>().unwrap(), RequestId(12));
        assert!("twelve".parse::<RequestId>().is_err());
    }

    #[test]
    fn test_request_serializes_type_field() {
        let request = Request::new(RequestId(3), WorkType::Kantra);
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["id"], 3);
        assert_eq!(value["name"], "Task-3");
        assert_eq!(value["type"], "kantra");
    }
}
