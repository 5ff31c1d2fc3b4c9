//! Domain types for taskgate
//!
//! Requests, their ids, and the fixed set of work types.

mod request;
mod work_type;

pub use request::{IdCounter, Request, RequestId};
pub use work_type::{ParseWorkTypeError, WorkType};
