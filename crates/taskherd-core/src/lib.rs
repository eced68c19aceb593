mod error;
mod job;
mod task;

pub use error::DispatchError;
pub use job::{Job, JobStatus};
pub use task::{TaskStatus, WorkerId};

/// Placeholder substituted with the 1-based task index in job command templates.
pub const TASK_ID_PLACEHOLDER: &str = "{task_id}";
