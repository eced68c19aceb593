use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Coordinator-assigned identity of one worker connection.
///
/// A reconnecting worker gets a brand-new id; there is no resumption of the
/// old registry entry.
pub type WorkerId = Uuid;

/// Outcome of a single task execution, as reported by the worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Success,
    Error,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Success => "success",
            TaskStatus::Error => "error",
        }
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
