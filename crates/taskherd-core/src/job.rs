use serde::{Deserialize, Serialize};

/// Lifecycle of a job. There is no failed state: task errors still count
/// toward completion, and a job whose tasks never all report simply stays
/// in progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum JobStatus {
    InProgress,
    Completed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::InProgress => "in-progress",
            JobStatus::Completed => "completed",
        }
    }
}

/// A named batch of tasks sharing a command template, tracked to completion
/// as a unit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: String,
    pub total_tasks: u32,
    pub completed_tasks: u32,
    pub status: JobStatus,
}

impl Job {
    pub fn new(id: String, total_tasks: u32) -> Self {
        Job {
            id,
            total_tasks,
            completed_tasks: 0,
            status: JobStatus::InProgress,
        }
    }

    /// Count one task result against this job. Success and error outcomes
    /// count identically. Returns the updated completion counter.
    ///
    /// The counter never exceeds `total_tasks`, and the job flips to
    /// `Completed` exactly when the last expected result arrives.
    pub fn record_completion(&mut self) -> u32 {
        if self.completed_tasks < self.total_tasks {
            self.completed_tasks += 1;
        }
        if self.completed_tasks == self.total_tasks {
            self.status = JobStatus::Completed;
        }
        self.completed_tasks
    }

    pub fn is_complete(&self) -> bool {
        self.status == JobStatus::Completed
    }
}
