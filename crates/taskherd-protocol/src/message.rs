use serde::{Deserialize, Serialize};
use taskherd_core::TaskStatus;

/// Message types for the TCP protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum MessageType {
    HealthReport = 1,
    Task = 2,
    TaskResult = 3,
}

impl MessageType {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(MessageType::HealthReport),
            2 => Some(MessageType::Task),
            3 => Some(MessageType::TaskResult),
            _ => None,
        }
    }

    pub fn as_u8(&self) -> u8 {
        *self as u8
    }
}

/// Protocol messages exchanged over a worker connection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Message {
    /// Periodic worker self-report of utilization and load
    HealthReport(HealthReport),

    /// Coordinator assigns a task to the worker
    Task(TaskAssignment),

    /// Worker reports the outcome of an assigned task
    TaskResult(TaskResultReport),
}

impl Message {
    pub fn message_type(&self) -> MessageType {
        match self {
            Message::HealthReport(_) => MessageType::HealthReport,
            Message::Task(_) => MessageType::Task,
            Message::TaskResult(_) => MessageType::TaskResult,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthReport {
    pub cpu_percent: f32,
    pub mem_percent: f32,
    pub tasks_running: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskAssignment {
    pub task_name: String,
    /// Shell-interpreted command string
    pub command: String,
    pub job_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskResultReport {
    pub task_name: String,
    pub status: TaskStatus,
    pub output: String,
    /// Wall-clock execution time in seconds
    pub duration: f64,
    pub job_id: Option<String>,
}
