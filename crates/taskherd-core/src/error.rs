use thiserror::Error;

/// Errors surfaced by the coordinator's dispatch path.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DispatchError {
    /// Every registered worker is over the CPU or memory threshold, or none
    /// are connected. Commands are rejected; job dispatch stops early.
    #[error("no available clients to assign the task to")]
    NoEligibleWorker,

    #[error("job must contain at least one task")]
    EmptyJob,
}
