use taskherd_core::{DispatchError, Job, WorkerId, TASK_ID_PLACEHOLDER};
use taskherd_protocol::{Message, TaskAssignment};
use tracing::{info, warn};

use crate::coordinator::Coordinator;
use crate::registry::EligibleWorker;

/// Result of dispatching a single command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment {
    pub worker_id: WorkerId,
    pub task_name: String,
}

/// Pick the worker with minimum `tasks_running`. The snapshot is ordered by
/// registration, and `min_by_key` keeps the first minimum, so ties go to the
/// earliest-registered worker.
fn select_least_loaded(snapshot: &[EligibleWorker]) -> Option<&EligibleWorker> {
    snapshot.iter().min_by_key(|worker| worker.tasks_running)
}

impl Coordinator {
    /// Dispatch one shell command to the least-loaded eligible worker.
    ///
    /// There is no queue: with no eligible worker the command is rejected,
    /// not held for later.
    pub fn submit_command(&self, command: &str) -> Result<Assignment, DispatchError> {
        let mut state = self.state.lock();

        let snapshot = state.registry.eligible_snapshot();
        let chosen = select_least_loaded(&snapshot).ok_or(DispatchError::NoEligibleWorker)?;
        let worker_id = chosen.id;

        let task_name = format!("user_command_{}", state.next_seq());
        info!(
            "Assigning command '{}' to worker {} ({})",
            task_name,
            worker_id,
            state.registry.host_of(&worker_id).unwrap_or("?")
        );

        state.registry.send(
            &worker_id,
            Message::Task(TaskAssignment {
                task_name: task_name.clone(),
                command: command.to_string(),
                job_id: None,
            }),
        );
        state.registry.task_assigned(&worker_id);

        Ok(Assignment { worker_id, task_name })
    }

    /// Register a job and eagerly dispatch its tasks, re-evaluating worker
    /// load before each one.
    ///
    /// When no worker is eligible, dispatch stops immediately: the remaining
    /// tasks are never sent and are not recorded anywhere as pending, so the
    /// job can stay in progress forever. The job id is returned regardless of
    /// how many tasks actually went out.
    pub fn submit_job(
        &self,
        job_name: &str,
        command_template: &str,
        num_tasks: u32,
    ) -> Result<String, DispatchError> {
        if num_tasks == 0 {
            return Err(DispatchError::EmptyJob);
        }

        let job_id = {
            let mut state = self.state.lock();
            let job_id = format!("{}_{}", job_name, state.next_seq());
            state.jobs.insert(Job::new(job_id.clone(), num_tasks));
            info!("Received distributed job '{}' with {} tasks", job_id, num_tasks);
            job_id
        };

        for i in 1..=num_tasks {
            if self
                .dispatch_job_task(&job_id, command_template, i, num_tasks)
                .is_err()
            {
                warn!(
                    "No eligible workers for job '{}'; dropping tasks {}..={}",
                    job_id, i, num_tasks
                );
                break;
            }
        }

        Ok(job_id)
    }

    /// Dispatch one task of a job inside its own serialized critical
    /// section: the snapshot reflects earlier increments and any health
    /// report or disconnect processed since the previous task.
    pub(crate) fn dispatch_job_task(
        &self,
        job_id: &str,
        command_template: &str,
        index: u32,
        total: u32,
    ) -> Result<WorkerId, DispatchError> {
        let mut state = self.state.lock();

        let snapshot = state.registry.eligible_snapshot();
        let chosen = select_least_loaded(&snapshot).ok_or(DispatchError::NoEligibleWorker)?;
        let worker_id = chosen.id;

        let command = command_template.replace(TASK_ID_PLACEHOLDER, &index.to_string());
        let task_name = format!("task_{}of{}", index, total);
        info!(
            "Assigning task {} of job '{}' to worker {} ({})",
            index,
            job_id,
            worker_id,
            state.registry.host_of(&worker_id).unwrap_or("?")
        );

        state.registry.send(
            &worker_id,
            Message::Task(TaskAssignment {
                task_name,
                command,
                job_id: Some(job_id.to_string()),
            }),
        );
        state.registry.task_assigned(&worker_id);

        Ok(worker_id)
    }
}
