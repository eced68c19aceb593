use std::collections::HashMap;

use taskherd_core::Job;

/// In-flight jobs and their completion counters.
///
/// Jobs are never removed: a job whose tasks were partially dispatched, or
/// whose worker disconnected mid-task, stays in progress for the life of the
/// process. Retention is unbounded by design.
pub struct JobTracker {
    jobs: HashMap<String, Job>,
}

impl JobTracker {
    pub fn new() -> Self {
        JobTracker { jobs: HashMap::new() }
    }

    pub fn insert(&mut self, job: Job) {
        self.jobs.insert(job.id.clone(), job);
    }

    /// Count one task result. `None` (a plain command task) or an unknown job
    /// id is a no-op. Returns the updated job for progress logging.
    pub fn record_result(&mut self, job_id: Option<&str>) -> Option<&Job> {
        let job = self.jobs.get_mut(job_id?)?;
        job.record_completion();
        Some(job)
    }

    pub fn get(&self, job_id: &str) -> Option<&Job> {
        self.jobs.get(job_id)
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }
}

impl Default for JobTracker {
    fn default() -> Self {
        Self::new()
    }
}
