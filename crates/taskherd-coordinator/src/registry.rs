use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use taskherd_core::WorkerId;
use taskherd_protocol::Message;
use tokio::sync::mpsc::UnboundedSender;
use tracing::warn;

/// Workers reporting CPU utilization at or above this are skipped by dispatch.
pub const CPU_ELIGIBLE_BELOW: f32 = 80.0;

/// Workers reporting memory utilization at or above this are skipped by dispatch.
pub const MEM_ELIGIBLE_BELOW: f32 = 90.0;

/// One connected worker and its last-reported metrics.
///
/// The registry exclusively owns these entries; other components look workers
/// up by id and never hold a direct reference.
#[derive(Debug)]
pub struct WorkerEntry {
    pub host: String,
    pub cpu_percent: f32,
    pub mem_percent: f32,
    pub tasks_running: u32,
    pub connected_at: DateTime<Utc>,
    outbound: UnboundedSender<Message>,
    /// Registration order, used as the deterministic dispatch tie-break.
    seq: u64,
}

impl WorkerEntry {
    fn is_eligible(&self) -> bool {
        self.cpu_percent < CPU_ELIGIBLE_BELOW && self.mem_percent < MEM_ELIGIBLE_BELOW
    }
}

/// Point-in-time copy of one eligible worker, as seen by the scheduler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EligibleWorker {
    pub id: WorkerId,
    pub tasks_running: u32,
}

/// Read-only view of a worker for the HTTP surface.
#[derive(Debug, Clone, Serialize)]
pub struct WorkerView {
    pub worker_id: WorkerId,
    pub host: String,
    pub cpu_percent: f32,
    pub mem_percent: f32,
    pub tasks_running: u32,
    pub connected_at: DateTime<Utc>,
}

/// The live set of connected workers.
///
/// Not internally synchronized: the coordinator funnels every mutation
/// through its single state lock.
pub struct WorkerRegistry {
    workers: HashMap<WorkerId, WorkerEntry>,
    next_seq: u64,
}

impl WorkerRegistry {
    pub fn new() -> Self {
        WorkerRegistry {
            workers: HashMap::new(),
            next_seq: 0,
        }
    }

    /// Insert a freshly connected worker with zero metrics and zero load.
    /// An existing entry for the same id is never overwritten.
    pub fn register(
        &mut self,
        worker_id: WorkerId,
        host: String,
        outbound: UnboundedSender<Message>,
    ) -> bool {
        if self.workers.contains_key(&worker_id) {
            return false;
        }
        let seq = self.next_seq;
        self.next_seq += 1;
        self.workers.insert(
            worker_id,
            WorkerEntry {
                host,
                cpu_percent: 0.0,
                mem_percent: 0.0,
                tasks_running: 0,
                connected_at: Utc::now(),
                outbound,
                seq,
            },
        );
        true
    }

    /// Remove a worker entirely. Load counted against it is discarded; tasks
    /// it was running are never reassigned.
    pub fn unregister(&mut self, worker_id: &WorkerId) -> Option<WorkerEntry> {
        self.workers.remove(worker_id)
    }

    /// Replace the metric fields of an existing worker. Returns `false`
    /// without creating an entry when the worker is unknown.
    pub fn update_health(
        &mut self,
        worker_id: &WorkerId,
        cpu_percent: f32,
        mem_percent: f32,
        tasks_running: u32,
    ) -> bool {
        match self.workers.get_mut(worker_id) {
            Some(worker) => {
                worker.cpu_percent = cpu_percent;
                worker.mem_percent = mem_percent;
                worker.tasks_running = tasks_running;
                true
            }
            None => false,
        }
    }

    /// Copy of the workers currently under both utilization thresholds,
    /// ordered by registration. Later registry mutations do not affect a
    /// snapshot already taken.
    pub fn eligible_snapshot(&self) -> Vec<EligibleWorker> {
        let mut eligible: Vec<_> = self
            .workers
            .iter()
            .filter(|(_, entry)| entry.is_eligible())
            .map(|(id, entry)| (entry.seq, EligibleWorker { id: *id, tasks_running: entry.tasks_running }))
            .collect();
        eligible.sort_by_key(|(seq, _)| *seq);
        eligible.into_iter().map(|(_, worker)| worker).collect()
    }

    /// Count one dispatched task against a worker.
    pub fn task_assigned(&mut self, worker_id: &WorkerId) {
        if let Some(worker) = self.workers.get_mut(worker_id) {
            worker.tasks_running += 1;
        }
    }

    /// Count one received result against a worker.
    pub fn task_finished(&mut self, worker_id: &WorkerId) {
        if let Some(worker) = self.workers.get_mut(worker_id) {
            worker.tasks_running = worker.tasks_running.saturating_sub(1);
        }
    }

    /// Push a message onto a worker's connection. A closed channel means the
    /// connection is already tearing down; the entry will be unregistered
    /// moments later.
    pub fn send(&self, worker_id: &WorkerId, message: Message) -> bool {
        match self.workers.get(worker_id) {
            Some(worker) => match worker.outbound.send(message) {
                Ok(()) => true,
                Err(_) => {
                    warn!("Worker {} channel closed, message dropped", worker_id);
                    false
                }
            },
            None => false,
        }
    }

    pub fn host_of(&self, worker_id: &WorkerId) -> Option<&str> {
        self.workers.get(worker_id).map(|w| w.host.as_str())
    }

    pub fn len(&self) -> usize {
        self.workers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.workers.is_empty()
    }

    pub fn views(&self) -> Vec<WorkerView> {
        let mut views: Vec<_> = self
            .workers
            .iter()
            .map(|(id, entry)| {
                (
                    entry.seq,
                    WorkerView {
                        worker_id: *id,
                        host: entry.host.clone(),
                        cpu_percent: entry.cpu_percent,
                        mem_percent: entry.mem_percent,
                        tasks_running: entry.tasks_running,
                        connected_at: entry.connected_at,
                    },
                )
            })
            .collect();
        views.sort_by_key(|(seq, _)| *seq);
        views.into_iter().map(|(_, view)| view).collect()
    }
}

impl Default for WorkerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;
    use uuid::Uuid;

    fn add_worker(registry: &mut WorkerRegistry) -> WorkerId {
        let (tx, _rx) = mpsc::unbounded_channel();
        let id = Uuid::new_v4();
        assert!(registry.register(id, "10.0.0.1".to_string(), tx));
        id
    }

    #[test]
    fn test_register_starts_with_zero_load() {
        let mut registry = WorkerRegistry::new();
        let id = add_worker(&mut registry);

        let snapshot = registry.eligible_snapshot();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].id, id);
        assert_eq!(snapshot[0].tasks_running, 0);
    }

    #[test]
    fn test_register_does_not_overwrite() {
        let mut registry = WorkerRegistry::new();
        let id = add_worker(&mut registry);
        registry.update_health(&id, 10.0, 10.0, 4);

        let (tx, _rx) = mpsc::unbounded_channel();
        assert!(!registry.register(id, "10.0.0.2".to_string(), tx));
        assert_eq!(registry.eligible_snapshot()[0].tasks_running, 4);
        assert_eq!(registry.host_of(&id), Some("10.0.0.1"));
    }

    #[test]
    fn test_update_health_never_creates_ghost() {
        let mut registry = WorkerRegistry::new();
        assert!(!registry.update_health(&Uuid::new_v4(), 10.0, 10.0, 0));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_eligibility_thresholds() {
        let mut registry = WorkerRegistry::new();
        let id = add_worker(&mut registry);

        registry.update_health(&id, 79.9, 89.9, 0);
        assert_eq!(registry.eligible_snapshot().len(), 1);

        // At the threshold is already ineligible
        registry.update_health(&id, 80.0, 10.0, 0);
        assert!(registry.eligible_snapshot().is_empty());

        registry.update_health(&id, 10.0, 90.0, 0);
        assert!(registry.eligible_snapshot().is_empty());

        registry.update_health(&id, 95.0, 95.0, 0);
        assert!(registry.eligible_snapshot().is_empty());
    }

    #[test]
    fn test_unregister_removes_from_snapshots() {
        let mut registry = WorkerRegistry::new();
        let a = add_worker(&mut registry);
        let b = add_worker(&mut registry);

        registry.task_assigned(&a);
        let removed = registry.unregister(&a).unwrap();
        assert_eq!(removed.tasks_running, 1);

        let snapshot = registry.eligible_snapshot();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].id, b);
    }

    #[test]
    fn test_snapshot_is_point_in_time() {
        let mut registry = WorkerRegistry::new();
        let id = add_worker(&mut registry);

        let snapshot = registry.eligible_snapshot();
        registry.task_assigned(&id);
        registry.update_health(&id, 95.0, 95.0, 7);

        // The copy taken earlier is unaffected by later mutations
        assert_eq!(snapshot[0].tasks_running, 0);
    }

    #[test]
    fn test_snapshot_ordered_by_registration() {
        let mut registry = WorkerRegistry::new();
        let a = add_worker(&mut registry);
        let b = add_worker(&mut registry);
        let c = add_worker(&mut registry);

        let order: Vec<_> = registry.eligible_snapshot().iter().map(|w| w.id).collect();
        assert_eq!(order, vec![a, b, c]);
    }

    #[test]
    fn test_load_accounting() {
        let mut registry = WorkerRegistry::new();
        let id = add_worker(&mut registry);

        registry.task_assigned(&id);
        registry.task_assigned(&id);
        assert_eq!(registry.eligible_snapshot()[0].tasks_running, 2);

        registry.task_finished(&id);
        assert_eq!(registry.eligible_snapshot()[0].tasks_running, 1);

        registry.task_finished(&id);
        registry.task_finished(&id);
        assert_eq!(registry.eligible_snapshot()[0].tasks_running, 0);
    }

    #[test]
    fn test_send_reaches_worker_channel() {
        let mut registry = WorkerRegistry::new();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let id = Uuid::new_v4();
        registry.register(id, "10.0.0.1".to_string(), tx);

        let sent = registry.send(
            &id,
            Message::Task(taskherd_protocol::TaskAssignment {
                task_name: "user_command_1".to_string(),
                command: "echo hi".to_string(),
                job_id: None,
            }),
        );
        assert!(sent);
        assert!(matches!(rx.try_recv(), Ok(Message::Task(_))));

        assert!(!registry.send(
            &Uuid::new_v4(),
            Message::Task(taskherd_protocol::TaskAssignment {
                task_name: "user_command_2".to_string(),
                command: "echo hi".to_string(),
                job_id: None,
            }),
        ));
    }
}
