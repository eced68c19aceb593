use std::net::SocketAddr;
use std::sync::Arc;

use futures::{SinkExt, StreamExt};
use parking_lot::Mutex;
use taskherd_core::{Job, WorkerId};
use taskherd_protocol::{Message, MessageCodec, TaskResultReport};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, Notify};
use tokio_util::codec::Framed;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::config::CoordinatorConfig;
use crate::jobs::JobTracker;
use crate::registry::{WorkerRegistry, WorkerView};

/// Everything the coordinator mutates, behind one lock.
///
/// Each inbound event (submission, connect, disconnect, health report, task
/// result) completes its whole read-modify-write inside a single lock hold,
/// so two submissions can never race on the same eligible snapshot.
pub(crate) struct CoordinatorState {
    pub(crate) registry: WorkerRegistry,
    pub(crate) jobs: JobTracker,
    next_seq: u64,
}

impl CoordinatorState {
    /// Coordinator-wide monotonic value distinguishing task and job names.
    pub(crate) fn next_seq(&mut self) -> u64 {
        self.next_seq += 1;
        self.next_seq
    }
}

/// Central coordinator: accepts worker connections, tracks their health, and
/// dispatches submitted commands and jobs.
pub struct Coordinator {
    config: CoordinatorConfig,
    pub(crate) state: Mutex<CoordinatorState>,
    shutdown: Notify,
}

impl Coordinator {
    pub fn new(config: CoordinatorConfig) -> Self {
        Coordinator {
            config,
            state: Mutex::new(CoordinatorState {
                registry: WorkerRegistry::new(),
                jobs: JobTracker::new(),
                next_seq: 0,
            }),
            shutdown: Notify::new(),
        }
    }

    /// Bind the configured address and serve worker connections.
    pub async fn run(self: Arc<Self>) -> anyhow::Result<()> {
        let addr = format!("{}:{}", self.config.network.host, self.config.network.port);
        let listener = TcpListener::bind(&addr).await?;
        info!("Coordinator listening on {}", addr);
        self.serve(listener).await
    }

    /// Serve worker connections from an already-bound listener.
    pub async fn serve(self: Arc<Self>, listener: TcpListener) -> anyhow::Result<()> {
        loop {
            tokio::select! {
                result = listener.accept() => {
                    match result {
                        Ok((stream, addr)) => {
                            let coordinator = self.clone();
                            tokio::spawn(async move {
                                if let Err(e) = coordinator.handle_connection(stream, addr).await {
                                    error!("Connection error: {}", e);
                                }
                            });
                        }
                        Err(e) => {
                            error!("Accept error: {}", e);
                        }
                    }
                }
                _ = self.shutdown.notified() => {
                    info!("Shutting down coordinator");
                    break;
                }
            }
        }

        Ok(())
    }

    /// Serve one worker connection from accept to disconnect.
    ///
    /// Every connection gets a fresh identity; a reconnecting worker is a
    /// brand-new registry entry, not a resumption of the old one.
    async fn handle_connection(&self, stream: TcpStream, addr: SocketAddr) -> anyhow::Result<()> {
        let worker_id: WorkerId = Uuid::new_v4();
        let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<Message>();

        {
            let mut state = self.state.lock();
            state
                .registry
                .register(worker_id, addr.ip().to_string(), outbound_tx);
            info!(
                "Worker {} connected from {} ({} connected)",
                worker_id,
                addr,
                state.registry.len()
            );
        }

        let mut framed = Framed::new(stream, MessageCodec);

        let result = loop {
            tokio::select! {
                Some(message) = outbound_rx.recv() => {
                    if let Err(e) = framed.send(message).await {
                        break Err(e.into());
                    }
                }
                inbound = framed.next() => match inbound {
                    Some(Ok(message)) => self.handle_message(worker_id, message),
                    Some(Err(e)) => break Err(e.into()),
                    None => break Ok(()),
                },
            }
        };

        // Unregister on every exit path. Load counted against the worker is
        // discarded with it; in-flight tasks are not reassigned.
        {
            let mut state = self.state.lock();
            state.registry.unregister(&worker_id);
            warn!(
                "Worker {} disconnected ({} still connected)",
                worker_id,
                state.registry.len()
            );
        }

        result
    }

    pub(crate) fn handle_message(&self, worker_id: WorkerId, message: Message) {
        match message {
            Message::HealthReport(report) => {
                let mut state = self.state.lock();
                let known = state.registry.update_health(
                    &worker_id,
                    report.cpu_percent,
                    report.mem_percent,
                    report.tasks_running,
                );
                if known {
                    debug!(
                        "Health report from {} ({}): CPU={}%, Memory={}%, running={}",
                        state.registry.host_of(&worker_id).unwrap_or("?"),
                        worker_id,
                        report.cpu_percent,
                        report.mem_percent,
                        report.tasks_running
                    );
                } else {
                    warn!("Health report from unregistered worker {}", worker_id);
                }
            }
            Message::TaskResult(result) => self.handle_task_result(worker_id, result),
            Message::Task(assignment) => {
                warn!(
                    "Unexpected task assignment '{}' from worker {}",
                    assignment.task_name, worker_id
                );
            }
        }
    }

    fn handle_task_result(&self, worker_id: WorkerId, result: TaskResultReport) {
        let mut state = self.state.lock();
        state.registry.task_finished(&worker_id);

        info!(
            "Task result from {} for '{}': status={}, duration={:.2}s",
            worker_id, result.task_name, result.status, result.duration
        );
        info!("Output:\n{}", result.output);

        if let Some(job) = state.jobs.record_result(result.job_id.as_deref()) {
            info!(
                "Job '{}' progress: {}/{} tasks completed",
                job.id, job.completed_tasks, job.total_tasks
            );
            if job.is_complete() {
                info!("Job '{}' is complete!", job.id);
            }
        }
    }

    pub fn connected_workers(&self) -> usize {
        self.state.lock().registry.len()
    }

    pub fn workers(&self) -> Vec<WorkerView> {
        self.state.lock().registry.views()
    }

    pub fn job(&self, job_id: &str) -> Option<Job> {
        self.state.lock().jobs.get(job_id).cloned()
    }

    pub fn ongoing_jobs(&self) -> usize {
        self.state.lock().jobs.len()
    }

    pub fn shutdown(&self) {
        self.shutdown.notify_waiters();
    }
}
