use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use parking_lot::RwLock;
use taskherd_protocol::{Message, MessageCodec, TaskAssignment, TaskResultReport};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, Notify};
use tokio_util::codec::Framed;
use tracing::{error, info, warn};

use crate::config::WorkerConfig;
use crate::executor;
use crate::health::HealthSampler;

/// Worker node: executes dispatched shell commands and reports health.
#[derive(Clone)]
pub struct Worker {
    config: WorkerConfig,
    tasks_running: Arc<RwLock<u32>>,
    shutdown: Arc<Notify>,
}

impl Worker {
    pub fn new(config: WorkerConfig) -> Self {
        Worker {
            config,
            tasks_running: Arc::new(RwLock::new(0)),
            shutdown: Arc::new(Notify::new()),
        }
    }

    /// Connect to the coordinator and serve until disconnect or shutdown.
    pub async fn run(&self) -> anyhow::Result<()> {
        info!(
            "Starting worker, connecting to {} (shared dir: {})",
            self.config.coordinator_address,
            self.config.shared_dir.display()
        );

        let stream = TcpStream::connect(&self.config.coordinator_address).await?;
        info!("Connected to coordinator at {}", self.config.coordinator_address);

        let mut framed = Framed::new(stream, MessageCodec);

        let (outbound_tx, mut outbound_rx) = mpsc::channel::<Message>(16);

        // Health ticker. The first tick fires immediately, so one report goes
        // out right after connect, before the interval starts. While a report
        // cannot be delivered the tick is simply skipped, never buffered.
        let report_tx = outbound_tx.clone();
        let interval_secs = self.config.health_interval_secs;
        let tasks_running = self.tasks_running.clone();
        let shutdown = self.shutdown.clone();

        tokio::spawn(async move {
            let mut sampler = HealthSampler::new();
            let mut interval = tokio::time::interval(Duration::from_secs(interval_secs));
            // Missed report slots are skipped, never caught up on
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        let report = sampler.sample(*tasks_running.read());
                        if report_tx.send(Message::HealthReport(report)).await.is_err() {
                            break;
                        }
                    }
                    _ = shutdown.notified() => {
                        break;
                    }
                }
            }
        });

        // Main connection loop: forward outbound reports and results, accept
        // task assignments.
        loop {
            tokio::select! {
                Some(message) = outbound_rx.recv() => {
                    if let Err(e) = framed.send(message).await {
                        error!("Failed to send message: {}", e);
                        break;
                    }
                }
                inbound = framed.next() => match inbound {
                    Some(Ok(Message::Task(assignment))) => {
                        *self.tasks_running.write() += 1;
                        info!(
                            "Received task '{}'. Executing command: {}",
                            assignment.task_name, assignment.command
                        );

                        let shared_dir = self.config.shared_dir.clone();
                        let tasks_running = self.tasks_running.clone();
                        let result_tx = outbound_tx.clone();
                        tokio::spawn(async move {
                            run_assignment(assignment, shared_dir, tasks_running, result_tx).await;
                        });
                    }
                    Some(Ok(other)) => {
                        warn!("Unexpected message from coordinator: {:?}", other.message_type());
                    }
                    Some(Err(e)) => {
                        error!("Protocol error: {}", e);
                        break;
                    }
                    None => {
                        warn!("Connection closed by coordinator");
                        break;
                    }
                },
                _ = self.shutdown.notified() => {
                    info!("Worker shutting down");
                    break;
                }
            }
        }

        Ok(())
    }

    /// Trigger shutdown
    pub fn shutdown(&self) {
        self.shutdown.notify_waiters();
    }
}

/// Execute one assignment and report its result.
///
/// Whatever the outcome, the load counter is decremented exactly once and
/// exactly one result is reported; execution faults never escape as
/// connection-level failures.
async fn run_assignment(
    assignment: TaskAssignment,
    shared_dir: PathBuf,
    tasks_running: Arc<RwLock<u32>>,
    result_tx: mpsc::Sender<Message>,
) {
    let (outcome, duration) = executor::execute(&assignment.command, &shared_dir).await;
    let status = outcome.status();

    {
        let mut running = tasks_running.write();
        *running = running.saturating_sub(1);
    }

    info!(
        "Task '{}' finished: status={}, duration={:.2}s",
        assignment.task_name, status, duration
    );

    let report = TaskResultReport {
        task_name: assignment.task_name.clone(),
        status,
        output: outcome.into_output(),
        duration,
        job_id: assignment.job_id,
    };

    if result_tx.send(Message::TaskResult(report)).await.is_err() {
        error!("Failed to report result for task '{}'", assignment.task_name);
    }
}
