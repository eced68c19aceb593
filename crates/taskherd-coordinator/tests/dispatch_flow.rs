use std::sync::Arc;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use taskherd_coordinator::{Coordinator, CoordinatorConfig};
use taskherd_core::{JobStatus, TaskStatus};
use taskherd_protocol::{HealthReport, Message, MessageCodec, TaskAssignment, TaskResultReport};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;
use tokio_util::codec::Framed;

type WorkerConn = Framed<TcpStream, MessageCodec>;

async fn start_coordinator() -> (Arc<Coordinator>, std::net::SocketAddr) {
    let coordinator = Arc::new(Coordinator::new(CoordinatorConfig::default()));
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(coordinator.clone().serve(listener));
    (coordinator, addr)
}

/// Connect a simulated worker and wait until the coordinator has registered it.
async fn connect_worker(coordinator: &Coordinator, addr: std::net::SocketAddr) -> WorkerConn {
    let before = coordinator.connected_workers();
    let stream = TcpStream::connect(addr).await.unwrap();
    let framed = Framed::new(stream, MessageCodec);
    wait_for(|| coordinator.connected_workers() == before + 1).await;
    framed
}

async fn wait_for(mut condition: impl FnMut() -> bool) {
    timeout(Duration::from_secs(5), async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("condition not reached in time");
}

async fn recv_task(conn: &mut WorkerConn) -> TaskAssignment {
    match timeout(Duration::from_secs(5), conn.next()).await {
        Ok(Some(Ok(Message::Task(assignment)))) => assignment,
        other => panic!("Expected task assignment, got {:?}", other),
    }
}

#[tokio::test]
async fn test_command_dispatch_and_result() {
    let (coordinator, addr) = start_coordinator().await;
    let mut worker = connect_worker(&coordinator, addr).await;

    let assignment = coordinator.submit_command("echo hi").unwrap();

    let task = recv_task(&mut worker).await;
    assert_eq!(task.task_name, assignment.task_name);
    assert_eq!(task.command, "echo hi");
    assert!(task.job_id.is_none());

    worker
        .send(Message::TaskResult(TaskResultReport {
            task_name: task.task_name,
            status: TaskStatus::Success,
            output: "hi\n".to_string(),
            duration: 0.01,
            job_id: None,
        }))
        .await
        .unwrap();

    // Result decrements the worker's load back to zero
    wait_for(|| coordinator.workers()[0].tasks_running == 0).await;
}

#[tokio::test]
async fn test_health_report_updates_registry() {
    let (coordinator, addr) = start_coordinator().await;
    let mut worker = connect_worker(&coordinator, addr).await;

    worker
        .send(Message::HealthReport(HealthReport {
            cpu_percent: 42.0,
            mem_percent: 55.0,
            tasks_running: 1,
        }))
        .await
        .unwrap();

    wait_for(|| {
        let views = coordinator.workers();
        views.len() == 1 && views[0].cpu_percent == 42.0 && views[0].tasks_running == 1
    })
    .await;
}

#[tokio::test]
async fn test_overloaded_worker_rejects_commands() {
    let (coordinator, addr) = start_coordinator().await;
    let mut worker = connect_worker(&coordinator, addr).await;

    worker
        .send(Message::HealthReport(HealthReport {
            cpu_percent: 95.0,
            mem_percent: 20.0,
            tasks_running: 0,
        }))
        .await
        .unwrap();
    wait_for(|| coordinator.workers()[0].cpu_percent == 95.0).await;

    assert!(coordinator.submit_command("echo hi").is_err());
}

#[tokio::test]
async fn test_job_runs_to_completion() {
    let (coordinator, addr) = start_coordinator().await;
    let mut worker = connect_worker(&coordinator, addr).await;

    let job_id = coordinator
        .submit_job("render_job", "echo frame {task_id}", 2)
        .unwrap();

    for _ in 0..2 {
        let task = recv_task(&mut worker).await;
        assert_eq!(task.job_id.as_deref(), Some(job_id.as_str()));
        worker
            .send(Message::TaskResult(TaskResultReport {
                task_name: task.task_name,
                status: TaskStatus::Success,
                output: "done\n".to_string(),
                duration: 0.05,
                job_id: task.job_id,
            }))
            .await
            .unwrap();
    }

    wait_for(|| {
        coordinator
            .job(&job_id)
            .is_some_and(|job| job.status == JobStatus::Completed)
    })
    .await;

    let job = coordinator.job(&job_id).unwrap();
    assert_eq!(job.completed_tasks, 2);
}

#[tokio::test]
async fn test_malformed_frame_unregisters_worker() {
    use tokio::io::AsyncWriteExt;

    let (coordinator, addr) = start_coordinator().await;
    let mut stream = TcpStream::connect(addr).await.unwrap();
    wait_for(|| coordinator.connected_workers() == 1).await;

    // Zero-length frame: the codec must reject it and the connection must
    // tear down through the normal unregister path, not leave a ghost entry
    stream.write_all(&[0, 0, 0, 0, 1]).await.unwrap();
    wait_for(|| coordinator.connected_workers() == 0).await;
}

#[tokio::test]
async fn test_disconnect_unregisters_worker() {
    let (coordinator, addr) = start_coordinator().await;
    let worker = connect_worker(&coordinator, addr).await;
    assert_eq!(coordinator.connected_workers(), 1);

    drop(worker);
    wait_for(|| coordinator.connected_workers() == 0).await;

    // A reconnect is a brand-new identity, not a resumption
    let _worker = connect_worker(&coordinator, addr).await;
    assert_eq!(coordinator.connected_workers(), 1);
}
