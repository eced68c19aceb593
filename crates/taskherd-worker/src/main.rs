use clap::Parser;
use std::path::PathBuf;
use taskherd_worker::{Worker, WorkerConfig};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "th-worker")]
#[command(about = "Cluster Task Worker", long_about = None)]
struct Args {
    /// Coordinator address
    #[arg(short = 'a', long, default_value = "127.0.0.1:5000")]
    coordinator: String,

    /// Shared working directory for commands
    #[arg(long)]
    shared_dir: Option<PathBuf>,

    /// Seconds between health reports
    #[arg(long)]
    health_interval: Option<u64>,

    /// Path to configuration file
    #[arg(long)]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    // Load configuration
    let mut config = if let Some(config_path) = &args.config {
        WorkerConfig::from_file(config_path)?
    } else {
        WorkerConfig::default()
    };

    // Override with CLI args
    config.coordinator_address = args.coordinator;
    if let Some(shared_dir) = args.shared_dir {
        config.shared_dir = shared_dir;
    }
    if let Some(health_interval) = args.health_interval {
        config.health_interval_secs = health_interval;
    }

    if !config.shared_dir.is_dir() {
        tracing::warn!(
            "Shared directory {} does not exist; commands will fail until it is mounted",
            config.shared_dir.display()
        );
    }

    let worker = Worker::new(config);

    // Handle shutdown signals
    let shutdown_worker = worker.clone();
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        tracing::info!("Received shutdown signal");
        shutdown_worker.shutdown();
    });

    worker.run().await?;

    Ok(())
}
