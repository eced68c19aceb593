use clap::Parser;
use std::sync::Arc;
use taskherd_coordinator::{api, Coordinator, CoordinatorConfig};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "th-coordinator")]
#[command(about = "Cluster Task Coordinator", long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.yaml")]
    config: String,

    /// Listen host for worker connections
    #[arg(long)]
    host: Option<String>,

    /// Listen port for worker connections
    #[arg(long)]
    port: Option<u16>,

    /// Submission API port
    #[arg(long)]
    http_port: Option<u16>,
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
    let mut config = if std::path::Path::new(&args.config).exists() {
        CoordinatorConfig::from_file(&args.config)?
    } else {
        tracing::warn!("Config file not found, using defaults");
        CoordinatorConfig::default()
    };

    // Override with CLI args
    if let Some(host) = args.host {
        config.network.host = host;
    }
    if let Some(port) = args.port {
        config.network.port = port;
    }
    if let Some(http_port) = args.http_port {
        config.api.http_port = http_port;
    }

    let http_port = config.api.http_port;
    let coordinator = Arc::new(Coordinator::new(config));

    // Start the submission API
    let api_coordinator = coordinator.clone();
    tokio::spawn(async move {
        if let Err(e) = start_api(api_coordinator, http_port).await {
            tracing::error!("Submission API error: {}", e);
        }
    });

    // Handle shutdown signals
    let shutdown_coordinator = coordinator.clone();
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        tracing::info!("Received shutdown signal");
        shutdown_coordinator.shutdown();
    });

    coordinator.run().await?;

    Ok(())
}

async fn start_api(coordinator: Arc<Coordinator>, port: u16) -> anyhow::Result<()> {
    let app = api::create_api(coordinator);
    let addr = format!("0.0.0.0:{}", port);

    tracing::info!("Submission API listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
