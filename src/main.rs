//! File Drop - upload gateway from browsers to Cloudflare R2

use clap::Parser;
use file_drop::api::{self, handlers::AppState};
use file_drop::config::{BackendConfig, Config};
use file_drop::storage;
use file_drop::upload::Uploader;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// File Drop - multipart and single-shot uploads to R2
#[derive(Parser, Debug)]
#[command(name = "file_drop")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<String>,

    /// Listen address (overrides config)
    #[arg(short, long, value_name = "ADDR")]
    listen: Option<String>,

    /// Target bucket (overrides config)
    #[arg(short, long, value_name = "BUCKET")]
    bucket: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Load configuration from file if specified, otherwise use default loading
    let mut config = if let Some(ref path) = cli.config {
        Config::from_file(path)?
    } else {
        Config::load()?
    };

    // CLI overrides
    if let Some(ref addr) = cli.listen {
        config.listen_addr = addr.parse()?;
    }
    if let Some(ref bucket) = cli.bucket {
        config.bucket = bucket.clone();
    }

    // Initialize tracing
    let log_level = if cli.verbose {
        "file_drop=trace,tower_http=trace".to_string()
    } else {
        config.log_level.clone()
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| log_level.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting File Drop upload server");
    info!("  Listen address: {}", config.listen_addr);
    info!("  Bucket: {}", config.bucket);

    match &config.backend {
        BackendConfig::R2 { region, .. } => {
            info!("  Backend: R2");
            info!("  Endpoint: {}", config.backend.endpoint_url()?);
            info!("  Region: {}", region);
        }
        BackendConfig::Memory { min_part_size } => {
            warn!("  Backend: in-memory (uploads are lost on restart)");
            info!("  Minimum part size: {} bytes", min_part_size);
        }
    }
    info!(
        "  Max body size: {} MB",
        config.max_body_size / 1024 / 1024
    );

    let backend = storage::from_config(&config.backend)?;
    let state = Arc::new(AppState::new(
        Uploader::new(backend, config.bucket.clone()),
        config.backend.label(),
    ));
    let app = api::router(state, config.max_body_size as usize);

    // Start server with graceful shutdown
    let listener = TcpListener::bind(&config.listen_addr).await?;
    info!("File Drop listening on http://{}", config.listen_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

/// Handle shutdown signals (SIGINT, SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            warn!("Received Ctrl+C, initiating graceful shutdown...");
        }
        _ = terminate => {
            warn!("Received SIGTERM, initiating graceful shutdown...");
        }
    }
}
