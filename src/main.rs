use anyhow::{Context, Result};
use clap::Parser;
use interview_recorder::{create_router, AppState, Config};
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Interview video recorder: buffers WebSocket video streams into object storage
#[derive(Parser, Debug)]
#[command(name = "interview-recorder")]
struct Args {
    /// Config file (extension optional)
    #[arg(long, default_value = "config/interview-recorder")]
    config: String,

    /// Override the HTTP port
    #[arg(long, env = "PORT")]
    port: Option<u16>,

    /// Override the local storage root
    #[arg(long)]
    storage_root: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let args = Args::parse();

    let mut cfg = Config::load(&args.config)?;
    if let Some(port) = args.port {
        cfg.service.http.port = port;
    }
    if let Some(root) = args.storage_root {
        cfg.storage.root = root;
    }

    info!("{} v{}", cfg.service.name, env!("CARGO_PKG_VERSION"));
    info!("Storage backend: {:?} ({:?})", cfg.storage.backend, cfg.storage.root);

    let state = AppState::from_config(&cfg)?;
    let app = create_router(state.clone());

    let bind_addr = cfg.bind_addr();
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", bind_addr))?;

    info!("Listening on {}", bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(state.shutdown.clone()))
        .await
        .context("HTTP server failed")?;

    // Graceful shutdown does not wait for upgraded sockets
    state.close_sockets().await;
    let ended = state.pipeline.end_all().await;
    info!("Shutdown complete, {} sessions left to flush", ended.len());

    Ok(())
}

async fn shutdown_signal(sockets: CancellationToken) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
    sockets.cancel();
}
