use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::EnvFilter;

use audio_hub::{AppState, HubConfig, HubMetrics, create_routes, spawn_hub};

#[derive(Parser)]
#[command(name = "audio-hub")]
#[command(about = "Broadcast hub for shared audio rooms")]
struct Args {
    /// Path to the TOML config file
    #[arg(short, long, default_value = "audio_hub.toml")]
    config: PathBuf,

    /// Host to bind to (overrides config)
    #[arg(short = 'b', long)]
    host: Option<String>,

    /// Port for the HTTP server (overrides config and PORT)
    #[arg(short, long)]
    port: Option<u16>,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Setup logging
    let default_filter = if args.debug {
        "audio_hub=debug,tower_http=debug"
    } else {
        "audio_hub=info"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = HubConfig::load(&args.config, args.host, args.port)?;
    let addr = config.server.socket_addr()?;

    let hub = spawn_hub(config.hub.command_capacity, Arc::new(HubMetrics::new()));
    let app = create_routes(AppState {
        hub,
        outbound_capacity: config.hub.outbound_capacity,
    })
    .layer(TraceLayer::new_for_http());

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("Server starting on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("Shutdown signal received");
    }
}
