use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::prelude::*;

use chat_relay::config::{
    CliOverrides, FileConfig, HubConfig, PageConfig, ServerConfig, load_config,
};
use chat_relay::{AppState, build_router};

#[derive(Parser)]
#[command(name = "relay")]
#[command(about = "Real-time WebSocket chat relay")]
struct Args {
    /// Path to the TOML config file
    #[arg(short, long, default_value = "relay.toml")]
    config: PathBuf,

    /// Host to bind to (overrides config)
    #[arg(short = 'b', long)]
    host: Option<String>,

    /// Port for the HTTP server (overrides config, 0 for automatic)
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
    let default_directive = if args.debug {
        "relay=debug,chat_relay=debug,tower_http=debug,info"
    } else {
        "relay=info,chat_relay=info,tower_http=info,warn"
    };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_directive));
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(env_filter)
        .init();

    let file_config: FileConfig = load_config(&args.config)
        .extract()
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    let overrides = CliOverrides {
        host: args.host,
        port: args.port,
    };
    let server_config = ServerConfig::from_file(&file_config.server, &overrides);
    let hub_config = HubConfig::from_file(&file_config.hub);
    let page_config = PageConfig::from_file(&file_config.page);

    info!("Starting channel listener");
    let state = AppState::new(&hub_config, page_config);
    info!("Hub event queue capacity: {}", hub_config.event_capacity);

    let app = build_router(state);

    let addr = server_config.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    let actual_addr = listener.local_addr()?;

    info!("Chat relay listening on http://{}", actual_addr);
    info!("");
    info!("Endpoints:");
    info!("  GET  /            - Chat page");
    info!("  GET  /ws          - WebSocket relay");
    info!("  GET  /api/users   - Connected users");
    info!("  GET  /health      - Health summary");
    info!("  GET  /metrics     - Relay metrics");

    // Create shutdown signal handler
    let shutdown_signal = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
        info!("Received shutdown signal, exiting gracefully");
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal)
        .await
        .context("Server error")?;

    info!("Shutdown complete");
    Ok(())
}
