//! Tessera Server
//!
//! Serves the demo tables over HTTP/JSON and binary RPC from one shared store.

use clap::Parser;
use std::sync::Arc;
use tessera_core::seed::demo_store;
use tessera_server::{router, Config, RpcServer};
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{error, info, Level};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "tessera-server")]
#[command(about = "Schema-described table server with HTTP/JSON and binary RPC surfaces")]
struct Args {
    /// Address to bind both listeners to (overrides HOST)
    #[arg(long)]
    host: Option<String>,

    /// HTTP/JSON port (overrides HTTP_PORT)
    #[arg(long)]
    http_port: Option<u16>,

    /// Binary RPC port (overrides RPC_PORT)
    #[arg(long)]
    rpc_port: Option<u16>,

    /// Log level when RUST_LOG is unset (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: Level,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    // Setup logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(args.log_level.to_string()));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let mut config = Config::from_env()?;
    if let Some(host) = args.host {
        config.host = host;
    }
    if let Some(port) = args.http_port {
        config.http_port = port;
    }
    if let Some(port) = args.rpc_port {
        config.rpc_port = port;
    }

    let store = Arc::new(demo_store()?);
    info!("Loaded {} tables", store.len());

    let rpc_addr = config.rpc_addr()?;
    let rpc_listener = TcpListener::bind(rpc_addr).await?;
    let rpc_server = RpcServer::new(store.clone());
    let rpc_task = tokio::spawn(async move {
        if let Err(e) = rpc_server.serve(rpc_listener).await {
            error!("RPC server error: {}", e);
        }
    });

    let http_addr = config.http_addr()?;
    let http_listener = TcpListener::bind(http_addr).await?;
    info!("HTTP server listening on {}", http_addr);
    let app = router(store);
    let http_task = tokio::spawn(async move {
        if let Err(e) = axum::serve(http_listener, app).await {
            error!("HTTP server error: {}", e);
        }
    });

    // Wait for shutdown signal
    match signal::ctrl_c().await {
        Ok(()) => info!("Shutdown signal received"),
        Err(err) => error!("Unable to listen for shutdown signal: {}", err),
    }

    rpc_task.abort();
    http_task.abort();
    info!("Server shutdown complete");

    Ok(())
}
