use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use betirement_gateway::config::load_config;
use betirement_gateway::lifecycle::{wait_for_signal, Shutdown};
use betirement_gateway::observability::{logging, metrics};
use betirement_gateway::HttpServer;

#[derive(Parser)]
#[command(name = "betirement-gateway", version, about = "API gateway for betirement.com")]
struct Cli {
    /// Path to a TOML config file. Defaults and environment are used without it.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;

    logging::init_logging(&config.observability);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "betirement-gateway starting");
    tracing::info!(
        bind_address = %config.listener.bind_address,
        rate_limiting = config.rate_limit.enabled,
        allowed_origins = ?config.cors.allowed_origins,
        experiments = config.experiments.len(),
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse::<SocketAddr>() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(e) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                error = %e,
                "Failed to parse metrics address"
            ),
        }
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    let server = HttpServer::new(config)?;

    let shutdown = Shutdown::new();
    let mut server_task = tokio::spawn(server.run(listener, shutdown.subscribe()));

    tokio::select! {
        _ = wait_for_signal() => {
            shutdown.trigger();
            server_task.await??;
        }
        result = &mut server_task => result??,
    }
    tracing::info!("Shutdown complete");
    Ok(())
}
