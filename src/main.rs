//! Filegate gateway binary.
//!
//! ```text
//!                      ┌──────────────────────────────────────────────┐
//!                      │                  FILEGATE                    │
//!   HTTP / WebSocket   │  ┌────────┐   ┌─────────┐   ┌─────────────┐  │
//!  ────────────────────┼─▶│  http  │──▶│ routing │──▶│ login / ws  │──┼──▶ Backend
//!                      │  │ server │   └─────────┘   │  / forward  │  │    (HTTP + WS)
//!                      │  └────────┘                 └─────────────┘  │
//!   Raw TCP            │  ┌────────┐   ┌─────────┐                    │
//!  ────────────────────┼─▶│  net   │──▶│  relay  │────────────────────┼──▶ Backend
//!                      │  │  tcp   │   └─────────┘                    │    (bytes)
//!                      │  └────────┘                                  │
//!                      └──────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;

use filegate::config::{load_config, validation::validate_config, ConfigError, GatewayConfig, GatewayMode};
use filegate::identity::StaticIdentities;
use filegate::lifecycle::{wait_for_signal, Shutdown};
use filegate::observability::{logging, metrics};
use filegate::{net, GatewayResult, HttpServer, TcpGateway};

#[derive(Parser, Debug)]
#[command(name = "filegate", version, about = "HTTP, WebSocket and TCP gateway for a file-management backend")]
struct Cli {
    /// Path to the TOML configuration file. Defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the configured mode: http, tcp or both.
    #[arg(short, long)]
    mode: Option<GatewayMode>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => {
            let config = GatewayConfig::default();
            validate_config(&config).map_err(ConfigError::Validation)?;
            config
        }
    };
    if let Some(mode) = cli.mode {
        config.mode = mode;
    }

    logging::init(&config.observability);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), mode = ?config.mode, "filegate starting");

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(e) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                error = %e,
                "Failed to parse metrics address"
            ),
        }
    }

    let shutdown = Shutdown::new();
    tokio::spawn(wait_for_signal(shutdown.clone()));

    run(config, &shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}

/// Start the gateways the mode asks for and wait for all of them.
async fn run(config: GatewayConfig, shutdown: &Shutdown) -> GatewayResult<()> {
    let connect_timeout = Duration::from_secs(config.timeouts.connect_secs);

    // Bind everything before serving anything: a bind failure is fatal.
    let http = if config.mode.runs_http() {
        let listener = net::bind(&config.listener.bind_address).await?;
        let identities = Arc::new(StaticIdentities::new(&config.auth.users));
        if identities.is_empty() {
            tracing::warn!("No users configured; every login will be denied");
        }
        Some((HttpServer::new(config.clone(), identities)?, listener))
    } else {
        None
    };

    let tcp = if config.mode.runs_tcp() {
        Some(TcpGateway::bind(&config.forwarder, connect_timeout).await?)
    } else {
        None
    };

    let http_rx = shutdown.subscribe();
    let tcp_rx = shutdown.subscribe();

    let http_task = async move {
        match http {
            Some((server, listener)) => server.run(listener, http_rx).await,
            None => Ok(()),
        }
    };
    let tcp_task = async move {
        match tcp {
            Some(gateway) => gateway.run(tcp_rx).await,
            None => Ok(()),
        }
    };

    let (http_result, tcp_result) = tokio::join!(http_task, tcp_task);
    http_result.and(tcp_result)
}
