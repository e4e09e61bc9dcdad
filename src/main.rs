//! Stack gateway
//!
//! ```text
//!   stack.toml
//!       │
//!       ▼
//!   ┌─────────┐   ┌────────────┐   ┌──────────────┐   ┌──────────────────┐
//!   │ config  │──▶│ validation │──▶│   litellm    │──▶│ litellm-config   │
//!   │ loader  │   │            │   │   compiler   │   │ .yaml (atomic)   │
//!   └─────────┘   └────────────┘   └──────┬───────┘   └──────────────────┘
//!                                         │ router environment
//!                                         ▼
//!                                  ┌──────────────┐
//!                                  │   topology   │──▶ graph JSON / start order
//!                                  └──────────────┘
//!
//!   Client ──▶ gateway (route table) ──▶ backend
//!   Client ◀── Location rewritten  ◀──── 3xx
//! ```

use std::net::SocketAddr;
use std::process::ExitCode;

use clap::Parser;
use tokio::net::TcpListener;

use stack_gateway::cli::{Cli, Command};
use stack_gateway::config::{load_config, ObservabilityConfig, StackConfig};
use stack_gateway::http::GatewayServer;
use stack_gateway::lifecycle::{prepare, signals, write_document, PreparedStack, Shutdown, StartupError};
use stack_gateway::observability::{logging, metrics};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "Startup failed");
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), StartupError> {
    let config = match load_config(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            logging::init(&ObservabilityConfig::default().log_level);
            return Err(e.into());
        }
    };
    logging::init(&config.observability.log_level);

    tracing::info!(
        config = %cli.config.display(),
        version = env!("CARGO_PKG_VERSION"),
        "stack-gateway starting"
    );

    let prepared = prepare(&config)?;
    tracing::debug!(
        service = %config.litellm.service,
        variables = ?prepared.environment.names().collect::<Vec<_>>(),
        "Router environment derived"
    );

    match cli.command() {
        Command::Compile { output } => {
            let path = output.unwrap_or_else(|| prepared.output_path.clone());
            write_document(&prepared.document, &path)
        }
        Command::Topology => {
            println!("{}", serde_json::to_string_pretty(&prepared.topology)?);
            println!("start order: {}", prepared.topology.start_order().join(" -> "));
            Ok(())
        }
        Command::Serve => serve(config, prepared).await,
    }
}

async fn serve(config: StackConfig, prepared: PreparedStack) -> Result<(), StartupError> {
    write_document(&prepared.document, &prepared.output_path)?;

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse::<SocketAddr>() {
            Ok(addr) => {
                if let Err(e) = metrics::init_metrics(addr) {
                    tracing::error!(error = %e, "Failed to start metrics exporter");
                }
            }
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let address = config.gateway.bind_address.clone();
    let listener = TcpListener::bind(&address)
        .await
        .map_err(|source| StartupError::Bind { address, source })?;

    let shutdown = Shutdown::new();
    signals::spawn_signal_listener(&shutdown);

    let server = GatewayServer::new(config.gateway, prepared.routes);
    server
        .run(listener, shutdown.subscribe())
        .await
        .map_err(StartupError::Serve)?;

    tracing::info!("Shutdown complete");
    Ok(())
}
