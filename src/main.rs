//! Payment Document Gateway
//!
//! Generates Pix QR-code payloads and bank-slip documents behind a
//! resilience control layer, built with Tokio and Axum.
//!
//! # Architecture Overview
//!
//! ```text
//!                    ┌────────────────────────────────────────────────┐
//!                    │                PAYMENT GATEWAY                  │
//!                    │                                                 │
//!   Client Request   │  ┌────────┐   ┌────────────────────────────┐   │
//!   ─────────────────┼─▶│  http  │──▶│         resilience          │   │
//!                    │  │ server │   │  circuit breaker / retry    │   │
//!                    │  └────────┘   └─────────────┬──────────────┘   │
//!                    │                             │                   │
//!                    │                             ▼                   │
//!   Client Response  │  ┌────────┐   ┌────────────────────────────┐   │
//!   ◀────────────────┼──│ fault  │◀──│          payments           │   │
//!                    │  │mapping │   │  pix / bank_slip / store    │   │
//!                    │  └────────┘   └────────────────────────────┘   │
//!                    │                                                 │
//!                    │  ┌───────────────────────────────────────────┐ │
//!                    │  │           Cross-Cutting Concerns           │ │
//!                    │  │  config   observability   lifecycle        │ │
//!                    │  └───────────────────────────────────────────┘ │
//!                    └────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use payment_gateway::config::{loader, GatewayConfig};
use payment_gateway::lifecycle::Shutdown;
use payment_gateway::observability::metrics;
use payment_gateway::HttpServer;

#[derive(Parser, Debug)]
#[command(name = "payment-gateway", about = "Payment document gateway")]
struct Args {
    /// Path to a TOML configuration file; defaults apply when absent.
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Initialize tracing subscriber
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "payment_gateway=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("payment-gateway v{} starting", env!("CARGO_PKG_VERSION"));

    let config = match &args.config {
        Some(path) => loader::load_config(path)?,
        None => GatewayConfig::default(),
    };

    tracing::info!(
        bind_address = %config.listener.bind_address,
        circuit_threshold = config.resilience.circuit.threshold,
        circuit_timeout_secs = config.resilience.circuit.timeout_secs,
        retry_max_attempts = config.resilience.retry.max_attempts,
        retry_delay_secs = config.resilience.retry.delay_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        if let Ok(addr) = config.observability.metrics_address.parse() {
            metrics::init_metrics(addr);
        } else {
            tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            );
        }
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(
        address = %listener.local_addr()?,
        "Listening for connections"
    );

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    shutdown.listen_for_signals();

    let server = HttpServer::new(config);
    server.run(listener, server_shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
