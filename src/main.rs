//! h1wire server.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client                ┌──────────────────────────────────────────────┐
//!     ─────────────────────▶│  net::Listener (connection limit)             │
//!                           │      │                                        │
//!                           │      ▼  one task per connection               │
//!                           │  server::dispatcher ── wire (head, body)      │
//!                           │      │                                        │
//!                           │      ▼                                        │
//!                           │  server::BearerGuard → server::DemoHandler    │
//!     ◀─────────────────────│      │                                        │
//!                           │      ▼                                        │
//!                           │  response (version echo, keep-alive)          │
//!                           │                                               │
//!                           │  config · observability · lifecycle           │
//!                           └──────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;

use h1wire::config::schema::DEFAULT_BEARER_TOKEN;
use h1wire::config::validation::validate_config;
use h1wire::config::{load_or_default, ConfigError};
use h1wire::lifecycle::{signals, Shutdown};
use h1wire::net::{tls, Listener};
use h1wire::observability::{logging, metrics};
use h1wire::server::{BearerGuard, DemoHandler, Server};

#[derive(Parser)]
#[command(name = "h1wire")]
#[command(about = "HTTP/1.1 demo server with keep-alive and bearer-token paths", long_about = None)]
struct Args {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Listen address, overrides listener.bind_address
    #[arg(short, long)]
    bind: Option<String>,

    /// Shared secret for the secure prefix, overrides auth.bearer_token
    #[arg(long)]
    token: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let mut config = load_or_default(args.config.as_deref())?;
    if let Some(bind) = args.bind {
        config.listener.bind_address = bind;
    }
    if let Some(token) = args.token {
        config.auth.bearer_token = token;
    }
    validate_config(&config).map_err(ConfigError::Validation)?;

    logging::init_logging(&config.observability.log_filter);
    tracing::info!("h1wire v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        max_connections = config.listener.max_connections,
        idle_secs = config.timeouts.idle_secs,
        secure_prefix = %config.auth.secure_prefix,
        "Configuration loaded"
    );
    if config.auth.bearer_token == DEFAULT_BEARER_TOKEN {
        tracing::warn!("Using the placeholder bearer token; set auth.bearer_token or --token");
    }

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => {
                if let Err(e) = metrics::init_metrics(addr) {
                    tracing::error!(error = %e, "Failed to start metrics exporter");
                }
            }
            Err(e) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                error = %e,
                "Failed to parse metrics address"
            ),
        }
    }

    let acceptor = match &config.listener.tls {
        Some(tls_config) => Some(tls::load_tls_acceptor(tls_config)?),
        None => None,
    };
    let listener = Listener::bind(&config.listener).await?;

    let shutdown = Shutdown::new();
    tokio::spawn(signals::shutdown_on_signal(shutdown.clone()));

    let handler = BearerGuard::new(DemoHandler, &config.auth);
    let server = Server::new(Arc::new(config), handler, acceptor);
    server.run(listener, shutdown.subscribe()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
