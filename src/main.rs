//! Request Echo
//!
//! Answers every request with a JSON snapshot of the request and the server.
//!
//! # Architecture Overview
//!
//! ```text
//!                          ┌──────────────────────────────────────────────┐
//!                          │                 REQUEST ECHO                  │
//!                          │                                               │
//!     Client Request       │  ┌──────────┐    ┌─────────┐    ┌──────────┐  │
//!     ─────────────────────┼─▶│ http/    │───▶│ http    │───▶│ inspect  │  │
//!       (HTTP or HTTPS)    │  │ https    │    │ server  │    │ snapshot │  │
//!                          │  └────┬─────┘    └─────────┘    └────┬─────┘  │
//!                          │       │ cert                         │        │
//!                          │  ┌────┴─────┐                   ┌────┴─────┐  │
//!                          │  │ net::tls │                   │ platform │  │
//!                          │  └──────────┘                   └──────────┘  │
//!     JSON snapshot        │                                               │
//!     ◀────────────────────┼───────────────────────────────────────────────│
//!                          │  config · health · observability · lifecycle  │
//!                          └──────────────────────────────────────────────┘
//! ```

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;

use request_echo::config::loader::{apply_env_overrides, load_config};
use request_echo::config::EchoConfig;
use request_echo::lifecycle::{self, signals, Shutdown};
use request_echo::observability::{logging, metrics};

#[derive(Parser)]
#[command(name = "request-echo")]
#[command(about = "Diagnostic HTTP echo server", long_about = None)]
struct Cli {
    /// Optional TOML config file; environment variables override it.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let vars: BTreeMap<String, String> = std::env::vars().collect();

    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => EchoConfig::default(),
    };
    let config = apply_env_overrides(config, &vars);

    logging::init_logging(&config.observability)?;
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "request-echo starting");

    tracing::info!(
        bind_address = %config.listener.bind_address,
        tls_enabled = config.listener.tls.enabled,
        max_body_size = config.inspect.max_body_size,
        request_timeout_secs = config.timeouts.request_secs,
        "Configuration loaded"
    );

    let metrics = if config.observability.metrics_enabled {
        match metrics::init_metrics() {
            Ok(handle) => Some(handle),
            Err(err) => {
                tracing::error!(error = %err, "Failed to install metrics recorder");
                None
            }
        }
    } else {
        None
    };

    let bind_address = config.listener.bind_address.clone();
    let server = lifecycle::prepare(config, &vars, metrics).await?;

    let listener = TcpListener::bind(&bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Arc::new(Shutdown::new());
    let server_shutdown = shutdown.subscribe();
    signals::spawn_signal_listener(shutdown);

    server.run(listener, server_shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
