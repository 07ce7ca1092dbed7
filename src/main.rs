//! Mirror proxy.
//!
//! Browse a single upstream origin entirely through `localhost`.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client GET /path          ┌──────────────────────────────────────────────┐
//!     ──────────────────────────┼─▶ http::server ──▶ upstream::client ─────────┼──▶ https://origin/path
//!                               │        │                                      │
//!                               │        ▼                                      │
//!                               │   rewrite::pipeline                           │
//!                               │     text/html? ── no ──▶ passthrough          │
//!                               │        │ yes                                  │
//!                               │        ▼                                      │
//!                               │   document ─▶ links ─▶ text ─▶ serialize      │
//!     Client Response           │        │                                      │
//!     ◀─────────────────────────┼── http::response (200, Content-Type)          │
//!                               └──────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;
use mirror_proxy::config::{load_config, validate_config, ConfigError, ProxyConfig};
use mirror_proxy::lifecycle::{spawn_signal_listener, Shutdown};
use mirror_proxy::observability::init_logging;
use mirror_proxy::HttpServer;
use tokio::net::TcpListener;

/// Environment variable naming an optional TOML config file.
const CONFIG_ENV: &str = "MIRROR_PROXY_CONFIG";

#[derive(Parser)]
#[command(name = "mirror-proxy")]
#[command(about = "Local HTTP mirror of a single upstream site", long_about = None)]
struct Cli {
    /// Port to listen on
    port: Option<u16>,
}

fn load(cli: &Cli) -> Result<ProxyConfig, ConfigError> {
    let mut config = match std::env::var_os(CONFIG_ENV) {
        Some(path) => load_config(&PathBuf::from(path))?,
        None => ProxyConfig::default(),
    };
    if let Some(port) = cli.port {
        config.listener.port = port;
    }
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_logging();

    let config = load(&cli)?;

    tracing::info!(
        bind_address = %config.listener.bind_address(),
        upstream = %format!("{}://{}", config.upstream.scheme, config.upstream.host),
        origin_marker = %config.upstream.origin_marker,
        "Configuration loaded"
    );

    let listener = TcpListener::bind(config.listener.bind_address()).await?;
    let port = listener.local_addr()?.port();
    println!("Starting httpd on port {port}...");

    let shutdown = Shutdown::new();
    spawn_signal_listener(&shutdown);

    let server = HttpServer::new(config);
    server.run(listener, shutdown.subscribe()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
