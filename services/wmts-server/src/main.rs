//! WMTS tile proxy server.
//!
//! Serves cached tiles from the local disk cache, fetching missing tiles
//! from the configured WMS backend on demand.

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use wmts_core::env::{self, LogOutput};
use wmts_core::Config;
use wmts_server::{build_router, state::AppState};

const DEFAULT_PORT: u16 = 8000;
const DEFAULT_SRV_IP: &str = "0.0.0.0";
const DEFAULT_BUFFER_SIZE: u32 = 50;
const SHUTDOWN_DRAIN: Duration = Duration::from_secs(5);

fn init_tracing(level: Level, output: LogOutput) -> Result<()> {
    let builder = FmtSubscriber::builder().with_max_level(level);
    match output {
        LogOutput::Stdout => tracing::subscriber::set_global_default(
            builder.with_writer(std::io::stdout).finish(),
        )?,
        LogOutput::Stderr => tracing::subscriber::set_global_default(
            builder.with_writer(std::io::stderr).finish(),
        )?,
        LogOutput::Discard => tracing::subscriber::set_global_default(
            builder.with_writer(std::io::sink).finish(),
        )?,
        LogOutput::File(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)
                .with_context(|| format!("opening log file '{}'", path.display()))?;
            tracing::subscriber::set_global_default(
                builder.with_writer(std::sync::Mutex::new(file)).with_ansi(false).finish(),
            )?
        }
    }
    Ok(())
}

/// Resolves on SIGINT or SIGTERM, then arms a hard exit after the drain
/// window so a hung connection cannot keep the process alive.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("installing SIGINT handler");
    };
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("installing SIGTERM handler")
            .recv()
            .await;
    };
    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
    info!(
        drain_secs = SHUTDOWN_DRAIN.as_secs(),
        "shutdown signal received, draining in-flight requests"
    );
    tokio::spawn(async {
        tokio::time::sleep(SHUTDOWN_DRAIN).await;
        std::process::exit(0);
    });
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let level = env::log_level_from_env(Level::INFO)?;
    let output = env::log_output_from_env(LogOutput::Stderr)?;
    init_tracing(level, output)?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "starting wmts-server"
    );

    let config_path = env::layers_config_path_from_env()?;
    let mut config = Config::from_yaml_file(&config_path)?;
    if config.layers.is_empty() {
        anyhow::bail!("no layers loaded from '{}'", config_path.display());
    }

    // Environment overrides beat the YAML backend settings.
    if let Some(url) = env::wms_backend_url_from_env() {
        info!(url = %url, "overriding WMS backend URL from environment");
        for layer in config.layers.values_mut() {
            layer.defaults.wms_backend_url = url.clone();
        }
    }
    if let Some(prefix) = env::wms_backend_prefix_from_env() {
        for layer in config.layers.values_mut() {
            layer.defaults.wms_backend_prefix = prefix.clone();
        }
    }

    let buffer = env::buffer_size_from_env(DEFAULT_BUFFER_SIZE)?;
    let state = AppState::new(config, buffer)?;
    let app = build_router(state);

    let port = env::port_from_env(DEFAULT_PORT)?;
    let ip = env::listen_ip_from_env(DEFAULT_SRV_IP)?;
    let addr: SocketAddr = format!("{}:{}", ip, port)
        .parse()
        .context("assembling the listen address")?;
    info!(address = %addr, "listening");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {}", addr))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("server stopped");
    Ok(())
}
