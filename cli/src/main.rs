//! ShrivenQ CLI - boots the engine supervisor from a config file.

#![deny(warnings)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![deny(clippy::nursery)]
#![deny(clippy::cargo)]
#![deny(dead_code)]
#![deny(unused)]
#![deny(missing_docs)]
#![forbid(unsafe_code)]

use std::net::TcpListener;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result};
use clap::Parser;
use engine::{AuditLogger, Config, Engine, EngineConfig};
use tracing::{Level, error, info};

/// `engine [config-path]`; default `config.ini` (§6 "CLI / exit codes").
#[derive(Parser)]
#[command(name = "shrivenq")]
#[command(about = "ShrivenQ - Institutional-Grade Ultra-Low-Latency Trading Platform")]
#[command(version)]
struct Cli {
    /// Path to the engine's `key=value` config file.
    #[arg(default_value = "config.ini")]
    config_path: PathBuf,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_max_level(Level::INFO)
        .with_target(true)
        .with_thread_ids(true)
        .with_timer(tracing_subscriber::fmt::time::uptime())
        .init();

    let cli = Cli::parse();
    match run(&cli.config_path).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err:#}");
            ExitCode::FAILURE
        }
    }
}

/// Load config, stand up the engine, run until a shutdown signal, then
/// drain and exit. Exit 0 on a clean stop; any `Err` here (bad config,
/// an admin port already bound) becomes a non-zero process exit.
async fn run(config_path: &std::path::Path) -> Result<()> {
    let text = std::fs::read_to_string(config_path)
        .with_context(|| format!("reading config file {}", config_path.display()))?;
    let parsed = Config::parse(&text);
    let config = EngineConfig::from_config(&parsed)
        .with_context(|| format!("loading mandatory config from {}", config_path.display()))?;

    // The HTTP/WebSocket admin dashboard itself lives outside this core;
    // binding here only claims the configured ports up front so a
    // collision surfaces as a startup failure rather than silently
    // later.
    reserve_admin_ports(config.http_port, config.ws_port)?;

    let now_ms = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .context("system clock before epoch")?
        .as_millis() as u64;

    let logger = Arc::new(
        AuditLogger::init(&config.log_path, 4096)
            .with_context(|| format!("opening audit log at {}", config.log_path))?,
    );

    info!(symbols = ?config.symbols, mode = %config.mode, "starting engine");
    let mut engine = Engine::new(&config, Arc::clone(&logger), now_ms);
    engine.start();

    shutdown_signal().await;

    info!("shutdown signal received, draining workers");
    engine.stop();
    if let Ok(logger) = Arc::try_unwrap(logger) {
        logger.shutdown();
    }
    info!("engine stopped cleanly");
    Ok(())
}

/// Bind and immediately drop listeners on the configured admin ports, so a
/// port already in use is reported as a startup error.
fn reserve_admin_ports(http_port: u16, ws_port: u16) -> Result<()> {
    TcpListener::bind(("0.0.0.0", http_port))
        .with_context(|| format!("binding admin http port {http_port}"))?;
    TcpListener::bind(("0.0.0.0", ws_port)).with_context(|| format!("binding admin ws port {ws_port}"))?;
    Ok(())
}

/// Wait for Ctrl+C or, on Unix, SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!("failed to install Ctrl+C handler: {err}");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => error!("failed to install SIGTERM handler: {err}"),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("received Ctrl+C"),
        () = terminate => info!("received SIGTERM"),
    }
}
