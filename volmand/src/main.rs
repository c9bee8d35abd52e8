//! `volmand` — volume plugin manager daemon.
//!
//! Wires the `libvolman` pieces together: a registry kept fresh by the
//! background syncer, a disk-backed driver factory speaking HTTP to plugins,
//! and the manager API served over TCP until interrupted.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use libvolman::voldriver::http::HttpRemoteClientFactory;
use libvolman::{DiskDriverFactory, DriverRegistry, DriverSyncer, LocalClient, volhttp};

#[derive(Parser, Debug)]
#[command(name = "volmand", about = "Volume plugin manager daemon")]
struct Cli {
    /// Address the manager API listens on.
    #[arg(long, default_value = "0.0.0.0:8750")]
    listen_addr: SocketAddr,

    /// Directory scanned for driver spec files; repeatable, earlier
    /// directories take precedence.
    #[arg(long = "drivers-path", required = true)]
    drivers_paths: Vec<PathBuf>,

    /// Seconds between driver discovery passes.
    #[arg(long, default_value_t = 30)]
    scan_interval: u64,

    /// Seconds a driver call may take before it is abandoned.
    #[arg(long, default_value_t = 30)]
    driver_timeout: u64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cli = Cli::parse();
    info!(
        listen = %cli.listen_addr,
        paths = ?cli.drivers_paths,
        interval_secs = cli.scan_interval,
        "starting volmand"
    );

    let registry = Arc::new(DriverRegistry::new());
    let factory = Arc::new(DiskDriverFactory::new(
        cli.drivers_paths.clone(),
        Arc::new(HttpRemoteClientFactory::new(Duration::from_secs(
            cli.driver_timeout,
        ))),
    ));

    let syncer = DriverSyncer::new(
        registry.clone(),
        factory.clone(),
        Duration::from_secs(cli.scan_interval),
    );
    let handle = syncer.start();

    let manager = Arc::new(LocalClient::new(registry, factory));
    let app = volhttp::router(manager);

    let listener = tokio::net::TcpListener::bind(cli.listen_addr)
        .await
        .with_context(|| format!("bind {}", cli.listen_addr))?;
    info!(addr = %cli.listen_addr, "manager API listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serve manager API")?;

    handle.stop();
    handle.stopped().await;
    info!("volmand stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        return;
    }
    info!("shutdown signal received");
}
