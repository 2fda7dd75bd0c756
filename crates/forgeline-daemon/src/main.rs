//! forgelined - Build event ingestion daemon.
//!
//! Serves the build event publish endpoints on a Unix domain socket. An
//! optional first argument names a TOML config file; without it the
//! defaults apply. Log verbosity follows `RUST_LOG`.

use std::path::Path;

use anyhow::{Context, Result};
use forgeline_daemon::config::DaemonConfig;
use forgeline_daemon::protocol::EventServer;
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "multi_thread")]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = match std::env::args().nth(1) {
        Some(path) => DaemonConfig::from_file(Path::new(&path))
            .with_context(|| format!("failed to load config from {path}"))?,
        None => DaemonConfig::default(),
    };

    let server = EventServer::bind(&config).context("failed to bind event server")?;
    server.run().await.context("event server terminated")?;
    Ok(())
}
