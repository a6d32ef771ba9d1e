//! stowaway server entry point.
//!
//! Boots the offline cache worker (install, then activate) and serves it on
//! the MCP stdio transport. Logging goes to stderr to avoid interfering with
//! the JSON-RPC protocol on stdout.

use std::sync::Arc;

use anyhow::Result;
use rmcp::service::serve_server;
use rmcp::transport::io::stdio;
use stowaway_client::{FetchClient, FetchConfig, OfflineWorker, SystemClock};
use stowaway_core::{AppConfig, CacheDb};
use tracing_subscriber::EnvFilter;

mod error;
mod handler;
mod tools;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = AppConfig::load()?;
    tracing::info!(
        db_path = %config.db_path.display(),
        origin = %config.origin,
        cache_version = %config.cache_version,
        "Starting stowaway on stdio transport"
    );

    let db = CacheDb::open(&config.db_path).await?;
    let network = Arc::new(FetchClient::new(FetchConfig::from_app_config(&config))?);
    let worker = Arc::new(OfflineWorker::new(&config, db, network, Arc::new(SystemClock))?);

    // a failed boot leaves requests passing straight through
    match worker.install().await {
        Ok(_) => {
            let state = worker.activate().await?;
            tracing::info!(?state, "worker booted");
        }
        Err(e) => tracing::error!(error = %e, state = ?worker.state(), "install failed; serving without cache"),
    }

    let handler = handler::StowawayServer::new(worker.clone());
    let server = serve_server(handler, stdio()).await?;

    tokio::select! {
        quit = server.waiting() => {
            let reason = quit?;
            tracing::info!(?reason, "transport closed");
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("interrupted");
        }
    }

    worker.shutdown().await;
    worker.engine().db().clone().close().await?;

    Ok(())
}
