use anyhow::Context;
use clap::Parser;
use snip_gateway::{init_tracing, App, AppState, Cli, Config};
use snip_storage::worker::DEFAULT_QUEUE_CAPACITY;
use snip_storage::{open_storage, DeleteWorker};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_cli(Cli::parse())?;
    init_tracing(config.log_format)?;

    info!(
        server_address = %config.server_address,
        base_url = %config.base_url,
        log_format = %config.log_format,
        "starting snip gateway"
    );

    let storage = open_storage(&config.storage)
        .await
        .context("failed to open storage")?;
    let (deletes, worker) = DeleteWorker::spawn(Arc::clone(&storage), DEFAULT_QUEUE_CAPACITY);
    let app = App::router(AppState::new(storage, deletes, config.base_url.clone()));

    let listener = TcpListener::bind(&config.server_address)
        .await
        .with_context(|| format!("failed to bind {}", config.server_address))?;
    info!(listen_addr = %listener.local_addr()?, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // the router held the last queue handle; let the worker drain
    worker.await?;
    info!("snip gateway stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}
