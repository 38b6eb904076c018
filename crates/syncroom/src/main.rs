use std::sync::Arc;

use clap::Parser;
use syncroom::prelude::*;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Exits with a usage error before anything binds if MONGODB_URI is unset.
    let config = ServerConfig::parse();

    init_tracing(config.json_logs);

    tracing::info!("syncroom v{} starting", env!("CARGO_PKG_VERSION"));

    let mongo = config.mongo();
    tracing::info!(
        database = %mongo.database,
        collection = %mongo.collection,
        "room store configured, connecting on first use"
    );
    let store = Arc::new(MongoRoomStore::new(mongo));

    let server = SyncServerBuilder::new()
        .bind(&config.bind_addr())
        .allowed_origins(config.origins())
        .build(store)
        .await?;

    tracing::info!(
        addr = %server.local_addr()?,
        origins = ?config.origins(),
        "syncroom listening"
    );

    server.run_until(shutdown_signal()).await?;

    tracing::info!("syncroom server closed");
    Ok(())
}

fn init_tracing(json: bool) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("syncroom=info"));
    if json {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().pretty().with_env_filter(filter).init();
    }
}

/// Resolves on SIGINT or SIGTERM.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        match (signal(SignalKind::interrupt()), signal(SignalKind::terminate())) {
            (Ok(mut sigint), Ok(mut sigterm)) => {
                tokio::select! {
                    _ = sigint.recv() => tracing::info!("SIGINT received, shutting down gracefully"),
                    _ = sigterm.recv() => tracing::info!("SIGTERM received, shutting down gracefully"),
                }
                return;
            }
            (Err(e), _) | (_, Err(e)) => {
                tracing::warn!(error = %e, "failed to install signal handlers, using ctrl-c only");
            }
        }
    }

    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("ctrl-c received, shutting down gracefully"),
        Err(e) => {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    }
}
