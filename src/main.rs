// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use quiznet::{
    cfg::{cli::Cli, logger::init_logger},
    server::Server,
};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let cfg = cli.into_config().context("invalid configuration")?;
    let _log_guard = init_logger(&cfg.logging.level)?;

    info!(name = cfg.server_name(), "QuizNet server starting");

    let server = Server::new(cfg).context("failed to initialize server")?;
    let handle = server.serve().await.context("failed to start listeners")?;
    spawn_signal_watcher(Arc::clone(&server));

    handle.wait().await;

    if let Err(e) = server.accounts.flush().await {
        warn!(error = %e, "final account flush failed");
    }
    info!("server stopped");
    Ok(())
}

/// First SIGINT/SIGTERM starts a graceful shutdown; a second one forces
/// the process out.
fn spawn_signal_watcher(server: Arc<Server>) {
    tokio::spawn(async move {
        shutdown_signal().await;
        info!("shutdown signal received");
        server.shutdown();

        shutdown_signal().await;
        warn!("second shutdown signal, forcing exit");
        std::process::exit(1);
    });
}

#[cfg(unix)]
async fn shutdown_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    let mut terminate = match signal(SignalKind::terminate()) {
        Ok(s) => s,
        Err(e) => {
            warn!(error = %e, "cannot install SIGTERM handler");
            let _ = tokio::signal::ctrl_c().await;
            return;
        },
    };

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {},
        _ = terminate.recv() => {},
    }
}

#[cfg(not(unix))]
async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}
