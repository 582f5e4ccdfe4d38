// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Server core: shared state, socket setup, and the accept loop.

/// Registry of connected clients.
pub mod clients;
/// Per-connection read/write loops.
pub mod connection;
/// UDP LAN discovery responder.
pub mod discovery;

use std::{net::SocketAddr, sync::Arc};

use anyhow::{Context, Result};
use tokio::{
    net::{TcpListener, TcpStream, UdpSocket},
    sync::mpsc,
    task::JoinHandle,
};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::{
    accounts::AccountRegistry,
    catalog::Catalog,
    cfg::config::Config,
    server::clients::ClientRegistry,
    session::registry::SessionRegistry,
};

/// Shared server state. Sessions and clients reference each other by id
/// only; the registries here are the arenas that resolve them.
#[derive(Debug)]
pub struct Server {
    pub cfg: Config,
    pub clients: ClientRegistry,
    pub sessions: SessionRegistry,
    pub catalog: Catalog,
    pub accounts: AccountRegistry,
    pub cancel: CancellationToken,
}

/// Live listening state returned by [`Server::serve`]. Holds the actual
/// bound addresses (ports may be ephemeral) and the long-running tasks.
#[derive(Debug)]
pub struct ServerHandle {
    pub tcp_addr: SocketAddr,
    pub udp_addr: SocketAddr,
    accept: JoinHandle<()>,
    discovery: JoinHandle<()>,
}

impl ServerHandle {
    /// Waits until shutdown has stopped both listeners.
    pub async fn wait(self) {
        let _ = self.accept.await;
        let _ = self.discovery.await;
    }
}

impl Server {
    /// Loads persistent state and builds the shared server value. A
    /// missing or empty question catalog is fatal; a missing accounts
    /// file is not.
    pub fn new(cfg: Config) -> Result<Arc<Self>> {
        let catalog = Catalog::load(
            &cfg.storage.questions_path,
            cfg.limits.max_questions,
            cfg.limits.max_themes,
        )
        .context("failed to load question catalog")?;

        let accounts =
            AccountRegistry::load(&cfg.storage.accounts_path, cfg.limits.max_accounts)
                .context("failed to load accounts")?;

        Ok(Arc::new(Self {
            clients: ClientRegistry::new(cfg.limits.max_clients),
            sessions: SessionRegistry::new(cfg.limits.max_sessions),
            catalog,
            accounts,
            cancel: CancellationToken::new(),
            cfg,
        }))
    }

    /// Binds the TCP and UDP sockets and spawns the accept loop and the
    /// discovery responder.
    pub async fn serve(self: &Arc<Self>) -> Result<ServerHandle> {
        let tcp_port = self.cfg.network.tcp_port;
        let listener = TcpListener::bind(("0.0.0.0", tcp_port))
            .await
            .with_context(|| format!("failed to bind TCP port {tcp_port}"))?;
        let tcp_addr = listener.local_addr().context("no TCP local addr")?;

        let udp_port = self.cfg.network.udp_port;
        let udp = UdpSocket::bind(("0.0.0.0", udp_port))
            .await
            .with_context(|| format!("failed to bind UDP port {udp_port}"))?;
        let udp_addr = udp.local_addr().context("no UDP local addr")?;

        info!(
            name = self.cfg.server_name(),
            tcp = tcp_addr.port(),
            udp = udp_addr.port(),
            "server listening"
        );

        let accept = tokio::spawn(Arc::clone(self).accept_loop(listener));
        let discovery =
            tokio::spawn(discovery::run(Arc::clone(self), udp, tcp_addr.port()));

        Ok(ServerHandle {
            tcp_addr,
            udp_addr,
            accept,
            discovery,
        })
    }

    /// Initiates graceful shutdown: listeners and per-connection loops
    /// observe the token and wind down; session runners exit after their
    /// current broadcast.
    pub fn shutdown(&self) {
        info!("shutdown requested");
        self.cancel.cancel();
    }

    async fn accept_loop(self: Arc<Self>, listener: TcpListener) {
        loop {
            let accepted = tokio::select! {
                _ = self.cancel.cancelled() => break,
                accepted = listener.accept() => accepted,
            };

            match accepted {
                Ok((stream, addr)) => self.admit(stream, addr),
                Err(e) => warn!(error = %e, "accept failed"),
            }
        }
        info!("accept loop stopped");
    }

    fn admit(self: &Arc<Self>, stream: TcpStream, addr: SocketAddr) {
        let _ = stream.set_nodelay(true);
        let (read_half, write_half) = stream.into_split();

        let (tx, rx) = mpsc::unbounded_channel();
        let Some(client) = self.clients.attach(addr, tx) else {
            // At capacity: close without a reply.
            warn!(%addr, "rejecting connection, server full");
            return;
        };

        info!(client = client.id, %addr, total = self.clients.len(), "client connected");

        tokio::spawn(connection::write_loop(
            rx,
            write_half,
            self.cancel.clone(),
        ));
        tokio::spawn(connection::read_loop(Arc::clone(self), client, read_half));
    }
}
