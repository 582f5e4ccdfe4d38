// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::sync::Arc;

use tokio::net::UdpSocket;
use tracing::{debug, info, warn};

use crate::server::Server;

/// The literal probe LAN clients broadcast when scanning for servers.
const DISCOVERY_PROBE: &str = "looking for quiznet servers";

/// Answers discovery probes with the server name and game port until
/// shutdown. Anything that is not the exact probe text is ignored.
pub async fn run(server: Arc<Server>, socket: UdpSocket, tcp_port: u16) {
    let name = server.cfg.server_name();
    let reply = format!("hello i'm a quiznet server:{name}:{tcp_port}");
    info!(name, "discovery responder started");

    let mut buf = [0u8; 256];
    loop {
        let (len, peer) = tokio::select! {
            _ = server.cancel.cancelled() => break,
            received = socket.recv_from(&mut buf) => match received {
                Ok(r) => r,
                Err(e) => {
                    warn!(error = %e, "discovery receive failed");
                    break;
                },
            },
        };

        let probe = String::from_utf8_lossy(&buf[..len]);
        if probe == DISCOVERY_PROBE {
            debug!(%peer, "discovery probe");
            if let Err(e) = socket.send_to(reply.as_bytes(), peer).await {
                warn!(%peer, error = %e, "discovery reply failed");
            }
        } else {
            debug!(%peer, "ignoring unknown datagram");
        }
    }

    info!("discovery responder stopped");
}
