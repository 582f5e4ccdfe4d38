// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Per-connection read and write loops.
//!
//! Requests arrive as newline-terminated lines: `GET <endpoint>` on one
//! line, or `POST <endpoint>` followed by one line of JSON body. Replies
//! and pushed frames leave through a per-client channel drained by the
//! writer task, so broadcasts never block on a slow socket.

use std::sync::Arc;

use tokio::{
    io::{AsyncBufRead, AsyncBufReadExt, AsyncWriteExt, BufReader},
    net::tcp::{OwnedReadHalf, OwnedWriteHalf},
    sync::mpsc,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::{handlers, server::Server, server::clients::ClientHandle};

/// Longest accepted request line. Anything beyond this is a protocol
/// violation and terminates the connection.
const MAX_LINE_LEN: usize = 8192;

/// Reads one `\n`-terminated line, accumulating across partial reads.
/// Returns `None` on a clean EOF. The trailing `\r`, if any, is stripped.
async fn read_line_bounded<R: AsyncBufRead + Unpin>(
    reader: &mut R,
    max: usize,
) -> std::io::Result<Option<String>> {
    let mut line: Vec<u8> = Vec::new();
    loop {
        let available = reader.fill_buf().await?;
        if available.is_empty() {
            if line.is_empty() {
                return Ok(None);
            }
            return Ok(Some(finish_line(line)));
        }

        if let Some(pos) = available.iter().position(|&b| b == b'\n') {
            line.extend_from_slice(&available[..pos]);
            reader.consume(pos + 1);
            return Ok(Some(finish_line(line)));
        }

        line.extend_from_slice(available);
        let consumed = available.len();
        reader.consume(consumed);

        if line.len() > max {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                "request line too long",
            ));
        }
    }
}

fn finish_line(mut raw: Vec<u8>) -> String {
    if raw.last() == Some(&b'\r') {
        raw.pop();
    }
    String::from_utf8_lossy(&raw).into_owned()
}

/// Drives one client's inbound side until EOF, error, or shutdown, then
/// detaches the client from its session and the registry.
pub async fn read_loop(
    server: Arc<Server>,
    client: Arc<ClientHandle>,
    read_half: OwnedReadHalf,
) {
    let mut reader = BufReader::new(read_half);
    // A POST line waiting for its JSON body line.
    let mut pending: Option<(String, String)> = None;

    loop {
        let line = tokio::select! {
            _ = server.cancel.cancelled() => break,
            read = read_line_bounded(&mut reader, MAX_LINE_LEN) => match read {
                Ok(Some(line)) => line,
                Ok(None) => break,
                Err(e) => {
                    warn!(client = client.id, error = %e, "read failed");
                    break;
                },
            },
        };

        if line.trim().is_empty() {
            continue;
        }

        if let Some((method, endpoint)) = pending.take() {
            let body = serde_json::from_str(&line).ok();
            handlers::dispatch(&server, &client, &method, &endpoint, body).await;
            continue;
        }

        let mut tokens = line.split_whitespace();
        match (tokens.next(), tokens.next()) {
            (Some("GET"), Some(endpoint)) => {
                handlers::dispatch(&server, &client, "GET", endpoint, None).await;
            },
            (Some("POST"), Some(endpoint)) => {
                pending = Some(("POST".to_string(), endpoint.to_string()));
            },
            _ => {
                debug!(client = client.id, line, "unparseable request line");
                handlers::bad_request(&client);
            },
        }
    }

    disconnect(&server, &client).await;
}

async fn disconnect(server: &Arc<Server>, client: &Arc<ClientHandle>) {
    info!(client = client.id, addr = %client.addr, "client disconnecting");

    if let Some(session_id) = client.session_id()
        && let Some(session) = server.sessions.get(session_id)
    {
        session.leave(&server.clients, client.id).await;
    }
    client.set_session_id(None);
    server.clients.remove(client.id);
}

/// Drains the outbound channel into the socket. Exits when the channel
/// closes (client removed), the socket fails, or the server shuts down.
pub async fn write_loop(
    mut rx: mpsc::UnboundedReceiver<String>,
    mut write_half: OwnedWriteHalf,
    cancel: CancellationToken,
) {
    loop {
        let frame = tokio::select! {
            _ = cancel.cancelled() => break,
            frame = rx.recv() => match frame {
                Some(frame) => frame,
                None => break,
            },
        };

        let mut bytes = frame.into_bytes();
        bytes.push(b'\n');
        if write_half.write_all(&bytes).await.is_err() {
            break;
        }
    }

    let _ = write_half.shutdown().await;
}
