// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Protocol router.
//!
//! Requests are `<METHOD> <endpoint>` lines with an optional JSON body
//! line; the router picks the handler, the handlers validate and reply.
//! Replies that cannot name their endpoint (unparseable requests) omit
//! the `action` field.

/// Themes listing and answer submission.
pub mod game;
/// Joker activation.
pub mod joker;
/// Registration and login.
pub mod player;
/// Session listing, creation, joining, and starting.
pub mod session;

use std::sync::Arc;

use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;
use tracing::debug;

use crate::{
    models::{response::StatusReply, to_frame},
    server::{Server, clients::ClientHandle},
};

pub async fn dispatch(
    server: &Arc<Server>,
    client: &Arc<ClientHandle>,
    method: &str,
    endpoint: &str,
    body: Option<Value>,
) {
    debug!(client = client.id, method, endpoint, "request");

    match (method, endpoint) {
        ("POST", "player/register") => player::register(server, client, body).await,
        ("POST", "player/login") => player::login(server, client, body).await,
        ("POST", "session/create") => session::create(server, client, body).await,
        ("POST", "session/join") => session::join(server, client, body).await,
        ("POST", "session/start") => session::start(server, client).await,
        ("POST", "question/answer") => game::answer(server, client, body).await,
        ("POST", "joker/use") => joker::use_joker(server, client, body).await,
        ("GET", "themes/list") => game::themes(server, client),
        ("GET", "sessions/list") => session::list(server, client).await,
        ("GET" | "POST", _) => {
            debug!(method, endpoint, "unknown endpoint");
            unknown_error(client);
        },
        _ => {
            debug!(method, "unknown method");
            bad_request(client);
        },
    }
}

pub fn reply<T: Serialize>(client: &ClientHandle, value: &T) {
    client.send(to_frame(value));
}

pub fn send_status(
    client: &ClientHandle,
    action: Option<&str>,
    statut: &str,
    message: &str,
) {
    reply(client, &StatusReply {
        action,
        statut,
        message,
    });
}

pub fn bad_request(client: &ClientHandle) {
    send_status(client, None, "400", "Bad request");
}

pub fn unknown_error(client: &ClientHandle) {
    send_status(client, None, "520", "Unknown Error");
}

/// Parses a required POST body into its typed form, answering 400 when
/// it is absent or malformed.
fn parse_body<T: DeserializeOwned>(
    client: &ClientHandle,
    body: Option<Value>,
) -> Option<T> {
    let Some(value) = body else {
        bad_request(client);
        return None;
    };
    match serde_json::from_value(value) {
        Ok(parsed) => Some(parsed),
        Err(e) => {
            debug!(client = client.id, error = %e, "malformed body");
            bad_request(client);
            None
        },
    }
}
