// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::sync::Arc;

use serde_json::Value;

use crate::{
    handlers::{parse_body, reply, send_status},
    models::{
        request::JokerBody,
        response::{FiftyReply, SkipReply},
    },
    server::{Server, clients::ClientHandle},
    session::SessionStatus,
};

pub async fn use_joker(
    server: &Arc<Server>,
    client: &Arc<ClientHandle>,
    body: Option<Value>,
) {
    let Some(session_id) = client.session_id() else {
        send_status(client, Some("joker/use"), "400", "not in a session");
        return;
    };
    let session = server.sessions.get(session_id);
    let playing = match &session {
        Some(s) => s.status().await == SessionStatus::Playing,
        None => false,
    };
    let Some(session) = session.filter(|_| playing) else {
        send_status(client, Some("joker/use"), "400", "session not playing");
        return;
    };

    let Some(body) = parse_body::<JokerBody>(client, body) else {
        return;
    };

    if !session.is_player(client.id).await {
        send_status(client, Some("joker/use"), "400", "player not found");
        return;
    }

    match body.kind.as_str() {
        "fifty" => match session.use_fifty(&server.catalog, client.id).await {
            Ok(outcome) => reply(client, &FiftyReply {
                action: "joker/use",
                statut: "200",
                message: "joker activated",
                remaining_answers: outcome.remaining_answers,
                jokers: outcome.jokers,
            }),
            Err(_) => {
                send_status(client, Some("joker/use"), "400", "joker not available");
            },
        },
        "skip" => match session.use_skip(client.id).await {
            Ok(jokers) => reply(client, &SkipReply {
                action: "joker/use",
                statut: "200",
                message: "question skipped",
                jokers,
            }),
            Err(_) => {
                send_status(client, Some("joker/use"), "400", "joker not available");
            },
        },
        _ => send_status(client, Some("joker/use"), "400", "unknown joker type"),
    }
}
