// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::sync::Arc;

use serde_json::Value;

use crate::{
    handlers::{parse_body, reply, send_status},
    models::{
        request::AnswerBody,
        response::{ThemeEntry, ThemesReply},
    },
    server::{Server, clients::ClientHandle},
    session::SessionStatus,
};

pub fn themes(server: &Arc<Server>, client: &Arc<ClientHandle>) {
    let themes: Vec<ThemeEntry> = server
        .catalog
        .themes()
        .iter()
        .map(|t| ThemeEntry {
            id: t.id,
            name: t.name.clone(),
        })
        .collect();

    reply(client, &ThemesReply {
        action: "themes/list",
        statut: "200",
        message: "ok",
        nb_themes: themes.len(),
        themes,
    });
}

pub async fn answer(
    server: &Arc<Server>,
    client: &Arc<ClientHandle>,
    body: Option<Value>,
) {
    let Some(session_id) = client.session_id() else {
        send_status(client, Some("question/answer"), "400", "not in a session");
        return;
    };
    let session = server.sessions.get(session_id);
    let playing = match &session {
        Some(s) => s.status().await == SessionStatus::Playing,
        None => false,
    };
    let Some(session) = session.filter(|_| playing) else {
        send_status(client, Some("question/answer"), "400", "session not playing");
        return;
    };

    let Some(body) = parse_body::<AnswerBody>(client, body) else {
        return;
    };

    session
        .record_answer(
            &server.catalog,
            client.id,
            body.answer,
            body.response_time,
            server.cfg.timers.answer_grace,
        )
        .await;

    send_status(client, Some("question/answer"), "200", "answer received");
}
