// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info};

use crate::{
    catalog::Difficulty,
    handlers::{parse_body, reply, send_status},
    models::{
        request::{CreateSessionBody, JoinSessionBody},
        response::{
            CreateSessionReply, JoinSessionReply, JokerInventory, SessionSummary,
            SessionsReply,
        },
    },
    server::{Server, clients::ClientHandle},
    session::{
        JoinError, Mode, Session, SessionConfig, SessionStatus, StartError, runner,
    },
};

pub async fn list(server: &Arc<Server>, client: &Arc<ClientHandle>) {
    let mut sessions = server.sessions.all();
    sessions.sort_by_key(|s| s.id);

    let mut summaries: Vec<SessionSummary> = Vec::new();
    for session in sessions {
        if let Some(summary) = summarize(&session, server).await {
            summaries.push(summary);
        }
    }

    reply(client, &SessionsReply {
        action: "sessions/list",
        statut: "200",
        message: "ok",
        nb_sessions: summaries.len(),
        sessions: (!summaries.is_empty()).then_some(summaries),
    });
}

async fn summarize(session: &Session, server: &Arc<Server>) -> Option<SessionSummary> {
    let st = session.state.lock().await;
    if st.status != SessionStatus::Waiting {
        return None;
    }

    let themes = server.catalog.themes();
    Some(SessionSummary {
        id: session.id,
        name: session.cfg.name.clone(),
        theme_ids: session.cfg.theme_ids.clone(),
        theme_names: session
            .cfg
            .theme_ids
            .iter()
            .filter_map(|id| themes.iter().find(|t| t.id == *id))
            .map(|t| t.name.clone())
            .collect(),
        difficulty: session.cfg.difficulty.to_string(),
        nb_questions: session.cfg.num_questions,
        time_limit: session.cfg.time_limit,
        mode: session.cfg.mode.to_string(),
        nb_players: st.players.len(),
        max_players: session.cfg.max_players,
        status: "waiting",
    })
}

/// True while the client still belongs to a session that has not
/// finished; a client is in at most one session at a time.
async fn in_active_session(server: &Arc<Server>, client: &ClientHandle) -> bool {
    let Some(session_id) = client.session_id() else {
        return false;
    };
    match server.sessions.get(session_id) {
        Some(session) => session.status().await != SessionStatus::Finished,
        None => false,
    }
}

pub async fn create(
    server: &Arc<Server>,
    client: &Arc<ClientHandle>,
    body: Option<Value>,
) {
    if !client.is_authenticated() {
        send_status(client, Some("session/create"), "401", "not authenticated");
        return;
    }
    let Some(body) = parse_body::<CreateSessionBody>(client, body) else {
        return;
    };
    if in_active_session(server, client).await {
        send_status(client, Some("session/create"), "400", "already in a session");
        return;
    }

    let mode = Mode::parse(&body.mode);
    let initial_lives = if mode.is_battle() {
        let Some(lives) = body.lives else {
            send_status(
                client,
                Some("session/create"),
                "400",
                "lives required for battle mode",
            );
            return;
        };
        if !(1..=10).contains(&lives) {
            send_status(
                client,
                Some("session/create"),
                "400",
                "lives must be between 1 and 10",
            );
            return;
        }
        lives
    } else {
        0
    };

    if !(10..=50).contains(&body.nb_questions)
        || !(10..=60).contains(&body.time_limit)
        || body.max_players < 2
    {
        send_status(client, Some("session/create"), "400", "invalid parameters");
        return;
    }

    let difficulty = Difficulty::parse(&body.difficulty);
    let num_questions = body.nb_questions as usize;
    let Some(question_ids) =
        server
            .catalog
            .select(difficulty, &body.theme_ids, num_questions)
    else {
        send_status(
            client,
            Some("session/create"),
            "400",
            "not enough questions matching criteria",
        );
        return;
    };

    let cfg = SessionConfig {
        name: body.name,
        theme_ids: body.theme_ids,
        difficulty,
        num_questions,
        time_limit: body.time_limit,
        mode,
        initial_lives,
        max_players: body.max_players as usize,
    };

    let Ok(session) = server.sessions.create(cfg, question_ids, client.id).await
    else {
        send_status(
            client,
            Some("session/create"),
            "400",
            "maximum number of sessions reached",
        );
        return;
    };

    // The creator becomes the first player.
    let pseudo = client.pseudo().await;
    if let Err(e) = session.join(&server.clients, client.id, &pseudo).await {
        debug!(session = session.id, error = %e, "creator join failed");
    }
    client.set_session_id(Some(session.id));
    info!(session = session.id, creator = %pseudo, "session created");

    reply(client, &CreateSessionReply {
        action: "session/create",
        statut: "201",
        message: "session created",
        session_id: session.id,
        is_creator: true,
        lives: mode.is_battle().then_some(initial_lives),
        jokers: JokerInventory { fifty: 1, skip: 1 },
    });
}

pub async fn join(
    server: &Arc<Server>,
    client: &Arc<ClientHandle>,
    body: Option<Value>,
) {
    if !client.is_authenticated() {
        send_status(client, Some("session/join"), "401", "not authenticated");
        return;
    }
    let Some(body) = parse_body::<JoinSessionBody>(client, body) else {
        return;
    };
    if in_active_session(server, client).await {
        send_status(client, Some("session/join"), "400", "already in a session");
        return;
    }

    let Some(session) = server.sessions.get(body.session_id) else {
        send_status(client, Some("session/join"), "404", "session not found");
        return;
    };

    let pseudo = client.pseudo().await;
    match session.join(&server.clients, client.id, &pseudo).await {
        Ok(snapshot) => {
            client.set_session_id(Some(session.id));
            reply(client, &JoinSessionReply {
                action: "session/join",
                // "201" kept for client compatibility even though the
                // session already existed.
                statut: "201",
                message: "session joined",
                session_id: snapshot.session_id,
                mode: snapshot.mode.to_string(),
                is_creator: snapshot.is_creator,
                players: snapshot.players,
                lives: snapshot.lives,
                jokers: JokerInventory { fifty: 1, skip: 1 },
            });
        },
        Err(JoinError::Full) => {
            send_status(client, Some("session/join"), "403", "session is full");
        },
        Err(JoinError::NotWaiting | JoinError::AlreadyJoined) => {
            send_status(client, Some("session/join"), "400", "cannot join session");
        },
    }
}

pub async fn start(server: &Arc<Server>, client: &Arc<ClientHandle>) {
    let Some(session_id) = client.session_id() else {
        send_status(client, Some("session/start"), "400", "not in a session");
        return;
    };
    let Some(session) = server.sessions.get(session_id) else {
        send_status(client, Some("session/start"), "404", "session not found");
        return;
    };

    let countdown = server.cfg.timers.countdown;
    match session.begin(&server.clients, client.id, countdown).await {
        Ok(()) => {
            // No direct reply: the `session/started` broadcast is the
            // acknowledgement.
            runner::spawn(Arc::clone(server), session);
        },
        Err(e @ StartError::NotCreator) => {
            send_status(client, Some("session/start"), "403", &e.to_string());
        },
        Err(e) => {
            send_status(client, Some("session/start"), "400", &e.to_string());
        },
    }
}
