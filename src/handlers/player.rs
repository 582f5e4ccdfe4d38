// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::sync::Arc;

use serde_json::Value;
use tracing::warn;

use crate::{
    accounts::{AuthOutcome, MAX_PSEUDO_LEN, RegisterOutcome},
    handlers::{parse_body, send_status},
    models::request::CredentialsBody,
    server::{Server, clients::ClientHandle},
};

pub async fn register(
    server: &Arc<Server>,
    client: &Arc<ClientHandle>,
    body: Option<Value>,
) {
    let Some(body) = parse_body::<CredentialsBody>(client, body) else {
        return;
    };

    let pseudo = body.pseudo.as_str();
    if pseudo.is_empty() || pseudo.len() > MAX_PSEUDO_LEN {
        send_status(client, Some("player/register"), "400", "invalid pseudo");
        return;
    }

    match server.accounts.register(pseudo, &body.password).await {
        RegisterOutcome::Registered => {
            if let Err(e) = server.accounts.flush().await {
                warn!(error = %e, "account flush failed");
            }
            send_status(
                client,
                Some("player/register"),
                "201",
                "player registered successfully",
            );
        },
        RegisterOutcome::Duplicate => {
            send_status(client, Some("player/register"), "409", "pseudo already exists");
        },
        RegisterOutcome::CapacityReached => {
            send_status(client, Some("player/register"), "409", "too many accounts");
        },
    }
}

pub async fn login(
    server: &Arc<Server>,
    client: &Arc<ClientHandle>,
    body: Option<Value>,
) {
    let Some(body) = parse_body::<CredentialsBody>(client, body) else {
        return;
    };

    match server.accounts.authenticate(&body.pseudo, &body.password).await {
        AuthOutcome::Authenticated => {
            client.set_identity(&body.pseudo).await;
            send_status(client, Some("player/login"), "200", "login successful");
        },
        AuthOutcome::BadCredentials | AuthOutcome::Unknown => {
            send_status(client, Some("player/login"), "401", "invalid credentials");
        },
    }
}
