// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Direct replies to client requests.
//!
//! Every reply carries the `{action, statut, message}` envelope with a
//! stringified status code; errors for unparseable requests omit the
//! action because the originating endpoint is unknown.

use serde::Serialize;

#[derive(Serialize, Debug)]
pub struct StatusReply<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<&'a str>,
    pub statut: &'a str,
    pub message: &'a str,
}

#[derive(Serialize, Debug, Clone, Copy)]
pub struct JokerInventory {
    pub fifty: u8,
    pub skip: u8,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ThemeEntry {
    pub id: u32,
    pub name: String,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ThemesReply {
    pub action: &'static str,
    pub statut: &'static str,
    pub message: &'static str,
    pub nb_themes: usize,
    pub themes: Vec<ThemeEntry>,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    pub id: u32,
    pub name: String,
    pub theme_ids: Vec<u32>,
    pub theme_names: Vec<String>,
    pub difficulty: String,
    pub nb_questions: usize,
    pub time_limit: u32,
    pub mode: String,
    pub nb_players: usize,
    pub max_players: usize,
    pub status: &'static str,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct SessionsReply {
    pub action: &'static str,
    pub statut: &'static str,
    pub message: &'static str,
    pub nb_sessions: usize,
    /// Present only when at least one session is joinable.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sessions: Option<Vec<SessionSummary>>,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct CreateSessionReply {
    pub action: &'static str,
    pub statut: &'static str,
    pub message: &'static str,
    pub session_id: u32,
    pub is_creator: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lives: Option<i32>,
    pub jokers: JokerInventory,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct JoinSessionReply {
    pub action: &'static str,
    pub statut: &'static str,
    pub message: &'static str,
    pub session_id: u32,
    pub mode: String,
    pub is_creator: bool,
    pub players: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lives: Option<i32>,
    pub jokers: JokerInventory,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct FiftyReply {
    pub action: &'static str,
    pub statut: &'static str,
    pub message: &'static str,
    pub remaining_answers: Vec<String>,
    pub jokers: JokerInventory,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct SkipReply {
    pub action: &'static str,
    pub statut: &'static str,
    pub message: &'static str,
    pub jokers: JokerInventory,
}
