// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Server-initiated frames: lobby notifications, question dispatch,
//! round results, eliminations, and the final ranking.

use serde::Serialize;

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct PlayerJoined {
    pub action: &'static str,
    pub pseudo: String,
    pub nb_players: usize,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct PlayerLeft {
    pub action: &'static str,
    pub pseudo: String,
    pub reason: &'static str,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct SessionStarted {
    pub action: &'static str,
    pub message: &'static str,
    pub countdown: u64,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct QuestionNew {
    pub action: &'static str,
    pub question_num: usize,
    pub total_questions: usize,
    #[serde(rename = "type")]
    pub kind: String,
    pub difficulty: String,
    pub question: String,
    pub time_limit: u32,
    /// The four options, multi-choice only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub answers: Option<Vec<String>>,
}

/// The correct answer as echoed in results: an option index for
/// multi-choice and boolean questions, the first accepted string for
/// free-text.
#[derive(Serialize, Debug)]
#[serde(untagged)]
pub enum CorrectAnswer {
    Index(i32),
    Text(String),
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct PlayerRoundResult {
    pub pseudo: String,
    /// Chosen index, -1 for no answer, -2 for a skip.
    pub answer: i32,
    pub correct: bool,
    pub points: i64,
    pub total_score: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_time: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lives: Option<i32>,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct QuestionResults {
    pub action: &'static str,
    pub correct_answer: CorrectAnswer,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
    /// Battle only: the slowest responder of the round.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_player: Option<String>,
    pub results: Vec<PlayerRoundResult>,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct PlayerEliminated {
    pub action: &'static str,
    pub pseudo: String,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct RankEntry {
    pub rank: usize,
    pub pseudo: String,
    pub score: i64,
    pub correct_answers: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lives: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub eliminated_at: Option<u32>,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct SessionFinished {
    pub action: &'static str,
    pub mode: String,
    /// Battle only: the rank-1 player.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub winner: Option<String>,
    pub ranking: Vec<RankEntry>,
}
