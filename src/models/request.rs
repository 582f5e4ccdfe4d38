// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use serde::Deserialize;

#[derive(Deserialize, Debug)]
pub struct CredentialsBody {
    pub pseudo: String,
    pub password: String,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct CreateSessionBody {
    pub name: String,
    pub theme_ids: Vec<u32>,
    pub difficulty: String,
    pub nb_questions: u32,
    pub time_limit: u32,
    pub mode: String,
    pub max_players: u32,
    /// Required when mode is battle, checked by the handler.
    #[serde(default)]
    pub lives: Option<i32>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct JoinSessionBody {
    pub session_id: u32,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct AnswerBody {
    /// Absent or mistyped answers count as "no answer", never as a parse
    /// error.
    #[serde(default)]
    pub answer: Option<AnswerValue>,
    pub response_time: f64,
}

#[derive(Deserialize, Debug)]
pub struct JokerBody {
    #[serde(rename = "type")]
    pub kind: String,
}

/// An answer as submitted on the wire: an option index, a free-text
/// string, or a boolean.
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum AnswerValue {
    Bool(bool),
    Number(i64),
    Text(String),
}

impl AnswerValue {
    pub fn as_index(&self) -> Option<i32> {
        match self {
            Self::Number(n) => i32::try_from(*n).ok(),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// The value recorded in per-round state and echoed in results:
    /// the chosen index, booleans as 0/1, and -1 for anything else.
    pub fn recorded_index(&self) -> i32 {
        match self {
            Self::Number(n) => i32::try_from(*n).unwrap_or(-1),
            Self::Bool(b) => i32::from(*b),
            Self::Text(_) => -1,
        }
    }
}
