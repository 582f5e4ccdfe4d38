// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Game sessions.
//!
//! A session is a lobby that becomes a synchronized game: up to
//! `max_players` players answer the same ordered sequence of questions
//! under a shared deadline. All mutable state sits behind one mutex per
//! session; the timing task in [`runner`] serializes question dispatch,
//! results, and advancement, so no two rounds are ever in flight.

/// Lifecycle operations and round bookkeeping.
pub mod engine;
/// Registry of live sessions.
pub mod registry;
/// Per-session timing task.
pub mod runner;

use std::fmt;

use thiserror::Error;
use tokio::{
    sync::{Mutex, Notify},
    time::Instant,
};

use crate::catalog::Difficulty;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Solo,
    Battle,
}

impl Mode {
    /// Lenient like the rest of the protocol: anything that is not
    /// "battle" is solo.
    pub fn parse(s: &str) -> Self {
        if s.trim().eq_ignore_ascii_case("battle") {
            Self::Battle
        } else {
            Self::Solo
        }
    }

    pub fn is_battle(self) -> bool {
        self == Self::Battle
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Solo => "solo",
            Self::Battle => "battle",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Waiting,
    Playing,
    Finished,
}

/// Immutable session parameters, fixed at creation.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub name: String,
    pub theme_ids: Vec<u32>,
    pub difficulty: Difficulty,
    pub num_questions: usize,
    /// Per-question deadline, seconds.
    pub time_limit: u32,
    pub mode: Mode,
    /// Starting lives; 0 outside battle mode.
    pub initial_lives: i32,
    pub max_players: usize,
}

/// One player's in-session state, including the per-round fields that
/// are reset on every question dispatch.
#[derive(Debug, Clone)]
pub struct SessionPlayer {
    pub client_id: u32,
    /// Name snapshot taken at join time.
    pub pseudo: String,
    pub score: i64,
    pub lives: i32,
    pub correct_answers: u32,
    pub has_answered: bool,
    pub was_correct: bool,
    /// Chosen index; -1 none, -2 skipped.
    pub current_answer: i32,
    pub response_time: f64,
    pub eliminated: bool,
    /// 1-based question number of the elimination, 0 if still in.
    pub eliminated_at: u32,
    pub joker_fifty_used: bool,
    pub joker_skip_used: bool,
    pub used_skip_this_question: bool,
}

impl SessionPlayer {
    pub fn new(client_id: u32, pseudo: String, lives: i32) -> Self {
        Self {
            client_id,
            pseudo,
            score: 0,
            lives,
            correct_answers: 0,
            has_answered: false,
            was_correct: false,
            current_answer: -1,
            response_time: 0.0,
            eliminated: false,
            eliminated_at: 0,
            joker_fifty_used: false,
            joker_skip_used: false,
            used_skip_this_question: false,
        }
    }

    pub(crate) fn reset_round(&mut self) {
        self.has_answered = false;
        self.was_correct = false;
        self.current_answer = -1;
        self.response_time = 0.0;
        self.used_skip_this_question = false;
    }
}

/// The mutable half of a session, guarded by [`Session::state`].
#[derive(Debug)]
pub struct SessionState {
    pub status: SessionStatus,
    pub players: Vec<SessionPlayer>,
    pub creator_client_id: u32,
    /// Cursor into `question_ids`; meaningful only while playing.
    pub current_question: usize,
    pub question_start: Option<Instant>,
}

#[derive(Debug)]
pub struct Session {
    pub id: u32,
    pub cfg: SessionConfig,
    /// The pre-selected ordered question ids, exactly `num_questions`.
    pub question_ids: Vec<u32>,
    pub(crate) state: Mutex<SessionState>,
    /// Signalled with `notify_one` on every recorded answer, skip, and
    /// departure so the runner re-evaluates the completion predicate.
    /// The timing task is the only waiter; the stored permit reaches it
    /// even when the signal lands before its `Notified` future is polled.
    pub(crate) round_notify: Notify,
}

impl Session {
    pub fn new(
        id: u32,
        cfg: SessionConfig,
        question_ids: Vec<u32>,
        creator_client_id: u32,
    ) -> Self {
        Self {
            id,
            cfg,
            question_ids,
            state: Mutex::new(SessionState {
                status: SessionStatus::Waiting,
                players: Vec::new(),
                creator_client_id,
                current_question: 0,
                question_start: None,
            }),
            round_notify: Notify::new(),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum JoinError {
    #[error("session not waiting")]
    NotWaiting,
    #[error("session is full")]
    Full,
    #[error("already in session")]
    AlreadyJoined,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum StartError {
    #[error("only creator can start session")]
    NotCreator,
    #[error("need at least 2 players")]
    NotEnoughPlayers,
    #[error("session already started")]
    AlreadyStarted,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum JokerError {
    #[error("player not found")]
    NotInSession,
    #[error("joker not available")]
    NotAvailable,
}
