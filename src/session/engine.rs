// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Session lifecycle operations and round bookkeeping.
//!
//! Every operation takes the session mutex, mutates, and broadcasts
//! before releasing it; unicast sends only push onto per-client channels
//! and never block. Lock order is always session -> client registry.

use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::{
    catalog::{Catalog, Question, QuestionKind, score},
    models::{
        frames::{
            CorrectAnswer, PlayerEliminated, PlayerJoined, PlayerLeft,
            PlayerRoundResult, QuestionNew, QuestionResults, RankEntry,
            SessionFinished, SessionStarted,
        },
        request::AnswerValue,
        response::JokerInventory,
        to_frame,
    },
    server::clients::ClientRegistry,
    session::{
        JoinError, JokerError, Mode, Session, SessionPlayer, SessionStatus,
        StartError,
    },
};

/// What the joining player needs for their reply.
#[derive(Debug)]
pub struct JoinSnapshot {
    pub session_id: u32,
    pub mode: Mode,
    pub is_creator: bool,
    pub players: Vec<String>,
    pub lives: Option<i32>,
}

#[derive(Debug)]
pub struct FiftyOutcome {
    /// The two options left visible, in original order.
    pub remaining_answers: Vec<String>,
    pub jokers: JokerInventory,
}

/// Outcome of a results emission, as seen by the timing task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundOutcome {
    Continue,
    Ended,
}

/// Whether the current round can be resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundWait {
    Pending,
    Complete,
    Over,
}

impl Session {
    pub async fn status(&self) -> SessionStatus {
        self.state.lock().await.status
    }

    pub async fn player_count(&self) -> usize {
        self.state.lock().await.players.len()
    }

    pub async fn is_player(&self, client_id: u32) -> bool {
        self.state
            .lock()
            .await
            .players
            .iter()
            .any(|p| p.client_id == client_id)
    }

    /// Adds a player to a waiting session and tells the others.
    pub async fn join(
        &self,
        clients: &ClientRegistry,
        client_id: u32,
        pseudo: &str,
    ) -> Result<JoinSnapshot, JoinError> {
        let mut st = self.state.lock().await;

        if st.status != SessionStatus::Waiting {
            return Err(JoinError::NotWaiting);
        }
        if st.players.len() >= self.cfg.max_players {
            return Err(JoinError::Full);
        }
        if st.players.iter().any(|p| p.client_id == client_id) {
            return Err(JoinError::AlreadyJoined);
        }

        st.players.push(SessionPlayer::new(
            client_id,
            pseudo.to_string(),
            self.cfg.initial_lives,
        ));
        let nb_players = st.players.len();
        info!(
            session = self.id,
            pseudo,
            players = nb_players,
            max = self.cfg.max_players,
            "player joined"
        );

        let frame = to_frame(&PlayerJoined {
            action: "session/player/joined",
            pseudo: pseudo.to_string(),
            nb_players,
        });
        for p in &st.players[..nb_players - 1] {
            clients.send_to(p.client_id, frame.clone());
        }

        Ok(JoinSnapshot {
            session_id: self.id,
            mode: self.cfg.mode,
            is_creator: st.creator_client_id == client_id,
            players: st.players.iter().map(|p| p.pseudo.clone()).collect(),
            lives: self.cfg.mode.is_battle().then_some(self.cfg.initial_lives),
        })
    }

    /// Removes a player, hands creatorship over if needed, and ends the
    /// session when it can no longer continue. Returns false when the
    /// client was not a member.
    pub async fn leave(&self, clients: &ClientRegistry, client_id: u32) -> bool {
        let mut st = self.state.lock().await;

        let Some(idx) = st.players.iter().position(|p| p.client_id == client_id)
        else {
            return false;
        };
        let leaving = st.players.remove(idx);
        info!(session = self.id, pseudo = %leaving.pseudo, "player left");

        if client_id == st.creator_client_id
            && let Some(first_client_id) = st.players.first().map(|p| p.client_id)
        {
            st.creator_client_id = first_client_id;
            debug!(session = self.id, creator = first_client_id, "new creator");
        }

        let frame = to_frame(&PlayerLeft {
            action: "session/player/left",
            pseudo: leaving.pseudo,
            reason: "disconnected",
        });
        for p in &st.players {
            clients.send_to(p.client_id, frame.clone());
        }

        if st.players.is_empty() {
            st.status = SessionStatus::Finished;
            drop(st);
            self.round_notify.notify_one();
            return true;
        }

        let abandoned =
            st.status == SessionStatus::Playing && st.players.len() == 1;
        drop(st);

        if abandoned {
            self.finish(clients).await;
        }
        self.round_notify.notify_one();
        true
    }

    /// Transitions waiting -> playing and broadcasts the start countdown.
    /// The caller spawns the timing task on success.
    pub async fn begin(
        &self,
        clients: &ClientRegistry,
        client_id: u32,
        countdown: Duration,
    ) -> Result<(), StartError> {
        let mut st = self.state.lock().await;

        if st.creator_client_id != client_id {
            return Err(StartError::NotCreator);
        }
        if st.status != SessionStatus::Waiting {
            return Err(StartError::AlreadyStarted);
        }
        if st.players.len() < 2 {
            return Err(StartError::NotEnoughPlayers);
        }

        st.status = SessionStatus::Playing;
        st.current_question = 0;
        info!(session = self.id, players = st.players.len(), "session starting");

        let frame = to_frame(&SessionStarted {
            action: "session/started",
            message: "session is starting",
            countdown: countdown.as_secs(),
        });
        for p in &st.players {
            clients.send_to(p.client_id, frame.clone());
        }
        Ok(())
    }

    /// Resets per-round player state, stamps the question start, and
    /// sends `question/new` to every non-eliminated player. Returns the
    /// authoritative deadline, or `None` when the session cannot continue.
    pub async fn dispatch_question(
        &self,
        catalog: &Catalog,
        clients: &ClientRegistry,
        grace: Duration,
    ) -> Option<Instant> {
        let mut st = self.state.lock().await;

        if st.status != SessionStatus::Playing {
            return None;
        }
        let qid = *self.question_ids.get(st.current_question)?;
        let Some(q) = catalog.get(qid) else {
            warn!(session = self.id, question = qid, "selected question vanished");
            return None;
        };

        for p in &mut st.players {
            p.reset_round();
        }
        let now = Instant::now();
        st.question_start = Some(now);

        let frame = to_frame(&QuestionNew {
            action: "question/new",
            question_num: st.current_question + 1,
            total_questions: self.cfg.num_questions,
            kind: q.kind.to_string(),
            difficulty: q.difficulty.to_string(),
            question: q.prompt.clone(),
            time_limit: self.cfg.time_limit,
            answers: (q.kind == QuestionKind::MultiChoice)
                .then(|| q.options.clone()),
        });

        let mut active = 0;
        for p in st.players.iter().filter(|p| !p.eliminated) {
            clients.send_to(p.client_id, frame.clone());
            active += 1;
        }
        debug!(
            session = self.id,
            question = st.current_question + 1,
            active,
            "question dispatched"
        );

        Some(now + Duration::from_secs(u64::from(self.cfg.time_limit)) + grace)
    }

    /// Records one player's answer for the current question. Ignored for
    /// non-players, repeat answers, and eliminated players. The reported
    /// response time is clamped once the server-side wall clock has
    /// passed the deadline plus grace.
    pub async fn record_answer(
        &self,
        catalog: &Catalog,
        client_id: u32,
        answer: Option<AnswerValue>,
        mut response_time: f64,
        grace: Duration,
    ) {
        let mut st = self.state.lock().await;

        if st.status != SessionStatus::Playing {
            return;
        }
        let Some(start) = st.question_start else {
            return;
        };
        let q = self
            .question_ids
            .get(st.current_question)
            .and_then(|&qid| catalog.get(qid));

        let bound = f64::from(self.cfg.time_limit) + grace.as_secs_f64();
        if start.elapsed().as_secs_f64() > bound {
            response_time = bound;
        }

        let time_limit = self.cfg.time_limit;
        let difficulty = self.cfg.difficulty;
        let Some(player) = st.players.iter_mut().find(|p| p.client_id == client_id)
        else {
            return;
        };
        if player.has_answered || player.eliminated {
            return;
        }

        player.has_answered = true;
        player.current_answer = answer
            .as_ref()
            .map_or(-1, AnswerValue::recorded_index);
        player.response_time = response_time;

        let correct = match (&q, &answer) {
            (Some(q), Some(a)) => q.check(a),
            _ => false,
        };
        if correct {
            player.score += score(difficulty, response_time, time_limit);
            player.correct_answers += 1;
        }
        player.was_correct = correct;
        debug!(
            session = self.id,
            pseudo = %player.pseudo,
            correct,
            response_time,
            "answer recorded"
        );

        drop(st);
        self.round_notify.notify_one();
    }

    /// Hides two wrong options of the current multi-choice question.
    pub async fn use_fifty(
        &self,
        catalog: &Catalog,
        client_id: u32,
    ) -> Result<FiftyOutcome, JokerError> {
        let mut st = self.state.lock().await;

        let current = st.current_question;
        let Some(player) = st.players.iter_mut().find(|p| p.client_id == client_id)
        else {
            return Err(JokerError::NotInSession);
        };
        if player.joker_fifty_used || player.has_answered {
            return Err(JokerError::NotAvailable);
        }

        let q = self
            .question_ids
            .get(current)
            .and_then(|&qid| catalog.get(qid));
        let Some(q) = q.filter(|q| q.kind == QuestionKind::MultiChoice) else {
            // The joker stays available for a later multi-choice question.
            return Err(JokerError::NotAvailable);
        };

        player.joker_fifty_used = true;
        let skip_left = u8::from(!player.joker_skip_used);
        info!(session = self.id, pseudo = %player.pseudo, "fifty joker used");

        let removed = pick_two_wrong(q);
        let remaining_answers = q
            .options
            .iter()
            .enumerate()
            .filter(|(i, _)| !removed.contains(&(*i as i32)))
            .map(|(_, s)| s.clone())
            .collect();

        Ok(FiftyOutcome {
            remaining_answers,
            jokers: JokerInventory {
                fifty: 0,
                skip: skip_left,
            },
        })
    }

    /// Skips the current question: the player counts as answered with no
    /// score change and is excluded from life accounting this round.
    pub async fn use_skip(&self, client_id: u32) -> Result<JokerInventory, JokerError> {
        let mut st = self.state.lock().await;

        let Some(player) = st.players.iter_mut().find(|p| p.client_id == client_id)
        else {
            return Err(JokerError::NotInSession);
        };
        if player.joker_skip_used || player.has_answered {
            return Err(JokerError::NotAvailable);
        }

        player.joker_skip_used = true;
        player.has_answered = true;
        player.used_skip_this_question = true;
        player.current_answer = -2;
        let fifty_left = u8::from(!player.joker_fifty_used);
        info!(session = self.id, pseudo = %player.pseudo, "skip joker used");

        drop(st);
        // A skip can complete the round exactly like an answer.
        self.round_notify.notify_one();

        Ok(JokerInventory {
            fifty: fifty_left,
            skip: 0,
        })
    }

    /// Completion predicate for the timing task.
    pub async fn round_wait(&self) -> RoundWait {
        let st = self.state.lock().await;
        if st.status != SessionStatus::Playing {
            RoundWait::Over
        } else if st
            .players
            .iter()
            .filter(|p| !p.eliminated)
            .all(|p| p.has_answered)
        {
            RoundWait::Complete
        } else {
            RoundWait::Pending
        }
    }

    /// Applies battle life accounting, broadcasts `question/results` and
    /// any eliminations, and decides whether the game goes on.
    pub async fn emit_results(
        &self,
        catalog: &Catalog,
        clients: &ClientRegistry,
    ) -> RoundOutcome {
        let mut st = self.state.lock().await;

        if st.status != SessionStatus::Playing {
            return RoundOutcome::Ended;
        }
        let Some(q) = self
            .question_ids
            .get(st.current_question)
            .and_then(|&qid| catalog.get(qid))
        else {
            warn!(session = self.id, "no current question at results time");
            drop(st);
            self.finish(clients).await;
            return RoundOutcome::Ended;
        };

        let qnum = (st.current_question + 1) as u32;
        let battle = self.cfg.mode.is_battle();

        // Battle accounting, in order: wrong answers cost a life, then
        // the slowest responder loses one even when right.
        let mut last_idx: Option<usize> = None;
        if battle {
            let mut max_rt = 0.0_f64;
            for (i, p) in st.players.iter_mut().enumerate() {
                if p.eliminated || p.used_skip_this_question {
                    continue;
                }
                if p.has_answered && !p.was_correct {
                    p.lives -= 1;
                    if p.lives <= 0 {
                        p.lives = 0;
                        p.eliminated = true;
                        p.eliminated_at = qnum;
                    }
                }
                if p.has_answered && p.response_time > max_rt {
                    max_rt = p.response_time;
                    last_idx = Some(i);
                }
            }

            if let Some(i) = last_idx {
                let p = &mut st.players[i];
                if !p.eliminated && p.was_correct {
                    p.lives -= 1;
                    if p.lives <= 0 {
                        p.lives = 0;
                        p.eliminated = true;
                        p.eliminated_at = qnum;
                    }
                }
            }
        }

        let results = st
            .players
            .iter()
            .map(|p| PlayerRoundResult {
                pseudo: p.pseudo.clone(),
                answer: if p.has_answered { p.current_answer } else { -1 },
                correct: p.was_correct,
                points: if p.was_correct {
                    score(q.difficulty, p.response_time, self.cfg.time_limit)
                } else {
                    0
                },
                total_score: p.score,
                response_time: battle.then_some(p.response_time),
                lives: battle.then_some(p.lives),
            })
            .collect();

        let frame = to_frame(&QuestionResults {
            action: "question/results",
            correct_answer: match q.kind {
                QuestionKind::MultiChoice | QuestionKind::Boolean => {
                    CorrectAnswer::Index(q.correct_index)
                },
                QuestionKind::FreeText => CorrectAnswer::Text(
                    q.accepted.first().cloned().unwrap_or_default(),
                ),
            },
            explanation: q.explanation.clone(),
            last_player: last_idx
                .filter(|_| battle)
                .map(|i| st.players[i].pseudo.clone()),
            results,
        });
        for p in &st.players {
            clients.send_to(p.client_id, frame.clone());
        }

        if battle {
            for p in &st.players {
                if p.eliminated && p.eliminated_at == qnum {
                    let elim = to_frame(&PlayerEliminated {
                        action: "session/player/eliminated",
                        pseudo: p.pseudo.clone(),
                    });
                    for target in &st.players {
                        clients.send_to(target.client_id, elim.clone());
                    }
                }
            }
        }

        // Close the round: anything arriving during the results window is
        // ignored, exactly as if everyone had answered.
        for p in &mut st.players {
            p.has_answered = true;
        }

        let alive = st.players.iter().filter(|p| !p.eliminated).count();
        let last_question = st.current_question + 1 >= self.cfg.num_questions;
        debug!(session = self.id, question = qnum, alive, "results sent");
        drop(st);

        if (battle && alive <= 1) || last_question {
            self.finish(clients).await;
            RoundOutcome::Ended
        } else {
            RoundOutcome::Continue
        }
    }

    pub async fn advance(&self) {
        let mut st = self.state.lock().await;
        st.current_question += 1;
    }

    /// Marks the session finished and broadcasts the final ranking.
    /// Idempotent: a session can race to its end from a departure and
    /// from the timing task.
    pub async fn finish(&self, clients: &ClientRegistry) {
        let mut st = self.state.lock().await;

        if st.status == SessionStatus::Finished {
            return;
        }
        st.status = SessionStatus::Finished;
        info!(session = self.id, "session finished");

        let battle = self.cfg.mode.is_battle();
        let mut sorted = st.players.clone();
        if battle {
            // Lives first, then whoever went out latest, then score; the
            // stable sort keeps join order on full ties.
            sorted.sort_by(|a, b| {
                b.lives
                    .cmp(&a.lives)
                    .then(b.eliminated_at.cmp(&a.eliminated_at))
                    .then(b.score.cmp(&a.score))
            });
        } else {
            sorted.sort_by(|a, b| b.score.cmp(&a.score));
        }

        let ranking = sorted
            .iter()
            .enumerate()
            .map(|(i, p)| RankEntry {
                rank: i + 1,
                pseudo: p.pseudo.clone(),
                score: p.score,
                correct_answers: p.correct_answers,
                lives: battle.then_some(p.lives),
                eliminated_at: (battle && p.eliminated).then_some(p.eliminated_at),
            })
            .collect();

        let frame = to_frame(&SessionFinished {
            action: "session/finished",
            mode: self.cfg.mode.to_string(),
            winner: battle
                .then(|| sorted.first().map(|p| p.pseudo.clone()))
                .flatten(),
            ranking,
        });

        for p in &st.players {
            clients.send_to(p.client_id, frame.clone());
            if let Some(handle) = clients.get(p.client_id) {
                handle.set_session_id(None);
            }
        }

        drop(st);
        self.round_notify.notify_one();
    }
}

/// Two distinct wrong option indices, uniformly at random.
fn pick_two_wrong(q: &Question) -> [i32; 2] {
    use rand::seq::SliceRandom;

    let mut wrong: Vec<i32> = (0..4).filter(|&i| i != q.correct_index).collect();
    wrong.shuffle(&mut rand::rng());
    [wrong[0], wrong[1]]
}
