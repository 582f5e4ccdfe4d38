// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Per-session timing task.
//!
//! Spawned once per started session, it owns the pacing of the game:
//! countdown, question dispatch, waiting on the completion predicate or
//! the authoritative deadline, the results-viewing pause, and
//! advancement. Cancellation (server shutdown) aborts the wait points;
//! a session finished elsewhere (last player leaving) is observed at the
//! next lock and the task winds down.

use std::sync::Arc;

use tokio::time::{sleep, sleep_until};
use tracing::debug;

use crate::{
    server::Server,
    session::{
        Session,
        engine::{RoundOutcome, RoundWait},
    },
};

pub fn spawn(server: Arc<Server>, session: Arc<Session>) {
    tokio::spawn(run(server, session));
}

async fn run(server: Arc<Server>, session: Arc<Session>) {
    let timers = server.cfg.timers.clone();
    debug!(session = session.id, "timing task started");

    tokio::select! {
        _ = server.cancel.cancelled() => return,
        _ = sleep(timers.countdown) => {},
    }

    loop {
        let Some(deadline) = session
            .dispatch_question(&server.catalog, &server.clients, timers.answer_grace)
            .await
        else {
            break;
        };

        // Resolve the round as soon as everyone has answered, or at the
        // deadline, whichever comes first.
        loop {
            let notified = session.round_notify.notified();
            match session.round_wait().await {
                RoundWait::Pending => {},
                RoundWait::Complete | RoundWait::Over => break,
            }
            tokio::select! {
                _ = server.cancel.cancelled() => return,
                _ = notified => {},
                _ = sleep_until(deadline) => {
                    debug!(session = session.id, "question deadline reached");
                    break;
                },
            }
        }

        match session.emit_results(&server.catalog, &server.clients).await {
            RoundOutcome::Ended => break,
            RoundOutcome::Continue => {
                tokio::select! {
                    _ = server.cancel.cancelled() => return,
                    _ = sleep(timers.results_pause) => {},
                }
                session.advance().await;
            },
        }
    }

    debug!(session = session.id, "timing task finished");
}
