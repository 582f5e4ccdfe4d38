// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::sync::{
    Arc,
    atomic::{AtomicU32, Ordering},
};

use dashmap::DashMap;
use thiserror::Error;
use tracing::{debug, info};

use crate::session::{Session, SessionConfig, SessionStatus};

#[derive(Debug, Error, PartialEq, Eq)]
#[error("maximum number of sessions reached")]
pub struct RegistryFull;

/// Owns every session, keyed by monotonically assigned id. Finished
/// sessions are reclaimed lazily when the capacity limit is hit, so
/// memory stays bounded without a background sweeper.
#[derive(Debug)]
pub struct SessionRegistry {
    sessions: DashMap<u32, Arc<Session>>,
    next_id: AtomicU32,
    max_sessions: usize,
}

impl SessionRegistry {
    pub fn new(max_sessions: usize) -> Self {
        Self {
            sessions: DashMap::new(),
            next_id: AtomicU32::new(1),
            max_sessions,
        }
    }

    /// Allocates a session with pre-selected questions. Fails only when
    /// the registry is full of unfinished sessions.
    pub async fn create(
        &self,
        cfg: SessionConfig,
        question_ids: Vec<u32>,
        creator_client_id: u32,
    ) -> Result<Arc<Session>, RegistryFull> {
        if self.sessions.len() >= self.max_sessions {
            self.evict_finished().await;
            if self.sessions.len() >= self.max_sessions {
                return Err(RegistryFull);
            }
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let session = Arc::new(Session::new(id, cfg, question_ids, creator_client_id));
        self.sessions.insert(id, Arc::clone(&session));
        info!(session = id, name = %session.cfg.name, "session created");
        Ok(session)
    }

    pub fn get(&self, id: u32) -> Option<Arc<Session>> {
        self.sessions.get(&id).map(|s| Arc::clone(&s))
    }

    /// Snapshot of all live sessions, for listings.
    pub fn all(&self) -> Vec<Arc<Session>> {
        self.sessions.iter().map(|e| Arc::clone(&e)).collect()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    async fn evict_finished(&self) {
        let snapshot = self.all();
        for session in snapshot {
            let finished =
                session.state.lock().await.status == SessionStatus::Finished;
            if finished {
                self.sessions.remove(&session.id);
                debug!(session = session.id, "finished session reclaimed");
            }
        }
    }
}
