// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::{
    net::SocketAddr,
    sync::{
        Arc,
        atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering},
    },
};

use dashmap::DashMap;
use tokio::sync::{RwLock, mpsc};
use tracing::debug;

/// One connected endpoint.
///
/// The handle carries the connection-scoped state the protocol needs
/// (authentication, bound player name, current session) and the sending
/// side of the outbound frame channel. The socket itself lives in the
/// reader and writer tasks; everything here is cheap to share.
#[derive(Debug)]
pub struct ClientHandle {
    pub id: u32,
    pub addr: SocketAddr,
    authenticated: AtomicBool,
    pseudo: RwLock<String>,
    /// Current session id; 0 means none (session ids start at 1).
    session_id: AtomicU32,
    connected: AtomicBool,
    tx: mpsc::UnboundedSender<String>,
}

impl ClientHandle {
    /// Queues one frame for delivery. Best effort: frames to disconnected
    /// clients are silently dropped.
    pub fn send(&self, frame: String) {
        if self.connected.load(Ordering::Acquire) {
            let _ = self.tx.send(frame);
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.authenticated.load(Ordering::Acquire)
    }

    pub async fn set_identity(&self, pseudo: &str) {
        *self.pseudo.write().await = pseudo.to_string();
        self.authenticated.store(true, Ordering::Release);
    }

    pub async fn pseudo(&self) -> String {
        self.pseudo.read().await.clone()
    }

    pub fn session_id(&self) -> Option<u32> {
        match self.session_id.load(Ordering::Acquire) {
            0 => None,
            id => Some(id),
        }
    }

    pub fn set_session_id(&self, id: Option<u32>) {
        self.session_id.store(id.unwrap_or(0), Ordering::Release);
    }

    fn mark_disconnected(&self) {
        self.connected.store(false, Ordering::Release);
    }
}

/// Registry of connected clients, keyed by their monotonically assigned
/// ids. Sessions refer to clients by id only and resolve them here.
#[derive(Debug)]
pub struct ClientRegistry {
    clients: DashMap<u32, Arc<ClientHandle>>,
    next_id: AtomicU32,
    count: AtomicUsize,
    max_clients: usize,
}

impl ClientRegistry {
    pub fn new(max_clients: usize) -> Self {
        Self {
            clients: DashMap::new(),
            next_id: AtomicU32::new(1),
            count: AtomicUsize::new(0),
            max_clients,
        }
    }

    /// Registers a freshly accepted connection. Returns `None` when the
    /// server is at capacity; the caller closes the socket without a
    /// reply.
    pub fn attach(
        &self,
        addr: SocketAddr,
        tx: mpsc::UnboundedSender<String>,
    ) -> Option<Arc<ClientHandle>> {
        self.count
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| {
                (n < self.max_clients).then_some(n + 1)
            })
            .ok()?;

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let handle = Arc::new(ClientHandle {
            id,
            addr,
            authenticated: AtomicBool::new(false),
            pseudo: RwLock::new(String::new()),
            session_id: AtomicU32::new(0),
            connected: AtomicBool::new(true),
            tx,
        });
        self.clients.insert(id, Arc::clone(&handle));
        Some(handle)
    }

    pub fn remove(&self, id: u32) {
        if let Some((_, handle)) = self.clients.remove(&id) {
            handle.mark_disconnected();
            self.count.fetch_sub(1, Ordering::AcqRel);
            debug!(client = id, remaining = self.len(), "client removed");
        }
    }

    pub fn get(&self, id: u32) -> Option<Arc<ClientHandle>> {
        self.clients.get(&id).map(|h| Arc::clone(&h))
    }

    /// Best-effort unicast by client id.
    pub fn send_to(&self, id: u32, frame: String) {
        if let Some(handle) = self.clients.get(&id) {
            handle.send(frame);
        }
    }

    pub fn len(&self) -> usize {
        self.count.load(Ordering::Acquire)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
