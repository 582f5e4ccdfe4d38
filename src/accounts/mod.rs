// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Persistent player accounts.
//!
//! Accounts live in memory and are mirrored to a flat text file, one
//! `name;digest` line per account. The digest format is fixed by existing
//! account files: a single djb2 pass expanded to 64 hex characters. It is
//! an obfuscation, not a cryptographic hash.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tokio::{fs, io::AsyncWriteExt, sync::Mutex};
use tracing::{debug, info, warn};

/// Upper bound on player name length, in bytes.
pub const MAX_PSEUDO_LEN: usize = 32;

#[derive(Debug, Clone)]
pub struct Account {
    pub pseudo: String,
    pub digest: String,
    /// Runtime-only flag, never persisted.
    pub logged_in: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegisterOutcome {
    Registered,
    Duplicate,
    CapacityReached,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthOutcome {
    Authenticated,
    BadCredentials,
    Unknown,
}

#[derive(Debug)]
pub struct AccountRegistry {
    accounts: Mutex<Vec<Account>>,
    path: PathBuf,
    max_accounts: usize,
}

impl AccountRegistry {
    /// Loads the account file. A missing file is an empty registry, not an
    /// error.
    pub fn load<P: AsRef<Path>>(path: P, max_accounts: usize) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        let accounts = match std::fs::read_to_string(&path) {
            Ok(contents) => parse_accounts(&contents, max_accounts),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!(path = %path.display(), "no accounts file, starting fresh");
                Vec::new()
            },
            Err(e) => {
                return Err(e).with_context(|| {
                    format!("failed to read accounts file {}", path.display())
                });
            },
        };

        info!(count = accounts.len(), "loaded accounts");
        Ok(Self {
            accounts: Mutex::new(accounts),
            path,
            max_accounts,
        })
    }

    pub async fn register(&self, pseudo: &str, password: &str) -> RegisterOutcome {
        let mut accounts = self.accounts.lock().await;

        if accounts.iter().any(|a| a.pseudo == pseudo) {
            debug!(pseudo, "registration rejected, name taken");
            return RegisterOutcome::Duplicate;
        }
        if accounts.len() >= self.max_accounts {
            warn!(max = self.max_accounts, "registration rejected, registry full");
            return RegisterOutcome::CapacityReached;
        }

        accounts.push(Account {
            pseudo: pseudo.to_string(),
            digest: digest(password),
            logged_in: false,
        });
        info!(pseudo, total = accounts.len(), "account registered");
        RegisterOutcome::Registered
    }

    pub async fn authenticate(&self, pseudo: &str, password: &str) -> AuthOutcome {
        let mut accounts = self.accounts.lock().await;

        let Some(account) = accounts.iter_mut().find(|a| a.pseudo == pseudo) else {
            debug!(pseudo, "login failed, unknown account");
            return AuthOutcome::Unknown;
        };

        if account.digest != digest(password) {
            debug!(pseudo, "login failed, wrong password");
            return AuthOutcome::BadCredentials;
        }

        account.logged_in = true;
        info!(pseudo, "player logged in");
        AuthOutcome::Authenticated
    }

    /// Rewrites the account file from the in-memory table. Failures are
    /// reported to the caller but never roll back memory.
    pub async fn flush(&self) -> Result<()> {
        let contents = {
            let accounts = self.accounts.lock().await;
            let mut out = String::with_capacity(accounts.len() * 48);
            for a in accounts.iter() {
                out.push_str(&a.pseudo);
                out.push(';');
                out.push_str(&a.digest);
                out.push('\n');
            }
            out
        };

        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)
                .await
                .context("failed to create accounts directory")?;
        }

        let mut file = fs::File::create(&self.path)
            .await
            .with_context(|| format!("failed to open {}", self.path.display()))?;
        file.write_all(contents.as_bytes())
            .await
            .context("failed to write accounts file")?;

        debug!(path = %self.path.display(), "accounts flushed");
        Ok(())
    }

    pub async fn len(&self) -> usize {
        self.accounts.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.accounts.lock().await.is_empty()
    }
}

fn parse_accounts(contents: &str, max_accounts: usize) -> Vec<Account> {
    let mut accounts = Vec::new();
    for line in contents.lines() {
        if accounts.len() >= max_accounts {
            warn!(max = max_accounts, "accounts file truncated at capacity");
            break;
        }
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let Some((pseudo, digest)) = line.split_once(';') else {
            warn!(line, "skipping malformed account line");
            continue;
        };
        accounts.push(Account {
            pseudo: pseudo.to_string(),
            digest: digest.trim().to_string(),
            logged_in: false,
        });
    }
    accounts
}

/// Password digest used by the on-disk account format.
///
/// One djb2 pass over the raw bytes (with the same sign extension the C
/// `char` arithmetic applied to non-ASCII input), expanded to four
/// 16-hex-digit words by XOR with fixed masks. Must stay bitwise
/// compatible with existing account files.
pub fn digest(password: &str) -> String {
    let mut hash: u64 = 5381;
    for &b in password.as_bytes() {
        let c = b as i8 as i64 as u64;
        hash = hash.wrapping_shl(5).wrapping_add(hash).wrapping_add(c);
    }

    format!(
        "{hash:016x}{:016x}{:016x}{:016x}",
        hash ^ 0xDEAD_BEEF,
        hash ^ 0xCAFE_BABE,
        hash ^ 0x1234_5678
    )
}
