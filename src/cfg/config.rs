// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::{fs, path::{Path, PathBuf}, time::Duration};

use anyhow::{Context, Result, ensure};
use serde::{Deserialize, Serialize};

/// Runtime configuration for the server. Every section has working
/// defaults; a YAML file passed via `--config` overrides them, and the
/// network identity can additionally be overridden from the command line.
#[derive(Deserialize, Serialize, Debug, Clone, Default)]
#[serde(default)]
pub struct Config {
    /// Listening ports and the advertised server name.
    pub network: NetworkConfig,
    /// Capacity limits for clients, sessions, accounts and the catalog.
    pub limits: Limits,
    /// Externally visible game timing.
    pub timers: Timers,
    /// Logging verbosity.
    pub logging: Logging,
    /// Paths of the persisted data files.
    pub storage: Storage,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(default)]
pub struct NetworkConfig {
    /// TCP port carrying the game protocol.
    pub tcp_port: u16,
    /// UDP port answering LAN discovery probes.
    pub udp_port: u16,
    /// Name included in discovery replies. Randomized when unset.
    pub server_name: Option<String>,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(default)]
pub struct Limits {
    /// Maximum simultaneous TCP connections.
    pub max_clients: usize,
    /// Maximum concurrent sessions (finished slots are reclaimed).
    pub max_sessions: usize,
    /// Maximum registered accounts.
    pub max_accounts: usize,
    /// Maximum distinct themes the catalog may register.
    pub max_themes: usize,
    /// Maximum questions loaded from the catalog file.
    pub max_questions: usize,
}

/// Game timing knobs, expressed as whole seconds on disk.
///
/// These are part of the observable protocol: clients animate a 3 second
/// countdown after `session/started` and a 5 second results screen after
/// `question/results`. Tests shrink them.
#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(default)]
pub struct Timers {
    /// Pause between `session/started` and the first question.
    #[serde(with = "serde_secs")]
    pub countdown: Duration,
    /// Results-viewing window between questions.
    #[serde(with = "serde_secs")]
    pub results_pause: Duration,
    /// Grace added to the per-question deadline before the server
    /// clamps reported response times and force-resolves the round.
    #[serde(with = "serde_secs")]
    pub answer_grace: Duration,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(default)]
pub struct Logging {
    /// EnvFilter directive used when `RUST_LOG` is unset.
    pub level: String,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(default)]
pub struct Storage {
    /// Append-only `name;digest` account file.
    pub accounts_path: PathBuf,
    /// Semicolon-delimited question catalog, read-only at runtime.
    pub questions_path: PathBuf,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            tcp_port: 5556,
            udp_port: 5555,
            server_name: None,
        }
    }
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_clients: 100,
            max_sessions: 20,
            max_accounts: 100,
            max_themes: 20,
            max_questions: 200,
        }
    }
}

impl Default for Timers {
    fn default() -> Self {
        Self {
            countdown: Duration::from_secs(3),
            results_pause: Duration::from_secs(5),
            answer_grace: Duration::from_secs(1),
        }
    }
}

impl Default for Logging {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl Default for Storage {
    fn default() -> Self {
        Self {
            accounts_path: PathBuf::from("data/accounts.dat"),
            questions_path: PathBuf::from("data/questions.dat"),
        }
    }
}

impl Config {
    /// Loads the configuration from YAML, validates it, and returns the
    /// ready-to-use value.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let s = fs::read_to_string(&path).with_context(|| {
            format!("failed to read config file {:?}", path.as_ref())
        })?;
        let mut cfg: Config =
            serde_yaml::from_str(&s).context("failed to parse config YAML")?;
        cfg.validate_and_normalize()?;
        Ok(cfg)
    }

    /// Validates invariants and fills in the randomized server name.
    pub fn validate_and_normalize(&mut self) -> Result<()> {
        ensure!(self.limits.max_clients >= 1, "max_clients must be >= 1");
        ensure!(self.limits.max_sessions >= 1, "max_sessions must be >= 1");
        ensure!(self.limits.max_accounts >= 1, "max_accounts must be >= 1");
        ensure!(self.limits.max_themes >= 1, "max_themes must be >= 1");
        ensure!(
            self.limits.max_questions >= 10,
            "max_questions must be >= 10 (smallest playable session)"
        );

        if self.network.server_name.as_deref().is_none_or(str::is_empty) {
            self.network.server_name = Some(default_server_name());
        }

        Ok(())
    }

    /// Advertised server name. Only valid after `validate_and_normalize`.
    pub fn server_name(&self) -> &str {
        self.network.server_name.as_deref().unwrap_or("QuizNet")
    }
}

/// `QuizNet #NNNN` with a random four-digit suffix.
pub fn default_server_name() -> String {
    use rand::RngExt;

    let n: u32 = rand::rng().random_range(0..10_000);
    format!("QuizNet #{n:04}")
}

/// Serde helpers for representing `Duration` as a number of seconds.
mod serde_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_secs())
    }
    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let secs = u64::deserialize(d)?;
        Ok(Duration::from_secs(secs))
    }
}
