// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use crate::cfg::config::Config;

/// QuizNet multiplayer quiz game server.
#[derive(Parser, Debug)]
#[command(name = "quiznet", version, about)]
pub struct Cli {
    /// TCP port for game connections.
    #[arg(long = "tcp", value_name = "PORT")]
    pub tcp_port: Option<u16>,

    /// UDP port for LAN discovery.
    #[arg(long = "udp", value_name = "PORT")]
    pub udp_port: Option<u16>,

    /// Server name advertised to discovery probes.
    #[arg(long = "name", value_name = "NAME")]
    pub server_name: Option<String>,

    /// Optional YAML configuration file.
    #[arg(long = "config", value_name = "PATH")]
    pub config: Option<PathBuf>,
}

impl Cli {
    /// Resolves the effective configuration: file (or defaults), then
    /// command-line overrides, then validation.
    pub fn into_config(self) -> Result<Config> {
        let mut cfg = match &self.config {
            Some(path) => Config::load_from_file(path)
                .context("failed to load configuration file")?,
            None => Config::default(),
        };

        if let Some(port) = self.tcp_port {
            cfg.network.tcp_port = port;
        }
        if let Some(port) = self.udp_port {
            cfg.network.udp_port = port;
        }
        if let Some(name) = self.server_name {
            cfg.network.server_name = Some(name);
        }

        cfg.validate_and_normalize()?;
        Ok(cfg)
    }
}
