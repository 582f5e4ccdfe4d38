// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use anyhow::{Context, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Initializes the global tracing subscriber.
///
/// `RUST_LOG` wins over the configured level so operators can raise
/// verbosity without touching the config file. The returned guard must be
/// held for the lifetime of the process or buffered log lines are lost.
pub fn init_logger(level: &str) -> Result<WorkerGuard> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .context("failed to parse log level from env or config")?;

    let (writer, guard) = tracing_appender::non_blocking(std::io::stdout());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_writer(writer).with_target(true))
        .try_init()
        .context("failed to set global default subscriber")?;

    Ok(guard)
}
