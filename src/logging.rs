//! Tracing setup for the binary

use anyhow::{Context as _, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::DisplayConfig;

const LOG_FILE: &str = "arena-display.log";

/// Install the global subscriber. `RUST_LOG` wins over the configured level.
///
/// Keep the returned guard alive for the life of the process when a log
/// directory is configured, or buffered file output is lost.
pub fn init(config: &DisplayConfig) -> Result<Option<WorkerGuard>> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    let stdout = fmt::layer().with_target(true);

    match &config.log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::registry()
                .with(filter)
                .with(stdout)
                .with(fmt::layer().with_ansi(false).with_writer(writer))
                .try_init()
                .context("failed to install tracing subscriber")?;
            Ok(Some(guard))
        }
        None => {
            tracing_subscriber::registry()
                .with(filter)
                .with(stdout)
                .try_init()
                .context("failed to install tracing subscriber")?;
            Ok(None)
        }
    }
}
