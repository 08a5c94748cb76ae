// src/logging.rs

//! Logging setup for `stagerun` using `tracing` + `tracing-subscriber`.
//!
//! Priority for determining the filter:
//! 1. `--log-level` CLI flag (if provided)
//! 2. `STAGERUN_LOG` environment variable (a level or `EnvFilter` directives,
//!    e.g. "debug" or "stagerun::pipeline=trace")
//! 3. default to `info`
//!
//! Logs go to STDERR so that stdout carries only the run results.

use anyhow::{Result, anyhow};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{EnvFilter, fmt};

use crate::cli::LogLevel;

pub const LOG_ENV: &str = "STAGERUN_LOG";

/// Initialise the global logging subscriber. Call once at startup.
pub fn init_logging(cli_level: Option<LogLevel>) -> Result<()> {
    let filter = match cli_level {
        Some(lvl) => EnvFilter::default().add_directive(LevelFilter::from(lvl).into()),
        None => EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("info")),
    };

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow!("failed to initialise logging: {e}"))?;

    Ok(())
}

impl From<LogLevel> for LevelFilter {
    fn from(lvl: LogLevel) -> Self {
        match lvl {
            LogLevel::Error => LevelFilter::ERROR,
            LogLevel::Warn => LevelFilter::WARN,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Trace => LevelFilter::TRACE,
        }
    }
}
