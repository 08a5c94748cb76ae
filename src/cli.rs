// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use serde_json::Value;

use crate::config::default_config_path;

/// Command-line arguments for `stagerun`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "stagerun",
    version,
    about = "Run build steps in dependency order from a pipeline file.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the pipeline file (TOML).
    #[arg(long, value_name = "PATH", default_value_os_t = default_config_path())]
    pub config: PathBuf,

    /// Run steps without prerequisites concurrently before the rest.
    ///
    /// Also enabled by `[pipeline].allow_concurrency = true`.
    #[arg(long)]
    pub parallel: bool,

    /// Upper bound on concurrently running steps.
    #[arg(long, value_name = "N", value_parser = clap::value_parser!(u16).range(1..))]
    pub max_workers: Option<u16>,

    /// Override a parameter, e.g. `--param port=8080`.
    ///
    /// The value is parsed as JSON, falling back to a plain string.
    #[arg(long = "param", value_name = "KEY=VALUE", value_parser = parse_param)]
    pub params: Vec<(String, Value)>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `STAGERUN_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Parse + validate, print the execution plan, but don't run any step.
    #[arg(long)]
    pub dry_run: bool,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}

/// Parse `KEY=VALUE`.
pub fn parse_param(s: &str) -> Result<(String, Value), String> {
    let (key, raw) = s
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got `{s}`"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("empty parameter name in `{s}`"));
    }
    let value = serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
    Ok((key.to_string(), value))
}
