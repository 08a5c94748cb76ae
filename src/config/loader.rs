// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::model::{PipelineFile, RawPipelineFile};
use crate::errors::Result;

/// Read and deserialize a pipeline file without semantic checks.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawPipelineFile> {
    let contents = fs::read_to_string(path.as_ref())?;
    let raw: RawPipelineFile = toml::from_str(&contents)?;
    Ok(raw)
}

/// Read a pipeline file and validate it.
///
/// Checks for:
/// - at least one step, each with a non-empty `cmd`,
/// - unknown or self-referencing `after` entries,
/// - dependency cycles,
/// - `[pipeline].max_workers >= 1`.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<PipelineFile> {
    let raw = load_from_path(&path)?;
    PipelineFile::try_from(raw)
}

/// `Stagerun.toml` in the current working directory.
pub fn default_config_path() -> PathBuf {
    PathBuf::from("Stagerun.toml")
}
