// src/config/mod.rs

//! Pipeline files.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a pipeline file from disk (`loader.rs`).
//! - Validate steps and dependencies (`validate.rs`).
//! - Turn a validated file into a runnable [`Pipeline`](crate::pipeline::Pipeline)
//!   (`build.rs`).

pub mod build;
pub mod loader;
pub mod model;
pub mod validate;

pub use build::build_pipeline;
pub use loader::{default_config_path, load_and_validate, load_from_path};
pub use model::{PipelineFile, PipelineSection, RawPipelineFile, StepConfig};
