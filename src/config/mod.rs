// src/config/mod.rs

//! Job catalogue loading and validation.
//!
//! - `model.rs` defines the raw TOML model and the validated types.
//! - `loader.rs` reads the file and applies `PMDISPATCH_*` overrides.
//! - `validate.rs` turns the raw model into a [`ConfigFile`].

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{apply_env_overrides, apply_env_overrides_from, load_and_validate, load_from_path};
pub use model::{ConfigFile, JobConfig, RawConfigFile, Settings};
