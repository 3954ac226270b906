// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::debug;

use crate::config::model::{ConfigFile, RawConfigFile, Settings};
use crate::errors::{DispatchError, Result};

/// Forces the headless provider (`1`, `true`, `yes`).
pub const ENV_HEADLESS: &str = "PMDISPATCH_HEADLESS";
/// Close prompt timeout in seconds.
pub const ENV_CLOSE_TIMEOUT: &str = "PMDISPATCH_CLOSE_TIMEOUT";
/// State directory override.
pub const ENV_STATE_DIR: &str = "PMDISPATCH_STATE_DIR";

/// Load a configuration file and return the raw `RawConfigFile`.
///
/// This only performs TOML deserialization; it does **not** validate. Use
/// [`load_and_validate`] for that.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawConfigFile> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;
    let config: RawConfigFile = toml::from_str(&contents)?;
    Ok(config)
}

/// Load a configuration file, validate it and apply environment overrides.
///
/// This is the entry point for the rest of the application.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<ConfigFile> {
    let raw_config = load_from_path(&path)?;
    let mut config = ConfigFile::try_from(raw_config)?;
    apply_env_overrides(&mut config.settings)?;
    Ok(config)
}

/// Apply `PMDISPATCH_*` overrides from the process environment.
pub fn apply_env_overrides(settings: &mut Settings) -> Result<()> {
    apply_env_overrides_from(settings, |key| std::env::var(key).ok())
}

/// Apply overrides read through `lookup` (the environment, in production).
pub fn apply_env_overrides_from(
    settings: &mut Settings,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<()> {
    if let Some(value) = lookup(ENV_HEADLESS) {
        if is_truthy(&value) {
            debug!("{ENV_HEADLESS} set; forcing headless execution");
            settings.headless = true;
        }
    }

    if let Some(value) = lookup(ENV_CLOSE_TIMEOUT) {
        let secs: u64 = value.trim().parse().map_err(|_| {
            DispatchError::ConfigError(format!(
                "{ENV_CLOSE_TIMEOUT} must be a number of seconds (got {value:?})"
            ))
        })?;
        settings.close_prompt_timeout = Duration::from_secs(secs);
    }

    if let Some(value) = lookup(ENV_STATE_DIR) {
        if !value.trim().is_empty() {
            settings.state_dir = Some(PathBuf::from(value));
        }
    }

    Ok(())
}

fn is_truthy(value: &str) -> bool {
    matches!(value.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes")
}
