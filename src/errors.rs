// src/errors.rs

//! Crate-wide error aliases and helpers.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Job not found: {0}")]
    JobNotFound(String),

    /// A shared resource (currently only the job registry) is held by
    /// another writer. Callers decide whether to retry.
    #[error("Resource busy: {0}")]
    ResourceBusy(String),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl DispatchError {
    /// Whether retrying the same operation later could succeed.
    pub fn is_busy(&self) -> bool {
        matches!(self, DispatchError::ResourceBusy(_))
    }
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, DispatchError>;
