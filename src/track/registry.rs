// src/track/registry.rs

//! File-backed job registry.
//!
//! One JSON array of [`RegistryEntry`] per state directory. Every mutation
//! is a read-modify-write of the whole file under a lock file; mutations are
//! rare (one append per spawned job, one clear per session) so this stays
//! cheap. The registry is only meant for a single writer at a time:
//! contention surfaces as [`DispatchError::ResourceBusy`].

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::errors::{DispatchError, Result};
use crate::fs::FileSystem;
use crate::job::JobId;
use crate::types::SurfaceKind;

/// Locks older than this are assumed to belong to a crashed process.
pub const STALE_LOCK_SECS: i64 = 30;

/// Durable projection of a spawned job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryEntry {
    pub job_id: JobId,
    /// Unique surface label (window title, tmux window name).
    pub label: String,
    pub surface: SurfaceKind,
    /// Platform identifier of the surface (window id, tmux window id).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub surface_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pid: Option<u32>,
    pub log_path: PathBuf,
    pub status_path: PathBuf,
    pub spawned_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
struct LockInfo {
    pid: u32,
    acquired_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct JobRegistry {
    fs: Arc<dyn FileSystem>,
    path: PathBuf,
    lock_path: PathBuf,
}

impl JobRegistry {
    pub fn new(fs: Arc<dyn FileSystem>, path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let mut lock = path.as_os_str().to_owned();
        lock.push(".lock");
        Self {
            fs,
            path,
            lock_path: PathBuf::from(lock),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn lock_path(&self) -> &Path {
        &self.lock_path
    }

    /// Append one entry.
    pub fn append(&self, entry: RegistryEntry) -> Result<()> {
        self.with_lock(|| {
            let mut entries = self.read_entries()?;
            debug!(job = %entry.job_id, label = %entry.label, "registry append");
            entries.push(entry);
            self.write_entries(&entries)
        })
    }

    /// All entries in append order. A missing file is an empty registry.
    pub fn load_all(&self) -> Result<Vec<RegistryEntry>> {
        self.read_entries()
    }

    /// Truncate the registry.
    pub fn clear(&self) -> Result<()> {
        self.with_lock(|| {
            debug!(path = ?self.path, "registry cleared");
            self.write_entries(&[])
        })
    }

    fn read_entries(&self) -> Result<Vec<RegistryEntry>> {
        let Some(contents) = self.fs.read_optional(&self.path)? else {
            return Ok(Vec::new());
        };
        if contents.trim().is_empty() {
            return Ok(Vec::new());
        }
        match serde_json::from_str(&contents) {
            Ok(entries) => Ok(entries),
            Err(e) => {
                warn!(path = ?self.path, error = %e, "registry file is corrupt; treating as empty");
                Ok(Vec::new())
            }
        }
    }

    fn write_entries(&self, entries: &[RegistryEntry]) -> Result<()> {
        let json = serde_json::to_string_pretty(entries)?;
        self.fs.write_atomic(&self.path, json.as_bytes())?;
        Ok(())
    }

    fn with_lock<T>(&self, f: impl FnOnce() -> Result<T>) -> Result<T> {
        self.acquire_lock()?;
        let result = f();
        if let Err(e) = self.fs.remove_file(&self.lock_path) {
            warn!(path = ?self.lock_path, error = %e, "failed to release registry lock");
        }
        result
    }

    fn acquire_lock(&self) -> Result<()> {
        let info = LockInfo {
            pid: std::process::id(),
            acquired_at: Utc::now(),
        };
        let payload = serde_json::to_vec(&info)?;

        if self.fs.create_new(&self.lock_path, &payload)? {
            return Ok(());
        }

        if self.lock_is_stale() {
            warn!(path = ?self.lock_path, "breaking stale registry lock");
            self.fs.remove_file(&self.lock_path)?;
            if self.fs.create_new(&self.lock_path, &payload)? {
                return Ok(());
            }
        }

        Err(DispatchError::ResourceBusy(format!(
            "job registry {:?} is locked by another writer",
            self.path
        )))
    }

    fn lock_is_stale(&self) -> bool {
        let holder = match self.fs.read_optional(&self.lock_path) {
            Ok(Some(contents)) => serde_json::from_str::<LockInfo>(&contents).ok(),
            Ok(None) => return true,
            Err(_) => None,
        };
        match holder {
            Some(info) => (Utc::now() - info.acquired_at).num_seconds() >= STALE_LOCK_SECS,
            // Unparsable lock content can only come from a crashed writer.
            None => true,
        }
    }
}
