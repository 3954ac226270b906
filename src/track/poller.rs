// src/track/poller.rs

//! Completion poller for status artifacts.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, trace, warn};

use crate::fs::FileSystem;
use crate::track::status::StatusRecord;

/// Reads status artifacts written by wrapped commands.
///
/// The poller never writes; a missing artifact simply means the job has not
/// reported yet.
#[derive(Debug, Clone)]
pub struct StatusPoller {
    fs: Arc<dyn FileSystem>,
    interval: Duration,
}

impl StatusPoller {
    pub fn new(fs: Arc<dyn FileSystem>, interval: Duration) -> Self {
        Self { fs, interval }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Read the status artifact once.
    ///
    /// - missing file: `Running` (the surface may not have written yet)
    /// - unreadable or unparsable content: `Errored`, never retried
    pub fn check(&self, status_path: &Path) -> StatusRecord {
        let contents = match self.fs.read_optional(status_path) {
            Ok(Some(contents)) => contents,
            Ok(None) => return StatusRecord::running(),
            Err(e) => {
                warn!(path = ?status_path, error = %e, "status artifact unreadable");
                return StatusRecord::errored(format!("malformed status artifact: {e}"));
            }
        };

        match StatusRecord::parse(&contents) {
            Ok(record) => record,
            Err(e) => {
                warn!(path = ?status_path, error = %e, "status artifact could not be parsed");
                StatusRecord::errored(format!("malformed status artifact: {e}"))
            }
        }
    }

    /// Poll until the record is terminal.
    ///
    /// With `bound = None` this waits as long as it takes; the caller owns
    /// any timeout policy. When a bound is given and elapses first, an
    /// `Errored` record with a timeout message is returned instead.
    pub async fn poll_until_terminal(&self, status_path: &Path, bound: Option<Duration>) -> StatusRecord {
        let started = Instant::now();
        loop {
            let record = self.check(status_path);
            if record.is_terminal() {
                debug!(path = ?status_path, state = ?record.state, "status artifact is terminal");
                return record;
            }

            if let Some(bound) = bound {
                if started.elapsed() >= bound {
                    warn!(path = ?status_path, bound_secs = bound.as_secs_f64(), "gave up waiting for status artifact");
                    return timed_out(bound);
                }
            }

            trace!(path = ?status_path, "still running");
            tokio::time::sleep(self.interval).await;
        }
    }
}

/// Record used when a caller-imposed bound elapses without a terminal status.
pub fn timed_out(bound: Duration) -> StatusRecord {
    StatusRecord::errored(format!(
        "timed out: no terminal status after {:.1}s",
        bound.as_secs_f64()
    ))
}
