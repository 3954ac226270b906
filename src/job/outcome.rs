// src/job/outcome.rs

use serde::Serialize;

use crate::job::JobId;

/// Final verdict for one requested job. This is the only thing the
/// orchestrator hands back to its caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobOutcome {
    pub id: JobId,
    pub success: bool,
    /// Captured output (contents of the job's log artifact).
    pub output: String,
    /// Human-readable reason for failure; empty on success.
    pub error: String,
}

impl JobOutcome {
    pub fn succeeded(id: impl Into<JobId>, output: String) -> Self {
        Self {
            id: id.into(),
            success: true,
            output,
            error: String::new(),
        }
    }

    pub fn failed(id: impl Into<JobId>, output: String, error: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            success: false,
            output,
            error: error.into(),
        }
    }
}
