// src/track/status.rs

//! Status artifact format.
//!
//! The wrapped command (running inside its own surface) is the only writer;
//! the poller only ever reads. Once a record is terminal it is never
//! rewritten, which is what makes lock-free polling safe.
//!
//! ```json
//! {"status": "completed", "exit_code": 0}
//! {"status": "errored", "exit_code": 124, "error": "timed out after 3600 seconds"}
//! ```

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusState {
    Running,
    Completed,
    #[serde(alias = "error")]
    Errored,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusRecord {
    #[serde(rename = "status")]
    pub state: StatusState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
    #[serde(default, rename = "error", skip_serializing_if = "Option::is_none")]
    pub error_detail: Option<String>,
}

impl StatusRecord {
    pub fn running() -> Self {
        Self {
            state: StatusState::Running,
            exit_code: None,
            error_detail: None,
        }
    }

    pub fn completed(exit_code: i32) -> Self {
        Self {
            state: StatusState::Completed,
            exit_code: Some(exit_code),
            error_detail: None,
        }
    }

    pub fn errored(detail: impl Into<String>) -> Self {
        Self {
            state: StatusState::Errored,
            exit_code: None,
            error_detail: Some(detail.into()),
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self.state, StatusState::Running)
    }

    /// Parse the on-disk representation.
    pub fn parse(contents: &str) -> serde_json::Result<Self> {
        serde_json::from_str(contents.trim())
    }

    pub fn to_json(&self) -> String {
        // Serializing this struct cannot fail: no maps with non-string keys.
        serde_json::to_string(self).unwrap_or_else(|_| String::from("{\"status\":\"running\"}"))
    }
}
