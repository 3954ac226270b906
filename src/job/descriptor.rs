// src/job/descriptor.rs

use serde::Deserialize;

use crate::job::JobId;

/// Default priority for jobs that don't declare one. System package
/// managers conventionally use `0`, user-level tools `10`.
pub const DEFAULT_PRIORITY: i32 = 10;

/// Command definition for a job.
///
/// ```toml
/// commands.check = "brew update && brew outdated --verbose"
/// commands.upgrade = ["brew", "upgrade"]
/// ```
///
/// A string is passed to the shell untouched (so `&&`, pipes, etc. work);
/// an argv list is quoted element by element.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum CommandSpec {
    Shell(String),
    Argv(Vec<String>),
}

impl CommandSpec {
    /// Render as a single shell command line.
    pub fn to_shell(&self) -> String {
        match self {
            CommandSpec::Shell(s) => s.clone(),
            CommandSpec::Argv(args) => args
                .iter()
                .map(|a| shlex::try_quote(a).map(|q| q.into_owned()).unwrap_or_else(|_| a.clone()))
                .collect::<Vec<_>>()
                .join(" "),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            CommandSpec::Shell(s) => s.trim().is_empty(),
            CommandSpec::Argv(args) => args.is_empty() || args[0].trim().is_empty(),
        }
    }
}

impl From<&str> for CommandSpec {
    fn from(s: &str) -> Self {
        CommandSpec::Shell(s.to_string())
    }
}

/// One job as requested by a collaborator. Immutable for the duration of a
/// dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobDescriptor {
    pub id: JobId,
    pub command: CommandSpec,
    /// Needs an exclusive interactive elevation prompt (e.g. sudo).
    pub requires_privilege: bool,
    /// Lower runs earlier.
    pub priority: i32,
}

impl JobDescriptor {
    pub fn new(id: impl Into<JobId>, command: impl Into<CommandSpec>) -> Self {
        Self {
            id: id.into(),
            command: command.into(),
            requires_privilege: false,
            priority: DEFAULT_PRIORITY,
        }
    }

    pub fn privileged(mut self, requires_privilege: bool) -> Self {
        self.requires_privilege = requires_privilege;
        self
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }
}
