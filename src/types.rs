use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// How the unprivileged subset of a job set is executed.
///
/// Privileged jobs are always run one at a time regardless of this setting.
///
/// - `Parallel`: open every surface up-front, then poll them round-robin.
/// - `Sequential`: spawn one job, wait for it, then spawn the next. Useful
///   when watching each job matters more than throughput.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionPolicy {
    Parallel,
    Sequential,
}

impl Default for ExecutionPolicy {
    fn default() -> Self {
        ExecutionPolicy::Sequential
    }
}

impl FromStr for ExecutionPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "parallel" => Ok(ExecutionPolicy::Parallel),
            "sequential" => Ok(ExecutionPolicy::Sequential),
            other => Err(format!(
                "invalid policy: {other} (expected \"parallel\" or \"sequential\")"
            )),
        }
    }
}

/// Package-manager operation a job performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Check,
    Upgrade,
    Install,
}

impl Operation {
    pub fn as_str(self) -> &'static str {
        match self {
            Operation::Check => "check",
            Operation::Upgrade => "upgrade",
            Operation::Install => "install",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for Operation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "check" => Ok(Operation::Check),
            "upgrade" => Ok(Operation::Upgrade),
            "install" => Ok(Operation::Install),
            other => Err(format!(
                "invalid operation: {other} (expected \"check\", \"upgrade\" or \"install\")"
            )),
        }
    }
}

/// Kind of execution surface a job was spawned into.
///
/// Persisted in the registry so a later process can pick the right way to
/// close it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SurfaceKind {
    Headless,
    Tmux,
    MacTerminal,
    LinuxTerminal,
    Wsl,
    WindowsTerminal,
}

impl fmt::Display for SurfaceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SurfaceKind::Headless => "headless",
            SurfaceKind::Tmux => "tmux",
            SurfaceKind::MacTerminal => "mac-terminal",
            SurfaceKind::LinuxTerminal => "linux-terminal",
            SurfaceKind::Wsl => "wsl",
            SurfaceKind::WindowsTerminal => "windows-terminal",
        };
        f.pad(s)
    }
}
