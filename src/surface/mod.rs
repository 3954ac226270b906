// src/surface/mod.rs

//! Execution context providers.
//!
//! A provider opens a user-visible "surface" (terminal window, tmux window)
//! and runs a wrapped command in it. Exactly one provider is active per run;
//! [`detect::detect_provider`] picks it at startup.
//!
//! - [`headless`] runs commands as plain child processes (tests, CI).
//! - [`tmux`] opens tmux windows when running inside tmux.
//! - [`macos`] drives Terminal.app through `osascript`.
//! - [`linux`] launches the first available terminal emulator.
//! - [`windows`] covers native Windows and WSL.
//!
//! Providers never fail loudly: an unusable host yields
//! [`SpawnOutcome::Failed`] with a reason the scheduler turns into a failed
//! job outcome.

use std::future::Future;
use std::pin::Pin;
use std::process::{Output, Stdio};

use tokio::process::Command;
use tokio::time::Instant;

use crate::track::{RegistryEntry, ScriptStyle, TrackedCommand};
use crate::types::SurfaceKind;

pub mod detect;
pub mod headless;
pub mod linux;
pub mod macos;
pub mod tmux;
pub mod windows;

pub use detect::{detect_provider, provider_for_kind};

/// Prefix carried by every surface label. Bulk cleanup only ever touches
/// surfaces whose label starts with this.
pub const SURFACE_LABEL_PREFIX: &str = "PMDISPATCH";

pub type SurfaceFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpawnOutcome {
    Spawned,
    Failed(String),
}

/// What a provider reports back from `spawn`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpawnedSurface {
    pub kind: SurfaceKind,
    pub outcome: SpawnOutcome,
    /// Platform identifier, when the platform hands one out.
    pub surface_id: Option<String>,
    /// PID of the launcher process, for best-effort cleanup.
    pub pid: Option<u32>,
}

impl SpawnedSurface {
    pub fn spawned(kind: SurfaceKind, surface_id: Option<String>, pid: Option<u32>) -> Self {
        Self {
            kind,
            outcome: SpawnOutcome::Spawned,
            surface_id,
            pid,
        }
    }

    pub fn failed(kind: SurfaceKind, reason: impl Into<String>) -> Self {
        Self {
            kind,
            outcome: SpawnOutcome::Failed(reason.into()),
            surface_id: None,
            pid: None,
        }
    }

    pub fn is_spawned(&self) -> bool {
        matches!(self.outcome, SpawnOutcome::Spawned)
    }
}

/// Everything the scheduler holds about one spawned job attempt.
#[derive(Debug, Clone)]
pub struct ExecutionHandle {
    pub label: String,
    pub tracked: TrackedCommand,
    pub surface: SpawnedSurface,
    pub spawned_at: Instant,
}

/// Capability interface for one kind of execution surface.
///
/// Methods return boxed futures so providers can be used as trait objects
/// (the concrete provider is only known at runtime).
pub trait SurfaceProvider: Send + Sync {
    fn kind(&self) -> SurfaceKind;

    /// How wrapped commands should be shaped for this surface.
    fn script_style(&self) -> ScriptStyle {
        ScriptStyle::INTERACTIVE
    }

    /// Whether a human can see (and close) the surfaces this provider opens.
    fn is_interactive(&self) -> bool {
        true
    }

    /// Open a new surface labelled `label` and run `tracked.command` in it.
    fn spawn<'a>(&'a self, tracked: &'a TrackedCommand, label: &'a str) -> SurfaceFuture<'a, SpawnedSurface>;

    /// Close a previously spawned surface. Returns `true` if it was closed.
    fn close<'a>(&'a self, entry: &'a RegistryEntry) -> SurfaceFuture<'a, bool>;

    /// Close any leftover surfaces carrying [`SURFACE_LABEL_PREFIX`] that the
    /// registry doesn't know about. Returns how many were closed.
    fn sweep(&self) -> SurfaceFuture<'_, usize> {
        Box::pin(async { 0 })
    }
}

impl<P: SurfaceProvider + ?Sized> SurfaceProvider for Box<P> {
    fn kind(&self) -> SurfaceKind {
        (**self).kind()
    }

    fn script_style(&self) -> ScriptStyle {
        (**self).script_style()
    }

    fn is_interactive(&self) -> bool {
        (**self).is_interactive()
    }

    fn spawn<'a>(&'a self, tracked: &'a TrackedCommand, label: &'a str) -> SurfaceFuture<'a, SpawnedSurface> {
        (**self).spawn(tracked, label)
    }

    fn close<'a>(&'a self, entry: &'a RegistryEntry) -> SurfaceFuture<'a, bool> {
        (**self).close(entry)
    }

    fn sweep(&self) -> SurfaceFuture<'_, usize> {
        (**self).sweep()
    }
}

/// Unique, machine-discoverable label for a job's surface.
///
/// Format: `PMDISPATCH-<token>-<pid>-<stamp>`.
pub fn surface_label(token: &str, stamp: u64) -> String {
    format!("{SURFACE_LABEL_PREFIX}-{token}-{}-{stamp}", std::process::id())
}

/// Run a short-lived host helper (`wmctrl`, `osascript`, `tmux`, ...) and
/// collect its output.
pub(crate) async fn run_host_command(program: &str, args: &[&str]) -> std::io::Result<Output> {
    Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .output()
        .await
}

/// Spawn a detached launcher process (a terminal emulator) without waiting.
pub(crate) fn launch_detached(program: &str, args: &[String]) -> std::io::Result<Option<u32>> {
    let child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()?;
    Ok(child.id())
}

/// Like [`launch_detached`], but `command_line` is appended verbatim.
///
/// `cmd.exe` does its own quote parsing, so Windows launchers must not go
/// through the standard argument escaping (which turns `"` into `\"`).
#[cfg(windows)]
pub(crate) fn launch_detached_raw(program: &str, command_line: &str) -> std::io::Result<Option<u32>> {
    use std::os::windows::process::CommandExt;

    let mut cmd = Command::new(program);
    cmd.as_std_mut().raw_arg(command_line);
    let child = cmd
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()?;
    Ok(child.id())
}

#[cfg(not(windows))]
pub(crate) fn launch_detached_raw(program: &str, _command_line: &str) -> std::io::Result<Option<u32>> {
    Err(std::io::Error::new(
        std::io::ErrorKind::Unsupported,
        format!("{program}: raw command lines are only supported on Windows"),
    ))
}
