// src/surface/headless.rs

//! Headless provider: no window at all.
//!
//! The wrapped command runs as a plain child process and `spawn` only returns
//! once it has exited, so the status artifact is already terminal by the time
//! the scheduler starts polling. Used for CI and tests, and forced with
//! `PMDISPATCH_HEADLESS=1`.

use std::process::Stdio;

use tokio::process::Command;
use tracing::{debug, warn};

use super::{SpawnedSurface, SurfaceFuture, SurfaceProvider};
use crate::track::{RegistryEntry, ScriptFlavor, ScriptStyle, TrackedCommand};
use crate::types::SurfaceKind;

/// `cmd /C <command>`, with the command line passed verbatim so the quoted
/// script path survives `cmd.exe`'s own parsing.
#[cfg(windows)]
fn shell_command(command: &str) -> Command {
    use std::os::windows::process::CommandExt;

    let mut cmd = Command::new("cmd");
    cmd.as_std_mut().raw_arg(format!("/C {command}"));
    cmd
}

#[cfg(not(windows))]
fn shell_command(command: &str) -> Command {
    let mut cmd = Command::new("sh");
    cmd.arg("-c").arg(command);
    cmd
}

#[derive(Debug, Default, Clone, Copy)]
pub struct HeadlessProvider;

impl HeadlessProvider {
    pub fn new() -> Self {
        Self
    }
}

impl SurfaceProvider for HeadlessProvider {
    fn kind(&self) -> SurfaceKind {
        SurfaceKind::Headless
    }

    fn script_style(&self) -> ScriptStyle {
        if cfg!(windows) {
            ScriptStyle {
                flavor: ScriptFlavor::Batch,
                hold_open: false,
            }
        } else {
            ScriptStyle::HEADLESS
        }
    }

    fn is_interactive(&self) -> bool {
        false
    }

    fn spawn<'a>(&'a self, tracked: &'a TrackedCommand, label: &'a str) -> SurfaceFuture<'a, SpawnedSurface> {
        Box::pin(async move {
            let mut cmd = shell_command(&tracked.command);
            cmd.stdin(Stdio::null())
                .stdout(Stdio::null())
                .stderr(Stdio::null())
                .kill_on_drop(true);

            let mut child = match cmd.spawn() {
                Ok(child) => child,
                Err(e) => {
                    warn!(label, error = %e, "failed to start headless job");
                    return SpawnedSurface::failed(SurfaceKind::Headless, format!("failed to start shell: {e}"));
                }
            };
            let pid = child.id();

            match child.wait().await {
                Ok(status) => debug!(label, code = ?status.code(), "headless job exited"),
                // The status artifact decides the verdict; a lost wait is not a spawn failure.
                Err(e) => warn!(label, error = %e, "failed to wait for headless job"),
            }

            SpawnedSurface::spawned(SurfaceKind::Headless, None, pid)
        })
    }

    fn close<'a>(&'a self, _entry: &'a RegistryEntry) -> SurfaceFuture<'a, bool> {
        Box::pin(async { false })
    }
}
