// src/surface/linux.rs

//! Linux desktop provider.
//!
//! Opens the first terminal emulator found on `PATH` with the surface label
//! as its window title. Closing goes through `wmctrl` (matching on the
//! title). Only when `wmctrl` is missing is the launcher process signalled,
//! and only if its pid still belongs to a terminal emulator.

use std::path::PathBuf;
use std::time::Duration;

use tracing::{debug, info, warn};

use super::{
    SURFACE_LABEL_PREFIX, SpawnedSurface, SurfaceFuture, SurfaceProvider, launch_detached,
    run_host_command,
};
use crate::track::{RegistryEntry, TrackedCommand};
use crate::types::SurfaceKind;

/// Emulators in probing order.
pub const KNOWN_EMULATORS: &[&str] = &["gnome-terminal", "konsole", "xfce4-terminal", "xterm"];

const FALLBACK_SHELL: &str = "/bin/sh";
const CLOSE_CHECK_ATTEMPTS: u32 = 10;
const CLOSE_CHECK_INTERVAL: Duration = Duration::from_millis(100);

/// Launch arguments for `emulator`, titled `title`, running `command` via
/// `<shell> -c`.
///
/// Unknown emulators get the xterm convention.
pub fn emulator_argv(emulator: &str, title: &str, shell: &str, command: &str) -> Vec<String> {
    let mut args: Vec<String> = match emulator {
        "gnome-terminal" => vec!["--title".into(), title.into(), "--".into()],
        "konsole" => vec!["-p".into(), format!("tabtitle={title}"), "-e".into()],
        "xfce4-terminal" => vec!["--title".into(), title.into(), "-x".into()],
        _ => vec!["-T".into(), title.into(), "-e".into()],
    };
    args.extend([shell.into(), "-c".into(), command.into()]);
    args
}

/// Shell the emulator should start, from a `$SHELL` value.
///
/// Package managers installed through shell setup (nvm, pyenv, ...) are
/// only on `PATH` inside the user's own shell. Relative names are resolved
/// on `PATH`; anything unusable falls back to `/bin/sh`.
pub fn shell_from_env(value: Option<&str>) -> String {
    let Some(value) = value.map(str::trim).filter(|v| !v.is_empty()) else {
        return FALLBACK_SHELL.to_string();
    };
    if value.starts_with('/') {
        return value.to_string();
    }
    which::which(value)
        .map(|path| path.to_string_lossy().into_owned())
        .unwrap_or_else(|_| FALLBACK_SHELL.to_string())
}

#[derive(Debug, Clone)]
pub struct LinuxTerminalProvider {
    emulator: Option<(String, PathBuf)>,
    shell: String,
    has_display: bool,
}

impl LinuxTerminalProvider {
    /// Probe `PATH` and the display environment.
    pub fn detect() -> Self {
        let emulator = KNOWN_EMULATORS
            .iter()
            .find_map(|name| which::which(name).ok().map(|path| (name.to_string(), path)));
        let has_display = std::env::var_os("DISPLAY").is_some() || std::env::var_os("WAYLAND_DISPLAY").is_some();
        let shell = shell_from_env(std::env::var("SHELL").ok().as_deref());
        debug!(emulator = ?emulator, shell = %shell, has_display, "probed linux terminal support");
        Self {
            emulator,
            shell,
            has_display,
        }
    }

    async fn wmctrl_lists(&self, title: &str) -> Option<bool> {
        let out = run_host_command("wmctrl", &["-l"]).await.ok()?;
        if !out.status.success() {
            return None;
        }
        Some(String::from_utf8_lossy(&out.stdout).lines().any(|l| l.contains(title)))
    }

    /// Wait for a window titled `title` to disappear after `wmctrl -c`.
    ///
    /// Windows close asynchronously, so a single listing right after the
    /// request usually still shows it.
    async fn wait_for_window_gone(&self, title: &str) -> bool {
        for _ in 0..CLOSE_CHECK_ATTEMPTS {
            tokio::time::sleep(CLOSE_CHECK_INTERVAL).await;
            if self.wmctrl_lists(title).await == Some(false) {
                return true;
            }
        }
        false
    }

    /// Signal the recorded launcher pid, but only while it still names a
    /// terminal emulator. Launcher pids are short-lived and get reused.
    async fn kill_emulator_pid(pid: u32) -> bool {
        let comm = match tokio::fs::read_to_string(format!("/proc/{pid}/comm")).await {
            Ok(comm) => comm,
            Err(_) => return false,
        };
        if !is_emulator_comm(&comm) {
            debug!(pid, comm = %comm.trim(), "pid no longer belongs to a terminal emulator; not signalling");
            return false;
        }
        let pid = pid.to_string();
        matches!(run_host_command("kill", &["-TERM", &pid]).await, Ok(out) if out.status.success())
    }
}

/// Whether a `/proc/<pid>/comm` value names one of [`KNOWN_EMULATORS`].
pub fn is_emulator_comm(comm: &str) -> bool {
    let comm = comm.trim();
    KNOWN_EMULATORS.contains(&comm)
}

impl SurfaceProvider for LinuxTerminalProvider {
    fn kind(&self) -> SurfaceKind {
        SurfaceKind::LinuxTerminal
    }

    fn spawn<'a>(&'a self, tracked: &'a TrackedCommand, label: &'a str) -> SurfaceFuture<'a, SpawnedSurface> {
        Box::pin(async move {
            if !self.has_display {
                return SpawnedSurface::failed(
                    SurfaceKind::LinuxTerminal,
                    "no graphical display (DISPLAY/WAYLAND_DISPLAY unset)",
                );
            }
            let Some((name, path)) = &self.emulator else {
                return SpawnedSurface::failed(
                    SurfaceKind::LinuxTerminal,
                    format!("no terminal emulator found (tried {})", KNOWN_EMULATORS.join(", ")),
                );
            };

            let args = emulator_argv(name, label, &self.shell, &tracked.command);
            match launch_detached(&path.to_string_lossy(), &args) {
                Ok(pid) => {
                    info!(label, emulator = %name, pid = ?pid, "opened terminal window");
                    SpawnedSurface::spawned(SurfaceKind::LinuxTerminal, None, pid)
                }
                Err(e) => SpawnedSurface::failed(SurfaceKind::LinuxTerminal, format!("failed to launch {name}: {e}")),
            }
        })
    }

    fn close<'a>(&'a self, entry: &'a RegistryEntry) -> SurfaceFuture<'a, bool> {
        Box::pin(async move {
            if which::which("wmctrl").is_ok() {
                let _ = run_host_command("wmctrl", &["-c", &entry.label]).await;
                let closed = self.wait_for_window_gone(&entry.label).await;
                if closed {
                    debug!(label = %entry.label, "closed window via wmctrl");
                } else {
                    warn!(label = %entry.label, "window still open after wmctrl -c");
                }
                return closed;
            }

            match entry.pid {
                Some(pid) => {
                    let killed = Self::kill_emulator_pid(pid).await;
                    if !killed {
                        warn!(label = %entry.label, pid, "could not close terminal window (wmctrl not installed)");
                    }
                    killed
                }
                None => false,
            }
        })
    }

    fn sweep(&self) -> SurfaceFuture<'_, usize> {
        Box::pin(async move {
            if which::which("wmctrl").is_err() {
                return 0;
            }
            let out = match run_host_command("wmctrl", &["-l"]).await {
                Ok(out) if out.status.success() => out,
                _ => return 0,
            };

            let mut closed = 0;
            for line in String::from_utf8_lossy(&out.stdout).lines() {
                if !line.contains(SURFACE_LABEL_PREFIX) {
                    continue;
                }
                let Some(window_id) = line.split_whitespace().next() else {
                    continue;
                };
                if matches!(run_host_command("wmctrl", &["-ic", window_id]).await, Ok(out) if out.status.success()) {
                    closed += 1;
                }
            }
            closed
        })
    }
}
