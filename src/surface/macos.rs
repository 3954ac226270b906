// src/surface/macos.rs

//! macOS provider driving Terminal.app through AppleScript.

use tracing::{debug, info};

use super::{SURFACE_LABEL_PREFIX, SpawnedSurface, SurfaceFuture, SurfaceProvider, run_host_command};
use crate::track::{RegistryEntry, TrackedCommand};
use crate::types::SurfaceKind;

#[derive(Debug, Default, Clone, Copy)]
pub struct MacTerminalProvider;

impl MacTerminalProvider {
    pub fn new() -> Self {
        Self
    }
}

/// Escape a string for use inside an AppleScript string literal.
pub fn applescript_quote(s: &str) -> String {
    format!("\"{}\"", s.replace('\\', "\\\\").replace('"', "\\\""))
}

/// Script that opens a new window running `command`, titles it `label`, and
/// returns the window id.
pub fn spawn_script(command: &str, label: &str) -> String {
    format!(
        "tell application \"Terminal\"\n\
         \tactivate\n\
         \tset t to do script {}\n\
         \tset custom title of t to {}\n\
         \treturn id of window 1\n\
         end tell",
        applescript_quote(command),
        applescript_quote(label),
    )
}

impl SurfaceProvider for MacTerminalProvider {
    fn kind(&self) -> SurfaceKind {
        SurfaceKind::MacTerminal
    }

    fn spawn<'a>(&'a self, tracked: &'a TrackedCommand, label: &'a str) -> SurfaceFuture<'a, SpawnedSurface> {
        Box::pin(async move {
            let script = spawn_script(&tracked.command, label);
            match run_host_command("osascript", &["-e", &script]).await {
                Ok(out) if out.status.success() => {
                    let id = String::from_utf8_lossy(&out.stdout).trim().to_string();
                    info!(label, window = %id, "opened Terminal.app window");
                    SpawnedSurface::spawned(SurfaceKind::MacTerminal, (!id.is_empty()).then_some(id), None)
                }
                Ok(out) => SpawnedSurface::failed(
                    SurfaceKind::MacTerminal,
                    format!("osascript failed: {}", String::from_utf8_lossy(&out.stderr).trim()),
                ),
                Err(e) => SpawnedSurface::failed(SurfaceKind::MacTerminal, format!("could not run osascript: {e}")),
            }
        })
    }

    fn close<'a>(&'a self, entry: &'a RegistryEntry) -> SurfaceFuture<'a, bool> {
        Box::pin(async move {
            let Some(id) = entry.surface_id.as_deref() else {
                return false;
            };
            // Window ids are plain integers; anything else did not come from us.
            if !id.chars().all(|c| c.is_ascii_digit()) {
                return false;
            }
            let script = format!("tell application \"Terminal\" to close (every window whose id is {id})");
            let closed = matches!(run_host_command("osascript", &["-e", &script]).await, Ok(out) if out.status.success());
            debug!(label = %entry.label, closed, "close Terminal.app window");
            closed
        })
    }

    fn sweep(&self) -> SurfaceFuture<'_, usize> {
        Box::pin(async move {
            let script = format!(
                "tell application \"Terminal\"\n\
                 \tset n to 0\n\
                 \trepeat with w in (every window whose custom title of selected tab starts with {})\n\
                 \t\tclose w\n\
                 \t\tset n to n + 1\n\
                 \tend repeat\n\
                 \treturn n\n\
                 end tell",
                applescript_quote(SURFACE_LABEL_PREFIX)
            );
            match run_host_command("osascript", &["-e", &script]).await {
                Ok(out) if out.status.success() => String::from_utf8_lossy(&out.stdout).trim().parse().unwrap_or(0),
                _ => 0,
            }
        })
    }
}
