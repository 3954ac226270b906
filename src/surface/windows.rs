// src/surface/windows.rs

//! Windows and WSL providers.
//!
//! Both prefer Windows Terminal (`wt`) and fall back to `cmd /c start`.
//! Neither can close the windows it opens: there is no handle to close by,
//! so the wrapped command's own auto-close is the only cleanup.

use tracing::info;

use super::{SpawnedSurface, SurfaceFuture, SurfaceProvider, launch_detached, launch_detached_raw};
use crate::track::{RegistryEntry, ScriptFlavor, ScriptStyle, TrackedCommand};
use crate::types::SurfaceKind;

/// How one launcher candidate receives its arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LaunchArgs {
    /// Escaped element by element (Linux side of WSL).
    Argv(Vec<String>),
    /// Handed to the program verbatim (native `cmd.exe` / `wt`).
    Raw(String),
}

fn launch_first(kind: SurfaceKind, candidates: Vec<(String, LaunchArgs)>, label: &str) -> SpawnedSurface {
    let mut errors = Vec::new();
    for (program, args) in candidates {
        let launched = match &args {
            LaunchArgs::Argv(argv) => launch_detached(&program, argv),
            LaunchArgs::Raw(line) => launch_detached_raw(&program, line),
        };
        match launched {
            Ok(pid) => {
                info!(label, launcher = %program, "opened terminal window");
                return SpawnedSurface::spawned(kind, None, pid);
            }
            Err(e) => errors.push(format!("{program}: {e}")),
        }
    }
    SpawnedSurface::failed(kind, format!("no terminal launcher worked ({})", errors.join("; ")))
}

/// Native Windows.
#[derive(Debug, Default, Clone, Copy)]
pub struct WindowsTerminalProvider;

impl WindowsTerminalProvider {
    pub fn new() -> Self {
        Self
    }

    /// `command` is a `cmd.exe` command-line fragment (the quoted script
    /// path) and is passed through unescaped. `start` only takes its first
    /// argument as the window title when it is quoted.
    pub fn launch_candidates(command: &str, label: &str) -> Vec<(String, LaunchArgs)> {
        let mut candidates = Vec::new();
        if which::which("wt").is_ok() {
            candidates.push((
                "wt".to_string(),
                LaunchArgs::Raw(format!("--title {label} cmd /k {command}")),
            ));
        }
        candidates.push((
            "cmd".to_string(),
            LaunchArgs::Raw(format!("/c start \"{label}\" cmd /k {command}")),
        ));
        candidates
    }
}

impl SurfaceProvider for WindowsTerminalProvider {
    fn kind(&self) -> SurfaceKind {
        SurfaceKind::WindowsTerminal
    }

    fn script_style(&self) -> ScriptStyle {
        ScriptStyle {
            flavor: ScriptFlavor::Batch,
            hold_open: true,
        }
    }

    fn spawn<'a>(&'a self, tracked: &'a TrackedCommand, label: &'a str) -> SurfaceFuture<'a, SpawnedSurface> {
        Box::pin(async move {
            launch_first(
                SurfaceKind::WindowsTerminal,
                Self::launch_candidates(&tracked.command, label),
                label,
            )
        })
    }

    fn close<'a>(&'a self, _entry: &'a RegistryEntry) -> SurfaceFuture<'a, bool> {
        Box::pin(async { false })
    }
}

/// Linux under WSL: the window is a Windows one, the job runs in the distro.
#[derive(Debug, Default, Clone, Copy)]
pub struct WslProvider;

impl WslProvider {
    pub fn new() -> Self {
        Self
    }

    /// The `cmd.exe` fallback passes no title: a bare first argument to
    /// `start` would be taken as the program to run.
    pub fn launch_candidates(command: &str, label: &str) -> Vec<(String, LaunchArgs)> {
        let in_distro = |prefix: Vec<String>| {
            let mut args = prefix;
            args.extend(["wsl.exe".into(), "-e".into(), "sh".into(), "-c".into(), command.into()]);
            LaunchArgs::Argv(args)
        };
        vec![
            ("wt.exe".to_string(), in_distro(vec!["--title".into(), label.into()])),
            ("cmd.exe".to_string(), in_distro(vec!["/c".into(), "start".into()])),
        ]
    }
}

impl SurfaceProvider for WslProvider {
    fn kind(&self) -> SurfaceKind {
        SurfaceKind::Wsl
    }

    fn spawn<'a>(&'a self, tracked: &'a TrackedCommand, label: &'a str) -> SurfaceFuture<'a, SpawnedSurface> {
        Box::pin(async move { launch_first(SurfaceKind::Wsl, Self::launch_candidates(&tracked.command, label), label) })
    }

    fn close<'a>(&'a self, _entry: &'a RegistryEntry) -> SurfaceFuture<'a, bool> {
        Box::pin(async { false })
    }
}
