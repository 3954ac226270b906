// src/surface/detect.rs

//! Startup selection of the active provider.

use tracing::info;

use super::SurfaceProvider;
use super::headless::HeadlessProvider;
use super::linux::LinuxTerminalProvider;
use super::macos::MacTerminalProvider;
use super::tmux::TmuxProvider;
use super::windows::{WindowsTerminalProvider, WslProvider};
use crate::types::SurfaceKind;

/// Pick the provider for this run.
///
/// Order: forced headless, then tmux (when already inside tmux), then the
/// host platform.
pub fn detect_provider(headless: bool) -> Box<dyn SurfaceProvider> {
    let kind = detect_kind(headless, std::env::var_os("TMUX").is_some(), is_wsl());
    info!(surface = %kind, "selected execution surface");
    provider_for_kind(kind)
}

/// Pure selection logic behind [`detect_provider`].
pub fn detect_kind(headless: bool, inside_tmux: bool, wsl: bool) -> SurfaceKind {
    if headless {
        SurfaceKind::Headless
    } else if inside_tmux {
        SurfaceKind::Tmux
    } else if cfg!(target_os = "macos") {
        SurfaceKind::MacTerminal
    } else if cfg!(windows) {
        SurfaceKind::WindowsTerminal
    } else if wsl {
        SurfaceKind::Wsl
    } else {
        SurfaceKind::LinuxTerminal
    }
}

/// Provider able to handle surfaces of `kind`, e.g. for closing entries
/// recorded by an earlier session.
pub fn provider_for_kind(kind: SurfaceKind) -> Box<dyn SurfaceProvider> {
    match kind {
        SurfaceKind::Headless => Box::new(HeadlessProvider::new()),
        SurfaceKind::Tmux => Box::new(TmuxProvider::new()),
        SurfaceKind::MacTerminal => Box::new(MacTerminalProvider::new()),
        SurfaceKind::LinuxTerminal => Box::new(LinuxTerminalProvider::detect()),
        SurfaceKind::Wsl => Box::new(WslProvider::new()),
        SurfaceKind::WindowsTerminal => Box::new(WindowsTerminalProvider::new()),
    }
}

fn is_wsl() -> bool {
    if !cfg!(target_os = "linux") {
        return false;
    }
    std::fs::read_to_string("/proc/sys/kernel/osrelease")
        .map(|release| release.to_ascii_lowercase().contains("microsoft"))
        .unwrap_or(false)
}
