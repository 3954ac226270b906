// src/surface/tmux.rs

//! tmux provider: one detached tmux window per job.

use tracing::{debug, info, warn};

use super::{SURFACE_LABEL_PREFIX, SpawnedSurface, SurfaceFuture, SurfaceProvider, run_host_command};
use crate::track::{RegistryEntry, TrackedCommand};
use crate::types::SurfaceKind;

#[derive(Debug, Default, Clone, Copy)]
pub struct TmuxProvider;

impl TmuxProvider {
    pub fn new() -> Self {
        Self
    }

    async fn kill_window(&self, target: &str) -> bool {
        match run_host_command("tmux", &["kill-window", "-t", target]).await {
            Ok(out) if out.status.success() => true,
            Ok(out) => {
                debug!(target, stderr = %String::from_utf8_lossy(&out.stderr).trim(), "tmux kill-window failed");
                false
            }
            Err(e) => {
                warn!(target, error = %e, "could not run tmux");
                false
            }
        }
    }
}

impl SurfaceProvider for TmuxProvider {
    fn kind(&self) -> SurfaceKind {
        SurfaceKind::Tmux
    }

    fn spawn<'a>(&'a self, tracked: &'a TrackedCommand, label: &'a str) -> SurfaceFuture<'a, SpawnedSurface> {
        Box::pin(async move {
            let args = [
                "new-window",
                "-d",
                "-n",
                label,
                "-P",
                "-F",
                "#{window_id}",
                "sh",
                "-c",
                tracked.command.as_str(),
            ];
            match run_host_command("tmux", &args).await {
                Ok(out) if out.status.success() => {
                    let window_id = String::from_utf8_lossy(&out.stdout).trim().to_string();
                    info!(label, window = %window_id, "opened tmux window");
                    let id = (!window_id.is_empty()).then_some(window_id);
                    SpawnedSurface::spawned(SurfaceKind::Tmux, id, None)
                }
                Ok(out) => SpawnedSurface::failed(
                    SurfaceKind::Tmux,
                    format!(
                        "tmux new-window failed: {}",
                        String::from_utf8_lossy(&out.stderr).trim()
                    ),
                ),
                Err(e) => SpawnedSurface::failed(SurfaceKind::Tmux, format!("could not run tmux: {e}")),
            }
        })
    }

    fn close<'a>(&'a self, entry: &'a RegistryEntry) -> SurfaceFuture<'a, bool> {
        Box::pin(async move {
            let target = entry.surface_id.as_deref().unwrap_or(entry.label.as_str());
            self.kill_window(target).await
        })
    }

    fn sweep(&self) -> SurfaceFuture<'_, usize> {
        Box::pin(async move {
            let out = match run_host_command("tmux", &["list-windows", "-a", "-F", "#{window_id} #{window_name}"]).await {
                Ok(out) if out.status.success() => out,
                _ => return 0,
            };

            let mut closed = 0;
            for line in String::from_utf8_lossy(&out.stdout).lines() {
                let Some((id, name)) = line.split_once(' ') else {
                    continue;
                };
                if name.starts_with(SURFACE_LABEL_PREFIX) && self.kill_window(id).await {
                    closed += 1;
                }
            }
            closed
        })
    }
}
