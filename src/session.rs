// src/session.rs

//! End-of-session handling: asking whether to close the surfaces a run
//! opened, and closing everything recorded in the registry.

use std::time::Duration;

use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

use crate::errors::Result;
use crate::surface::provider_for_kind;
use crate::track::JobRegistry;
use crate::types::SurfaceKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseDecision {
    Close,
    KeepOpen,
}

/// Interpret one answer line. Anything that isn't an explicit "keep" closes.
pub fn parse_answer(line: &str) -> CloseDecision {
    match line.trim().to_ascii_lowercase().as_str() {
        "k" | "keep" | "n" | "no" => CloseDecision::KeepOpen,
        _ => CloseDecision::Close,
    }
}

/// Ask whether to close `count` surfaces.
///
/// Pressing enter (or closing stdin) closes them. Typing `k`/`keep` or
/// firing `cancel` (Ctrl-C) keeps them. No answer within `timeout` closes
/// them.
pub async fn prompt_close<R>(
    count: usize,
    timeout: Duration,
    input: R,
    cancel: oneshot::Receiver<()>,
) -> CloseDecision
where
    R: AsyncBufRead + Unpin,
{
    eprintln!(
        "{count} job window(s) are still open. Press Enter to close them, or type 'k' to keep them \
         (closing automatically in {}s)...",
        timeout.as_secs()
    );

    let mut lines = input.lines();
    tokio::select! {
        answer = tokio::time::timeout(timeout, lines.next_line()) => match answer {
            Ok(Ok(Some(line))) => parse_answer(&line),
            Ok(Ok(None)) => CloseDecision::Close,
            Ok(Err(e)) => {
                warn!(error = %e, "could not read answer; closing job windows");
                CloseDecision::Close
            }
            Err(_) => {
                info!(timeout_secs = timeout.as_secs(), "no answer; closing job windows");
                CloseDecision::Close
            }
        },
        Ok(()) = cancel => {
            debug!("close prompt cancelled");
            CloseDecision::KeepOpen
        }
    }
}

/// Close every surface recorded in `registry`, sweep for leftover labelled
/// surfaces, then clear the registry. Returns how many surfaces were closed.
pub async fn close_all(registry: &JobRegistry) -> Result<usize> {
    let entries = registry.load_all()?;
    let mut closed = 0;
    let mut kinds: Vec<SurfaceKind> = Vec::new();

    for entry in &entries {
        let provider = provider_for_kind(entry.surface);
        if provider.close(entry).await {
            closed += 1;
        } else {
            debug!(job = %entry.job_id, label = %entry.label, "surface not closed");
        }
        if !kinds.contains(&entry.surface) {
            kinds.push(entry.surface);
        }
    }

    for kind in kinds {
        let swept = provider_for_kind(kind).sweep().await;
        if swept > 0 {
            info!(surface = %kind, swept, "closed leftover labelled surfaces");
        }
        closed += swept;
    }

    registry.clear()?;
    info!(closed, recorded = entries.len(), "closed job surfaces");
    Ok(closed)
}
