// src/sched/state.rs

//! Per-job dispatch state and the dispatch trace.

use std::fmt;

use tokio::time::Instant;
use tracing::{debug, warn};

use crate::job::JobId;

/// Lifecycle of one job within a dispatch.
///
/// `Pending -> Spawning -> Spawned -> Polling -> Done`, with the shortcut
/// `Spawning -> Done` when the surface could not be opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Pending,
    Spawning,
    Spawned,
    Polling,
    Done { success: bool },
}

impl JobState {
    pub fn is_done(self) -> bool {
        matches!(self, JobState::Done { .. })
    }

    fn can_become(self, next: JobState) -> bool {
        use JobState::*;
        matches!(
            (self, next),
            (Pending, Spawning) | (Spawning, Spawned) | (Spawning, Done { .. }) | (Spawned, Polling) | (Polling, Done { .. })
        )
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobState::Pending => f.write_str("pending"),
            JobState::Spawning => f.write_str("spawning"),
            JobState::Spawned => f.write_str("spawned"),
            JobState::Polling => f.write_str("polling"),
            JobState::Done { success: true } => f.write_str("done(ok)"),
            JobState::Done { success: false } => f.write_str("done(failed)"),
        }
    }
}

/// One recorded state transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceEvent {
    pub index: usize,
    pub job_id: JobId,
    pub state: JobState,
    pub at: Instant,
}

/// Ordered log of every transition made during a dispatch.
#[derive(Debug, Clone, Default)]
pub struct DispatchTrace {
    events: Vec<TraceEvent>,
}

impl DispatchTrace {
    pub fn events(&self) -> &[TraceEvent] {
        &self.events
    }

    /// First time `job_id` entered `state`.
    pub fn first(&self, job_id: &str, state: JobState) -> Option<Instant> {
        self.events
            .iter()
            .find(|e| e.job_id == job_id && e.state == state)
            .map(|e| e.at)
    }

    /// When `job_id` reached a `Done` state.
    pub fn done_at(&self, job_id: &str) -> Option<Instant> {
        self.events
            .iter()
            .find(|e| e.job_id == job_id && e.state.is_done())
            .map(|e| e.at)
    }

    /// Position in the trace at which `job_id` entered `state`.
    pub fn position(&self, job_id: &str, state: JobState) -> Option<usize> {
        self.events
            .iter()
            .position(|e| e.job_id == job_id && e.state == state)
    }

    /// Position in the trace at which `job_id` reached `Done`.
    pub fn done_position(&self, job_id: &str) -> Option<usize> {
        self.events
            .iter()
            .position(|e| e.job_id == job_id && e.state.is_done())
    }

    /// Job ids in the order they entered `Spawning`.
    pub fn spawn_order(&self) -> Vec<JobId> {
        self.events
            .iter()
            .filter(|e| e.state == JobState::Spawning)
            .map(|e| e.job_id.clone())
            .collect()
    }

    /// Job ids in the order they reached `Done`.
    pub fn completion_order(&self) -> Vec<JobId> {
        self.events
            .iter()
            .filter(|e| e.state.is_done())
            .map(|e| e.job_id.clone())
            .collect()
    }
}

/// Current state of every job in a dispatch, indexed like the request.
#[derive(Debug)]
pub struct JobTracker {
    ids: Vec<JobId>,
    states: Vec<JobState>,
    trace: DispatchTrace,
}

impl JobTracker {
    pub fn new(ids: Vec<JobId>) -> Self {
        let states = vec![JobState::Pending; ids.len()];
        let at = Instant::now();
        let events = ids
            .iter()
            .enumerate()
            .map(|(index, id)| TraceEvent {
                index,
                job_id: id.clone(),
                state: JobState::Pending,
                at,
            })
            .collect();
        Self {
            ids,
            states,
            trace: DispatchTrace { events },
        }
    }

    /// Move job `index` to `next`. Illegal transitions are logged and ignored.
    pub fn advance(&mut self, index: usize, next: JobState) {
        let Some(current) = self.states.get(index).copied() else {
            warn!(index, "state transition for unknown job index");
            return;
        };
        let job_id = &self.ids[index];
        if !current.can_become(next) {
            warn!(job = %job_id, from = %current, to = %next, "ignoring illegal job state transition");
            return;
        }

        debug!(job = %job_id, from = %current, to = %next, "job state transition");
        self.states[index] = next;
        self.trace.events.push(TraceEvent {
            index,
            job_id: job_id.clone(),
            state: next,
            at: Instant::now(),
        });
    }

    pub fn trace(&self) -> &DispatchTrace {
        &self.trace
    }

    pub fn into_trace(self) -> DispatchTrace {
        self.trace
    }
}
