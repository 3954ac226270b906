// src/sched/plan.rs

//! Partitioning of a job set into execution phases.

use crate::job::JobDescriptor;

/// Indices into the caller's job slice, grouped by phase.
///
/// Each phase is stable-sorted by priority, so jobs with equal priority keep
/// their request order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutionPlan {
    pub privileged: Vec<usize>,
    pub unprivileged: Vec<usize>,
}

impl ExecutionPlan {
    pub fn from_jobs(jobs: &[JobDescriptor]) -> Self {
        let (mut privileged, mut unprivileged): (Vec<usize>, Vec<usize>) =
            (0..jobs.len()).partition(|&i| jobs[i].requires_privilege);

        privileged.sort_by_key(|&i| jobs[i].priority);
        unprivileged.sort_by_key(|&i| jobs[i].priority);

        Self {
            privileged,
            unprivileged,
        }
    }
}
