// src/sched/mod.rs

//! Job scheduling.
//!
//! - [`plan`] partitions a job set into the privileged and unprivileged
//!   phases.
//! - [`state`] tracks each job's lifecycle and records the dispatch trace.
//! - [`scheduler`] drives spawning and polling for one dispatch.

pub mod plan;
pub mod scheduler;
pub mod state;

pub use plan::ExecutionPlan;
pub use scheduler::{Scheduler, SchedulerOptions};
pub use state::{DispatchTrace, JobState, JobTracker, TraceEvent};
