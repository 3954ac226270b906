// src/job/mod.rs

//! Job data model shared by the scheduler and its collaborators.
//!
//! - [`descriptor`] holds what a collaborator asks us to run.
//! - [`outcome`] holds the normalized verdict handed back.

pub mod descriptor;
pub mod outcome;

/// Canonical job identifier (the tool name, e.g. `"apt"`).
pub type JobId = String;

pub use descriptor::{CommandSpec, JobDescriptor};
pub use outcome::JobOutcome;
