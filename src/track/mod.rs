// src/track/mod.rs

//! File-based job tracking.
//!
//! - [`wrapper`] turns a raw command into a script that reports through a
//!   log and a status artifact.
//! - [`status`] defines the status artifact format.
//! - [`poller`] watches status artifacts until they turn terminal.
//! - [`registry`] persists what was spawned so surfaces can be reclaimed
//!   later, even from another process.

pub mod poller;
pub mod registry;
pub mod status;
pub mod wrapper;

pub use poller::StatusPoller;
pub use registry::{JobRegistry, RegistryEntry};
pub use status::{StatusRecord, StatusState};
pub use wrapper::{CommandWrapper, ScriptFlavor, ScriptStyle, TrackedCommand, WrapperOptions};
