//! qpipe Core
//!
//! Core types shared by the qpipe crates.
//!
//! This crate contains:
//! - Domain types: tasks, scheduler job identifiers and job lifecycle states
//! - Reports: per-task and per-batch outcomes returned by the runner

pub mod domain;

pub use domain::job::{JobId, JobState};
pub use domain::report::{BatchReport, TaskOutcome, TaskReport};
pub use domain::task::Task;
