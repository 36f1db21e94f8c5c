//! Core domain types
//!
//! These types describe the work handed to the cluster scheduler and what
//! became of it. They are shared between the queue client, the runner and
//! the command-line front end.

pub mod job;
pub mod report;
pub mod task;
