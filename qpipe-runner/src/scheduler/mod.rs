//! Scheduler layer for the runner
//!
//! This layer drives a whole batch of tasks through the cluster queue:
//! admitting new jobs while there is room, polling outstanding jobs until
//! they leave the queue, and collecting a report of what happened.

pub mod batch;

pub use batch::BatchRunner;
