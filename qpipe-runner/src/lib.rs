//! qpipe Runner
//!
//! Submits a batch of pipeline tasks to a cluster scheduler while keeping
//! the number of queued jobs under a ceiling.
//!
//! Architecture:
//! - Configuration: ceiling and polling intervals, from environment or defaults
//! - Job: lifecycle of one submitted task, inferred by polling the queue
//! - Admission: decides whether another job may be submitted
//! - Scheduler: the batch loop tying the three together
//!
//! The scheduler is only ever reached through [`qpipe_client::QueueClient`],
//! so all real concurrency lives on the cluster and this crate stays a
//! single cooperative polling loop.

pub mod admission;
pub mod config;
pub mod job;
pub mod scheduler;

#[cfg(test)]
mod testing;

pub use admission::AdmissionController;
pub use config::{JobTiming, RunnerConfig};
pub use job::{Job, JobError};
pub use scheduler::BatchRunner;
