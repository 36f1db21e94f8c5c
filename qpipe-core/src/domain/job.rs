//! Job domain types

use serde::{Deserialize, Serialize};
use std::fmt;

/// Scheduler-issued job identifier
///
/// Opaque to qpipe: it is whatever the submission tool reported and is only
/// ever compared against the identifiers the query tool lists.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(String);

impl JobId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for JobId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Lifecycle state of a job
///
/// Running is not a state of its own: a `Submitted` job is running until
/// the scheduler stops listing it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobState {
    New,
    Submitted,
    Finished,
    Terminated,
}

impl JobState {
    /// Check if a move from `self` to `next` is a legal transition
    ///
    /// `New` is reachable from anywhere because resubmission resets a job.
    pub fn can_transition_to(&self, next: JobState) -> bool {
        match (self, next) {
            (_, JobState::New) => true,
            (JobState::New, JobState::Submitted) => true,
            (JobState::Submitted, JobState::Finished) => true,
            (JobState::Submitted, JobState::Terminated) => true,
            _ => false,
        }
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            JobState::New => "new",
            JobState::Submitted => "submitted",
            JobState::Finished => "finished",
            JobState::Terminated => "terminated",
        };
        f.write_str(s)
    }
}
