//! Batch report types
//!
//! A batch run returns one [`TaskReport`] per input task, in input order.
//! Success is inferred only from the job leaving the scheduler queue; the
//! script's own output is never inspected.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::job::JobId;
use super::task::Task;

/// Final outcome of one task
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum TaskOutcome {
    /// Seen by the scheduler, then left the queue
    Finished,
    /// Submitted but never observed in the queue or through its log file
    Unconfirmed,
    /// Cancelled through the runner
    Terminated,
    /// The submission tool gave no job identifier
    SubmissionFailed { reason: String },
}

impl TaskOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, TaskOutcome::Finished)
    }
}

/// What happened to a single task
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskReport {
    pub task: Task,
    pub job_name: String,
    pub job_id: Option<JobId>,
    pub submitted_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub outcome: TaskOutcome,
}

/// Result of running one batch of tasks
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchReport {
    pub id: Uuid,
    pub script: String,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub tasks: Vec<TaskReport>,
}

impl BatchReport {
    /// Creates an empty report for a batch starting now
    pub fn start(script: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            script: script.into(),
            started_at: now,
            completed_at: now,
            tasks: Vec::new(),
        }
    }

    /// Marks the batch as complete
    pub fn complete(mut self) -> Self {
        self.completed_at = Utc::now();
        self
    }

    pub fn finished_count(&self) -> usize {
        self.tasks.iter().filter(|t| t.outcome.is_success()).count()
    }

    pub fn failed_count(&self) -> usize {
        self.tasks.len() - self.finished_count()
    }

    /// True when every task finished normally
    pub fn all_finished(&self) -> bool {
        self.failed_count() == 0
    }
}
