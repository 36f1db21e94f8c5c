//! Job lifecycle
//!
//! A [`Job`] wraps one task submitted to the scheduler. The scheduler never
//! tells us anything, so every state change after submission is inferred
//! from polling its queue listing.
//!
//! ```text
//! New --start()--> Submitted --(gone from queue)--> Finished
//!                      |
//!                      +--terminate()--> Terminated
//! ```
//!
//! `resubmit()` resets any state back to `New` and starts again.

use chrono::{DateTime, Utc};
use qpipe_client::{ClientError, QueueClient, SubmitRequest};
use qpipe_core::{JobId, JobState, Task, TaskOutcome, TaskReport};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tokio::time::{Instant, sleep};
use tracing::{debug, error, info, warn};

use crate::config::JobTiming;

/// Result type alias for job operations
pub type Result<T> = std::result::Result<T, JobError>;

/// Errors raised by job transitions
#[derive(Debug, Error)]
pub enum JobError {
    /// The scheduler rejected or failed the request
    #[error(transparent)]
    Client(#[from] ClientError),

    /// The requested transition is not allowed from the current state
    #[error("Job '{name}' cannot move from {from} to {to}")]
    InvalidTransition {
        name: String,
        from: JobState,
        to: JobState,
    },

    /// Only running jobs can be terminated
    #[error("Job '{0}' is not running")]
    NotRunning(String),
}

#[derive(Debug, Clone)]
enum Lifecycle {
    New,
    Submitted {
        id: JobId,
        confirmed: bool,
        misses: u32,
    },
    Finished {
        id: JobId,
        confirmed: bool,
    },
    Terminated {
        id: JobId,
    },
}

impl Lifecycle {
    fn state(&self) -> JobState {
        match self {
            Lifecycle::New => JobState::New,
            Lifecycle::Submitted { .. } => JobState::Submitted,
            Lifecycle::Finished { .. } => JobState::Finished,
            Lifecycle::Terminated { .. } => JobState::Terminated,
        }
    }

    fn id(&self) -> Option<&JobId> {
        match self {
            Lifecycle::New => None,
            Lifecycle::Submitted { id, .. }
            | Lifecycle::Finished { id, .. }
            | Lifecycle::Terminated { id } => Some(id),
        }
    }
}

/// Job name for the `ordinal`-th task (1-based) of a script
///
/// `/opt/pipelines/qc.sh` gives `qc_1`, `qc_2`, ...
pub fn job_name(script: &str, ordinal: usize) -> String {
    let stem = Path::new(script)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "job".to_string());
    format!("{}_{}", stem, ordinal)
}

/// One task's submission record and lifecycle tracker
pub struct Job {
    name: String,
    script: String,
    task: Task,
    working_dir: Option<PathBuf>,
    client: Arc<dyn QueueClient>,
    timing: JobTiming,
    lifecycle: Lifecycle,
    submitted_at: Option<DateTime<Utc>>,
    completed_at: Option<DateTime<Utc>>,
}

impl Job {
    /// Creates an unsubmitted job
    pub fn new(
        name: impl Into<String>,
        script: impl Into<String>,
        task: Task,
        working_dir: Option<PathBuf>,
        client: Arc<dyn QueueClient>,
        timing: JobTiming,
    ) -> Self {
        Self {
            name: name.into(),
            script: script.into(),
            task,
            working_dir,
            client,
            timing,
            lifecycle: Lifecycle::New,
            submitted_at: None,
            completed_at: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn task(&self) -> &Task {
        &self.task
    }

    pub fn working_dir(&self) -> Option<&Path> {
        self.working_dir.as_deref()
    }

    pub fn state(&self) -> JobState {
        self.lifecycle.state()
    }

    /// Scheduler id; present exactly when the job has been submitted
    pub fn id(&self) -> Option<&JobId> {
        self.lifecycle.id()
    }

    /// Scheduler log file, `<name>.o<id>` in the working directory
    pub fn log_path(&self) -> Option<PathBuf> {
        let id = self.id()?;
        let file = format!("{}.o{}", self.name, id);
        Some(match &self.working_dir {
            Some(dir) => dir.join(file),
            None => PathBuf::from(file),
        })
    }

    /// True once the scheduler (or the log file) has shown the job exists
    pub fn is_confirmed(&self) -> bool {
        match &self.lifecycle {
            Lifecycle::Submitted { confirmed, .. } | Lifecycle::Finished { confirmed, .. } => {
                *confirmed
            }
            _ => false,
        }
    }

    fn transition(&mut self, next: Lifecycle) -> Result<()> {
        let from = self.lifecycle.state();
        let to = next.state();

        if !from.can_transition_to(to) {
            return Err(JobError::InvalidTransition {
                name: self.name.clone(),
                from,
                to,
            });
        }

        debug!("Job '{}': {} -> {}", self.name, from, to);
        self.lifecycle = next;
        Ok(())
    }

    /// Submits the job and waits until the scheduler shows it
    ///
    /// Starting a job that is already submitted or finished does nothing and
    /// returns its id. A terminated job has to go through [`Job::resubmit`].
    pub async fn start(&mut self) -> Result<JobId> {
        match &self.lifecycle {
            Lifecycle::Submitted { id, .. } | Lifecycle::Finished { id, .. } => {
                return Ok(id.clone());
            }
            Lifecycle::Terminated { .. } => {
                return Err(JobError::InvalidTransition {
                    name: self.name.clone(),
                    from: JobState::Terminated,
                    to: JobState::Submitted,
                });
            }
            Lifecycle::New => {}
        }

        let request = SubmitRequest {
            name: self.name.clone(),
            working_dir: self.working_dir.clone(),
            script: self.script.clone(),
            args: self.task.args().to_vec(),
        };

        let id = self.client.submit(&request).await?;

        self.transition(Lifecycle::Submitted {
            id: id.clone(),
            confirmed: false,
            misses: 0,
        })?;
        self.submitted_at = Some(Utc::now());

        self.wait_for_visibility().await;
        Ok(id)
    }

    /// Blocks until the queue lists the job or its log file appears
    ///
    /// Submission and queue visibility are not atomic. Gives up after the
    /// visibility timeout and leaves the job unconfirmed.
    async fn wait_for_visibility(&mut self) {
        let (Some(id), Some(log)) = (self.id().cloned(), self.log_path()) else {
            return;
        };
        let deadline = Instant::now() + self.timing.visibility_timeout;

        debug!("Waiting for job '{}' to start", self.name);
        loop {
            let listed = match self.client.list_jobs(self.timing.user.as_deref()).await {
                Ok(ids) => ids.contains(&id),
                Err(e) => {
                    warn!("Unable to check queue for job {}: {}", id, e);
                    false
                }
            };

            if listed || log.exists() {
                info!("Job {} started ({})", id, Utc::now().to_rfc2822());
                if let Lifecycle::Submitted { confirmed, .. } = &mut self.lifecycle {
                    *confirmed = true;
                }
                return;
            }

            if Instant::now() >= deadline {
                warn!(
                    "Job {} not seen in the queue after {:?}, continuing without confirmation",
                    id, self.timing.visibility_timeout
                );
                return;
            }

            sleep(self.timing.poll_interval).await;
        }
    }

    /// Polls the scheduler and reports whether the job is still running
    ///
    /// Never-submitted and terminal jobs return false without touching the
    /// scheduler. A job only counts as finished after it has been missing
    /// from `absence_threshold` consecutive listings; a failed query tells
    /// us nothing and leaves the job running.
    pub async fn is_running(&mut self) -> bool {
        let Lifecycle::Submitted { id, .. } = &self.lifecycle else {
            return false;
        };
        let id = id.clone();

        let listed = match self.client.list_jobs(self.timing.user.as_deref()).await {
            Ok(ids) => ids.contains(&id),
            Err(e) => {
                warn!("Unable to poll queue for job {}: {}", id, e);
                return true;
            }
        };

        let Lifecycle::Submitted {
            confirmed, misses, ..
        } = &mut self.lifecycle
        else {
            return false;
        };

        if listed {
            *confirmed = true;
            *misses = 0;
            return true;
        }

        *misses += 1;
        if *misses < self.timing.absence_threshold {
            debug!(
                "Job {} missing from queue ({}/{})",
                id, misses, self.timing.absence_threshold
            );
            return true;
        }

        let confirmed = *confirmed;
        if let Err(e) = self.transition(Lifecycle::Finished { id, confirmed }) {
            error!("{}", e);
            return true;
        }
        self.completed_at = Some(Utc::now());
        false
    }

    /// Asks the scheduler to cancel a running job
    ///
    /// The job is marked terminated once the request is accepted; the
    /// scheduler may still take a while to actually stop it.
    pub async fn terminate(&mut self) -> Result<()> {
        if !self.is_running().await {
            return Err(JobError::NotRunning(self.name.clone()));
        }

        let Some(id) = self.id().cloned() else {
            return Err(JobError::NotRunning(self.name.clone()));
        };

        self.client.cancel(&id).await?;
        self.transition(Lifecycle::Terminated { id: id.clone() })?;
        self.completed_at = Some(Utc::now());

        warn!("Job {} ('{}') terminated", id, self.name);
        Ok(())
    }

    /// Terminates the job if it is running, then submits it again
    ///
    /// A terminated job, whether cancelled here or earlier, is only
    /// resubmitted once its old id has left the queue. Returns the new id.
    pub async fn resubmit(&mut self) -> Result<JobId> {
        if self.is_running().await {
            match self.terminate().await {
                // Left the queue between the two polls
                Ok(()) | Err(JobError::NotRunning(_)) => {}
                Err(e) => return Err(e),
            }
        }

        if let Lifecycle::Terminated { id } = &self.lifecycle {
            let old = id.clone();
            self.wait_until_gone(&old).await;
        }

        self.transition(Lifecycle::New)?;
        self.submitted_at = None;
        self.completed_at = None;

        info!("Resubmitting job '{}'", self.name);
        self.start().await
    }

    async fn wait_until_gone(&self, id: &JobId) {
        let mut misses = 0;
        while misses < self.timing.absence_threshold {
            sleep(self.timing.poll_interval).await;
            match self.client.list_jobs(self.timing.user.as_deref()).await {
                Ok(ids) if ids.contains(id) => misses = 0,
                Ok(_) => misses += 1,
                Err(e) => warn!("Unable to poll queue for job {}: {}", id, e),
            }
        }
        debug!("Job {} has left the queue", id);
    }

    /// Outcome as far as the scheduler let us observe it
    pub fn outcome(&self) -> TaskOutcome {
        match &self.lifecycle {
            Lifecycle::Finished {
                confirmed: true, ..
            } => TaskOutcome::Finished,
            Lifecycle::Terminated { .. } => TaskOutcome::Terminated,
            _ => TaskOutcome::Unconfirmed,
        }
    }

    pub fn report(&self) -> TaskReport {
        TaskReport {
            task: self.task.clone(),
            job_name: self.name.clone(),
            job_id: self.id().cloned(),
            submitted_at: self.submitted_at,
            completed_at: self.completed_at,
            outcome: self.outcome(),
        }
    }
}
