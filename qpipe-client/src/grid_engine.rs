//! Grid Engine scheduler client
//!
//! Drives the `qsub`, `qstat` and `qdel` command-line tools:
//! - Submitting a script with its arguments as a binary job
//! - Listing the job ids a user has in the queue
//! - Deleting a job from the queue

use async_trait::async_trait;
use qpipe_core::JobId;
use std::collections::HashSet;
use std::process::Output;
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::error::{ClientError, Result};
use crate::parser::{parse_queue_listing, parse_submit_output};
use crate::{QueueClient, SubmitRequest};

/// Grid Engine tool configuration
#[derive(Debug, Clone)]
pub struct GridEngineConfig {
    /// Submission tool
    pub qsub: String,
    /// Query tool
    pub qstat: String,
    /// Cancel tool
    pub qdel: String,
    /// User whose queue is listed when the caller names none
    pub user: Option<String>,
}

impl GridEngineConfig {
    /// Creates configuration from environment variables
    ///
    /// Recognised variables (all optional):
    /// - QPIPE_QSUB, QPIPE_QSTAT, QPIPE_QDEL: tool names or paths
    /// - USER, then LOGNAME: default user for queue listings
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let tool = |var: &str, default: String| std::env::var(var).unwrap_or(default);

        Self {
            qsub: tool("QPIPE_QSUB", defaults.qsub),
            qstat: tool("QPIPE_QSTAT", defaults.qstat),
            qdel: tool("QPIPE_QDEL", defaults.qdel),
            user: std::env::var("USER")
                .or_else(|_| std::env::var("LOGNAME"))
                .ok()
                .filter(|u| !u.is_empty()),
        }
    }

    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self
    }
}

impl Default for GridEngineConfig {
    fn default() -> Self {
        Self {
            qsub: "qsub".to_string(),
            qstat: "qstat".to_string(),
            qdel: "qdel".to_string(),
            user: None,
        }
    }
}

/// [`QueueClient`] backed by the Grid Engine command-line tools
#[derive(Debug, Clone)]
pub struct GridEngineClient {
    config: GridEngineConfig,
}

impl GridEngineClient {
    pub fn new(config: GridEngineConfig) -> Self {
        Self { config }
    }

    /// Builds the `qsub` invocation for a request
    ///
    /// `-b y` submits the command as a binary rather than a script file and
    /// `-V` exports the caller's environment to the job.
    fn submit_command(&self, request: &SubmitRequest) -> Command {
        let mut cmd = Command::new(&self.config.qsub);
        cmd.args(["-b", "y", "-V", "-N", request.name.as_str()]);

        match &request.working_dir {
            Some(dir) => {
                cmd.arg("-wd").arg(dir);
            }
            None => {
                cmd.arg("-cwd");
            }
        }

        cmd.arg(request.command_line());
        cmd
    }
}

/// Logs captured tool output at debug level
fn log_output(tool: &str, output: &Output) {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);

    if !stdout.trim().is_empty() {
        debug!("{} stdout: {}", tool, stdout.trim());
    }
    if !stderr.trim().is_empty() {
        debug!("{} stderr: {}", tool, stderr.trim());
    }
}

#[async_trait]
impl QueueClient for GridEngineClient {
    async fn submit(&self, request: &SubmitRequest) -> Result<JobId> {
        debug!(
            "Submitting job: name={} working_dir={:?} script={} args={:?}",
            request.name, request.working_dir, request.script, request.args
        );

        let output = self
            .submit_command(request)
            .output()
            .await
            .map_err(|e| ClientError::launch(&self.config.qsub, e))?;

        log_output(&self.config.qsub, &output);

        let stdout = String::from_utf8_lossy(&output.stdout);
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ClientError::Submission(format!(
                "{} exited with {}: {}",
                self.config.qsub,
                output.status.code().unwrap_or(-1),
                stderr.trim()
            )));
        }

        let job_id = parse_submit_output(&stdout).ok_or_else(|| {
            ClientError::Submission(format!(
                "no job id in {} output: '{}'",
                self.config.qsub,
                stdout.trim()
            ))
        })?;

        info!("Job '{}' submitted with id {}", request.name, job_id);
        Ok(job_id)
    }

    async fn list_jobs(&self, user: Option<&str>) -> Result<HashSet<JobId>> {
        let mut cmd = Command::new(&self.config.qstat);
        if let Some(user) = user.or(self.config.user.as_deref()) {
            cmd.args(["-u", user]);
        }

        let output = cmd.output().await.map_err(|e| {
            ClientError::QueryTransient(format!("failed to execute {}: {}", self.config.qstat, e))
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            warn!("{} failed: {}", self.config.qstat, stderr.trim());
            return Err(ClientError::QueryTransient(format!(
                "{} exited with {}: {}",
                self.config.qstat,
                output.status.code().unwrap_or(-1),
                stderr.trim()
            )));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let ids = parse_queue_listing(&stdout)?;
        debug!("{} lists {} job(s)", self.config.qstat, ids.len());
        Ok(ids)
    }

    async fn cancel(&self, id: &JobId) -> Result<()> {
        debug!("Deleting job {}", id);

        let output = Command::new(&self.config.qdel)
            .arg(id.as_str())
            .output()
            .await
            .map_err(|e| ClientError::launch(&self.config.qdel, e))?;

        log_output(&self.config.qdel, &output);

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ClientError::Cancel(format!(
                "{} {}: {}",
                self.config.qdel,
                id,
                stderr.trim()
            )));
        }

        info!("Delete request for job {} accepted", id);
        Ok(())
    }
}
