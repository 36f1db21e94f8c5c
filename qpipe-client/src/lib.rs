//! qpipe queue client
//!
//! A small interface to an external batch-queue scheduler. The runner only
//! ever needs three things from the scheduler: submit a command, list the
//! jobs a user has queued, and ask for a job to be removed.
//!
//! [`QueueClient`] is the seam: the runner holds an `Arc<dyn QueueClient>`,
//! production code plugs in [`GridEngineClient`] and tests plug in a fake.
//!
//! # Example
//!
//! ```no_run
//! use qpipe_client::{GridEngineClient, GridEngineConfig, QueueClient, SubmitRequest};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let client = GridEngineClient::new(GridEngineConfig::from_env());
//!
//!     let id = client
//!         .submit(&SubmitRequest::new("qc_1", "/usr/local/bin/qc.sh", ["a.fastq"]))
//!         .await?;
//!
//!     println!("Submitted job {}", id);
//!     Ok(())
//! }
//! ```

pub mod error;
mod grid_engine;
pub mod parser;

pub use error::{ClientError, Result};
pub use grid_engine::{GridEngineClient, GridEngineConfig};

use async_trait::async_trait;
use qpipe_core::JobId;
use std::collections::HashSet;
use std::path::PathBuf;

/// Everything the scheduler needs to enqueue one command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitRequest {
    /// Job name shown by the scheduler (also the log file prefix)
    pub name: String,
    /// Directory to run in; `None` means the caller's current directory
    pub working_dir: Option<PathBuf>,
    /// Script or command to run
    pub script: String,
    /// Arguments appended to the script
    pub args: Vec<String>,
}

impl SubmitRequest {
    pub fn new<I, S>(name: impl Into<String>, script: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            working_dir: None,
            script: script.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    pub fn in_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// The single command line handed to the scheduler
    pub fn command_line(&self) -> String {
        std::iter::once(self.script.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Interface to the external batch scheduler
///
/// Every call waits for the external tool to finish. Nothing is retried
/// here; retry policy belongs to the caller.
#[async_trait]
pub trait QueueClient: Send + Sync {
    /// Enqueues a command and returns the identifier the scheduler issued
    async fn submit(&self, request: &SubmitRequest) -> Result<JobId>;

    /// Lists the identifiers currently queued or running for `user`
    ///
    /// `None` means the invoking user. An empty set is a valid answer and
    /// means the user has no jobs left.
    async fn list_jobs(&self, user: Option<&str>) -> Result<HashSet<JobId>>;

    /// Asks the scheduler to remove a job
    ///
    /// Returns once the request was accepted. The job may keep running for
    /// a while, or ignore the request entirely.
    async fn cancel(&self, id: &JobId) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_line_joins_script_and_args() {
        let req = SubmitRequest::new("qc_1", "/opt/qc.sh", ["a.csfasta", "a_QV.qual"]);
        assert_eq!(req.command_line(), "/opt/qc.sh a.csfasta a_QV.qual");
        assert_eq!(req.working_dir, None);
    }

    #[test]
    fn test_in_dir() {
        let req = SubmitRequest::new("qc_1", "qc.sh", Vec::<String>::new()).in_dir("/data/run1");
        assert_eq!(req.working_dir, Some(PathBuf::from("/data/run1")));
        assert_eq!(req.command_line(), "qc.sh");
    }
}
