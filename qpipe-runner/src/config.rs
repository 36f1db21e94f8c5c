//! Runner configuration
//!
//! Defines the admission ceiling and every polling interval the runner
//! uses while it waits on the external scheduler.

use std::time::Duration;

/// Runner configuration
///
/// All intervals are configurable so a busy shared cluster can be polled
/// gently while tests and small queues can be polled quickly.
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// Maximum number of jobs the user may have queued at one time
    pub max_concurrent_jobs: usize,

    /// How long to wait between capacity and completion checks
    pub poll_interval: Duration,

    /// How often a freshly submitted job is checked for visibility
    pub visibility_poll_interval: Duration,

    /// How long to wait for a submitted job to show up before carrying on
    pub visibility_timeout: Duration,

    /// Consecutive polls a job must be missing from the queue to count as finished
    pub absence_threshold: u32,

    /// Queue owner; `None` lets the scheduler client pick the invoking user
    pub user: Option<String>,
}

/// The subset of configuration a single job needs
#[derive(Debug, Clone)]
pub struct JobTiming {
    pub poll_interval: Duration,
    pub visibility_timeout: Duration,
    pub absence_threshold: u32,
    pub user: Option<String>,
}

impl RunnerConfig {
    /// Creates a new configuration with defaults
    pub fn new() -> Self {
        Self {
            max_concurrent_jobs: 4,
            poll_interval: Duration::from_secs(30),
            visibility_poll_interval: Duration::from_secs(5),
            visibility_timeout: Duration::from_secs(600), // 10 minutes
            absence_threshold: 2,
            user: None,
        }
    }

    /// Creates configuration from environment variables
    ///
    /// Expected environment variables (all optional, unparseable values
    /// fall back to the default):
    /// - QPIPE_MAX_JOBS (default: 4)
    /// - QPIPE_POLL_INTERVAL (seconds, default: 30)
    /// - QPIPE_VISIBILITY_POLL_INTERVAL (seconds, default: 5)
    /// - QPIPE_VISIBILITY_TIMEOUT (seconds, default: 600)
    /// - QPIPE_ABSENCE_THRESHOLD (default: 2)
    /// - QPIPE_USER (default: invoking user)
    pub fn from_env() -> Self {
        let defaults = Self::new();

        let seconds = |var: &str, default: Duration| {
            std::env::var(var)
                .ok()
                .and_then(|s| s.parse::<u64>().ok())
                .map(Duration::from_secs)
                .unwrap_or(default)
        };

        let max_concurrent_jobs = std::env::var("QPIPE_MAX_JOBS")
            .ok()
            .and_then(|s| s.parse::<usize>().ok())
            .unwrap_or(defaults.max_concurrent_jobs);

        let absence_threshold = std::env::var("QPIPE_ABSENCE_THRESHOLD")
            .ok()
            .and_then(|s| s.parse::<u32>().ok())
            .unwrap_or(defaults.absence_threshold);

        Self {
            max_concurrent_jobs,
            poll_interval: seconds("QPIPE_POLL_INTERVAL", defaults.poll_interval),
            visibility_poll_interval: seconds(
                "QPIPE_VISIBILITY_POLL_INTERVAL",
                defaults.visibility_poll_interval,
            ),
            visibility_timeout: seconds("QPIPE_VISIBILITY_TIMEOUT", defaults.visibility_timeout),
            absence_threshold,
            user: std::env::var("QPIPE_USER").ok().filter(|u| !u.is_empty()),
        }
    }

    pub fn with_max_concurrent_jobs(mut self, max: usize) -> Self {
        self.max_concurrent_jobs = max;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self
    }

    /// Timing parameters handed to each job
    pub fn job_timing(&self) -> JobTiming {
        JobTiming {
            poll_interval: self.visibility_poll_interval,
            visibility_timeout: self.visibility_timeout,
            absence_threshold: self.absence_threshold,
            user: self.user.clone(),
        }
    }

    /// Validates the configuration
    ///
    /// A ceiling of zero is accepted: it is a legal, if useless, setting
    /// that never admits a job.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.poll_interval.is_zero() {
            anyhow::bail!("poll_interval must be greater than 0");
        }

        if self.visibility_poll_interval.is_zero() {
            anyhow::bail!("visibility_poll_interval must be greater than 0");
        }

        if self.absence_threshold == 0 {
            anyhow::bail!("absence_threshold must be at least 1");
        }

        if matches!(&self.user, Some(user) if user.trim().is_empty()) {
            anyhow::bail!("user cannot be empty");
        }

        Ok(())
    }
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self::new()
    }
}
