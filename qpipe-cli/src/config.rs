//! Configuration module
//!
//! Combines environment configuration for the runner and the scheduler
//! tools with the overrides given on the command line.

use anyhow::Result;
use qpipe_client::GridEngineConfig;
use qpipe_runner::RunnerConfig;
use std::time::Duration;

/// Values given on the command line, which win over the environment
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub limit: Option<usize>,
    pub poll_interval: Option<u64>,
}

/// CLI configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub runner: RunnerConfig,
    pub grid_engine: GridEngineConfig,
}

impl Config {
    /// Loads configuration from the environment and applies `overrides`
    pub fn load(overrides: &Overrides) -> Result<Self> {
        let config = Self::from_parts(
            RunnerConfig::from_env(),
            GridEngineConfig::from_env(),
            overrides,
        );
        config.runner.validate()?;
        Ok(config)
    }

    fn from_parts(
        mut runner: RunnerConfig,
        grid_engine: GridEngineConfig,
        overrides: &Overrides,
    ) -> Self {
        if let Some(limit) = overrides.limit {
            runner.max_concurrent_jobs = limit;
        }
        if let Some(secs) = overrides.poll_interval {
            runner.poll_interval = Duration::from_secs(secs);
        }

        Self {
            runner,
            grid_engine,
        }
    }
}
