//! qpipe CLI
//!
//! Runs a pipeline script on every input file set found in one or more
//! data directories, submitting each run to the cluster queue.

mod config;
mod discovery;
mod output;
mod script;

use anyhow::{Context, Result, bail};
use clap::Parser;
use qpipe_client::{GridEngineClient, QueueClient};
use qpipe_runner::BatchRunner;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use config::{Config, Overrides};
use discovery::InputType;

#[derive(Parser, Debug)]
#[command(name = "qpipe")]
#[command(about = "Run a pipeline script on each set of input files via the cluster queue")]
#[command(version)]
struct Cli {
    /// Pipeline script to execute for each file set
    script: String,

    /// Directories holding the input data
    #[arg(required = true)]
    dirs: Vec<PathBuf>,

    /// Queue no more than N jobs at one time (default 4)
    #[arg(long, value_name = "N")]
    limit: Option<usize>,

    /// Submit no more than N jobs per directory (0 submits everything)
    #[arg(long, value_name = "N", default_value_t = 0)]
    test: usize,

    /// Type of input the script expects
    #[arg(long, value_enum, default_value_t = InputType::Solid)]
    input: InputType,

    /// Seconds to wait between queue checks (default 30)
    #[arg(long, value_name = "SECS")]
    poll_interval: Option<u64>,

    /// Print debugging output while running
    #[arg(long)]
    debug: bool,

    /// Print each batch report as JSON
    #[arg(long)]
    json: bool,
}

fn init_logging(debug: bool) {
    let filter = if debug {
        EnvFilter::new("qpipe=debug,qpipe_runner=debug,qpipe_client=debug")
    } else {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| "qpipe=info,qpipe_runner=info,qpipe_client=info".into())
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.debug);

    let config = Config::load(&Overrides {
        limit: cli.limit,
        poll_interval: cli.poll_interval,
    })?;

    let script = script::resolve_script(&cli.script)?;
    let script = script.to_string_lossy().into_owned();
    info!("Full path for script: {}", script);

    let mut dirs = Vec::with_capacity(cli.dirs.len());
    for dir in &cli.dirs {
        let dir = std::path::absolute(dir)
            .with_context(|| format!("Failed to resolve {}", dir.display()))?;
        if !dir.is_dir() {
            bail!("Not a directory: {}", dir.display());
        }
        dirs.push(dir);
    }

    if config.runner.max_concurrent_jobs == 0 {
        warn!("Job limit is 0: no job will ever be submitted");
    }

    let client: Arc<dyn QueueClient> = Arc::new(GridEngineClient::new(config.grid_engine.clone()));
    let runner = BatchRunner::new(client, config.runner.clone());

    let mut all_finished = true;
    for dir in &dirs {
        println!("Running {} on data in {}", script, dir.display());

        let mut tasks = discovery::collect_tasks(dir, cli.input)?;
        if tasks.is_empty() {
            error!("No data files collected for {}", dir.display());
            continue;
        }

        if cli.test > 0 {
            tasks.truncate(cli.test);
        }

        let report = runner.run(&script, tasks, Some(dir.as_path())).await;

        if cli.json {
            println!("{}", serde_json::to_string_pretty(&report)?);
        } else {
            output::print_report(&report);
        }

        all_finished &= report.all_finished();
    }

    println!("All pipelines finished");

    if !all_finished {
        std::process::exit(1);
    }

    Ok(())
}
